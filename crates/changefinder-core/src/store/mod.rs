//! Per-entity stores owned by the pipeline.
//!
//! Both stores are keyed by entity id and follow a single-writer-per-key
//! discipline: at most one `process` call per entity id is in flight. They
//! are injected into [`Pipeline`](crate::Pipeline) rather than held as
//! globals, so tests get isolated state and callers can shard by entity.

pub mod aux_state;
pub mod snapshot_store;

pub use aux_state::{AuxStateStore, InMemoryAuxState};
pub use snapshot_store::{InMemorySnapshotStore, SnapshotStore};
