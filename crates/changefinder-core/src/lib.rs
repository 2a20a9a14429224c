//! changefinder core - change attribution over snapshot streams
//!
//! Given successive snapshots of a mutable entity, this crate reconstructs
//! which mechanism caused each observed change:
//! - Field-level diff between a predecessor and the current snapshot
//! - An ordered chain of [`Rule`]s that each claim part of the diff
//! - Strict claim bookkeeping, early termination, and an Unknown fallback
//! - Injectable per-entity stores (predecessors, auxiliary rule state)
//! - Read-only, time-windowed reference data lookups
//! - A catalogue of representative rules driven by a YAML configuration
//!
//! The entry point is [`Pipeline::process`], which turns one [`Snapshot`]
//! into one [`Change`].

pub mod catalogue;
pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod pipeline;
pub mod reference;
pub mod rule;
pub mod store;

// Re-export commonly used types
pub use catalogue::{standard_rules, CatalogueConfig};
pub use diff::{compute_changed_fields, ChangedFieldSet};
pub use errors::{ChangeFinderError, ExError, ExErrorKind, Result};
pub use model::{Anomaly, Attribution, AttributionKind, Change, Provenance, Snapshot};
pub use pipeline::Pipeline;
pub use reference::{
    InMemoryReferenceData, NoReferenceData, ReferenceData, ReferenceRecord, TimeWindow,
};
pub use rule::{Rule, RuleContext, RuleOutcome};
pub use store::{AuxStateStore, InMemoryAuxState, InMemorySnapshotStore, SnapshotStore};
