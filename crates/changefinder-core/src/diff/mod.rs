//! Field-level diff between consecutive snapshots.
//!
//! ## Entry point
//!
//! ```ignore
//! use changefinder_core::diff::compute_changed_fields;
//!
//! let changed = compute_changed_fields(predecessor.as_ref(), &current);
//! ```
//!
//! ## Guarantees
//!
//! - **Purity**: no side effects; identical inputs give identical sets.
//! - **Birth**: an absent predecessor makes every current field changed.
//! - **Exactness**: values are compared by exact structural equality. An
//!   integer `1` and a float `1.0` differ, as do two floats a hair apart;
//!   numeric closeness is the drift rule's business, not the diff's.

pub mod changed;
pub mod engine;

pub use changed::ChangedFieldSet;
pub use engine::{compute_changed_fields, numbers_within_epsilon};
