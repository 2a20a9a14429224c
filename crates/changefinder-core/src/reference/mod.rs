//! Read-only, time-windowed access to external event tables.
//!
//! The engine treats reference data as a pure range query: records are
//! pre-materialized by the enclosing application, and a lookup never
//! blocks on I/O. Rules expect zero or one match per lookup; more than one
//! is a fatal [`AmbiguousReferenceMatch`](crate::ChangeFinderError::AmbiguousReferenceMatch).

pub mod in_memory;
pub mod record;
pub mod window;

pub use in_memory::{InMemoryReferenceData, NoReferenceData};
pub use record::ReferenceRecord;
pub use window::TimeWindow;

use crate::errors::{ChangeFinderError, Result};

/// Range query over reference tables
pub trait ReferenceData: Send + Sync {
    /// Records of `table` that involve `entity_id` and were observed inside
    /// `window`, ordered by observation time.
    ///
    /// Unknown tables read as empty.
    fn lookup<'a>(
        &'a self,
        table: &str,
        entity_id: &str,
        window: &TimeWindow,
    ) -> Vec<&'a ReferenceRecord>;
}

/// Narrow a lookup result to at most one record.
///
/// # Errors
///
/// Returns `AmbiguousReferenceMatch` when more than one record matched.
pub fn expect_at_most_one<'a>(
    rule: &str,
    table: &str,
    entity_id: &str,
    records: Vec<&'a ReferenceRecord>,
) -> Result<Option<&'a ReferenceRecord>> {
    match records.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(*only)),
        many => Err(ChangeFinderError::AmbiguousReferenceMatch {
            rule: rule.to_string(),
            table: table.to_string(),
            entity_id: entity_id.to_string(),
            matches: many.len(),
        }),
    }
}
