//! Changed-field computation.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::diff::changed::ChangedFieldSet;
use crate::model::{FieldName, Snapshot};

/// Compute the set of fields that changed between two snapshots.
///
/// - `predecessor` absent: every field of `current`.
/// - Otherwise: every name present in either snapshot that is missing on
///   one side or whose values are not structurally equal.
pub fn compute_changed_fields(predecessor: Option<&Snapshot>, current: &Snapshot) -> ChangedFieldSet {
    let Some(before) = predecessor else {
        return current.fields.keys().cloned().collect();
    };

    let names: BTreeSet<&FieldName> = before.fields.keys().chain(current.fields.keys()).collect();

    names
        .into_iter()
        .filter(|name| before.fields.get(*name) != current.fields.get(*name))
        .cloned()
        .collect()
}

/// Whether two values are numbers within `epsilon` of each other.
///
/// Only scalar numbers qualify. A type mismatch (number vs string, number
/// vs null) or any non-numeric pair is never "close", whatever the values.
pub fn numbers_within_epsilon(a: &Value, b: &Value, epsilon: f64) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => (x - y).abs() < epsilon,
        _ => false,
    }
}
