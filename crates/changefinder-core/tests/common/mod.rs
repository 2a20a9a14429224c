use std::collections::BTreeSet;

use changefinder_core::{compute_changed_fields, Change, ReferenceRecord, Snapshot};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

/// Parse an RFC 3339 timestamp
#[allow(dead_code)]
pub fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

/// Build a snapshot from a `json!` object of fields
#[allow(dead_code)]
pub fn snapshot(entity_id: &str, at: &str, fields: Value) -> Snapshot {
    Snapshot::new(entity_id, ts(at), serde_json::from_value(fields).unwrap())
}

/// Build a reference record involving `entity_ids`
#[allow(dead_code)]
pub fn record(entity_ids: &[&str], season: u32, day: u32, game_id: &str, at: &str) -> ReferenceRecord {
    serde_json::from_value(json!({
        "entity_ids": entity_ids,
        "season": season,
        "day": day,
        "game_id": game_id,
        "observed_at": at,
    }))
    .unwrap()
}

/// Assert the attributions of `change` partition the diff exactly
///
/// # Panics
///
/// Panics if a field is claimed twice, or if the claimed union differs
/// from the diff between `predecessor` and `current`.
#[allow(dead_code)]
pub fn assert_partitions_diff(change: &Change, predecessor: Option<&Snapshot>, current: &Snapshot) {
    let diff: BTreeSet<String> = compute_changed_fields(predecessor, current)
        .iter()
        .map(str::to_string)
        .collect();

    let mut claimed = BTreeSet::new();
    for attribution in &change.attributions {
        assert!(
            !attribution.fields.is_empty(),
            "empty attribution {:?}",
            attribution
        );
        for field in &attribution.fields {
            assert!(claimed.insert(field.clone()), "field {} claimed twice", field);
        }
    }
    assert_eq!(claimed, diff);
}

/// Field names as an owned set
#[allow(dead_code)]
pub fn names(fields: &[&str]) -> BTreeSet<String> {
    fields.iter().map(|s| s.to_string()).collect()
}
