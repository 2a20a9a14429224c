use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::attribution::{Anomaly, Attribution, AttributionKind};
use super::snapshot::{EntityId, Fields};
use crate::errors::Result;

/// The attributed outcome of processing one snapshot
///
/// One per processed snapshot. The union of all attribution field sets
/// equals the field diff between `predecessor` and `current`, and the sets
/// are pairwise disjoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub entity_id: EntityId,
    pub valid_from: DateTime<Utc>,
    pub predecessor: Option<Fields>,
    pub current: Fields,
    pub attributions: Vec<Attribution>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<Anomaly>,
}

impl Change {
    /// Union of the fields claimed by every attribution
    pub fn claimed_fields(&self) -> BTreeSet<&str> {
        self.attributions
            .iter()
            .flat_map(|a| a.fields.iter().map(String::as_str))
            .collect()
    }

    /// Whether the fallback had to explain part of this change
    pub fn is_unidentified(&self) -> bool {
        self.attributions
            .iter()
            .any(|a| a.kind == AttributionKind::Unknown)
    }

    /// Whether this change is a single attribution of one of `kinds`
    ///
    /// Used to filter routine chatter (counters, resets) out of reports.
    pub fn is_noise(&self, kinds: &[AttributionKind]) -> bool {
        matches!(self.attributions.as_slice(), [only] if kinds.contains(&only.kind))
    }

    /// Hex-encoded SHA256 digest of the canonical JSON form
    ///
    /// Identical store state, input snapshot, and reference data produce
    /// identical digests.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if JSON serialization fails.
    pub fn digest(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn change_with(attributions: Vec<Attribution>) -> Change {
        let mut current = Fields::new();
        current.insert("a".to_string(), json!(1));
        current.insert("b".to_string(), json!(2));
        Change {
            entity_id: "p1".to_string(),
            valid_from: "2020-08-03T04:23:53Z".parse().unwrap(),
            predecessor: None,
            current,
            attributions,
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn test_claimed_fields_union() {
        let change = change_with(vec![
            Attribution::unknown_time(AttributionKind::Manual, ["a"]),
            Attribution::unknown(["b"]),
        ]);
        assert_eq!(change.claimed_fields(), BTreeSet::from(["a", "b"]));
        assert!(change.is_unidentified());
    }

    #[test]
    fn test_is_noise_requires_single_attribution() {
        let counters = [AttributionKind::CounterTracker];
        let single = change_with(vec![Attribution::unknown_time(
            AttributionKind::CounterTracker,
            ["a"],
        )]);
        assert!(single.is_noise(&counters));

        let double = change_with(vec![
            Attribution::unknown_time(AttributionKind::CounterTracker, ["a"]),
            Attribution::unknown(["b"]),
        ]);
        assert!(!double.is_noise(&counters));
    }

    #[test]
    fn test_digest_stable_and_sensitive() {
        let a = change_with(vec![Attribution::unknown(["a", "b"])]);
        let b = a.clone();
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());
        assert_eq!(a.digest().unwrap().len(), 64);

        let c = change_with(vec![Attribution::unknown_time(
            AttributionKind::Manual,
            ["a", "b"],
        )]);
        assert_ne!(a.digest().unwrap(), c.digest().unwrap());
    }
}
