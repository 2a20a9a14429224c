use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ChangeFinderError, Result};

/// Opaque identifier of a tracked entity
pub type EntityId = String;

/// Name of a single field within a snapshot
pub type FieldName = String;

/// Field values of a snapshot, ordered by field name
pub type Fields = BTreeMap<FieldName, Value>;

/// A timestamped full capture of an entity's field values
///
/// Deserializes from the snapshot-stream record shape
/// `{"entityId", "validFrom", "validTo", "data"}`; any other keys on the
/// record (hashes, ids of the stream itself) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Entity this snapshot belongs to
    pub entity_id: EntityId,

    /// Instant from which this state was observed
    pub valid_from: DateTime<Utc>,

    /// Instant at which the next state replaced this one, if known
    #[serde(default)]
    pub valid_to: Option<DateTime<Utc>>,

    /// Captured field values
    #[serde(rename = "data")]
    pub fields: Fields,
}

impl Snapshot {
    /// Create a snapshot with an open-ended validity interval
    pub fn new(entity_id: impl Into<EntityId>, valid_from: DateTime<Utc>, fields: Fields) -> Self {
        Self {
            entity_id: entity_id.into(),
            valid_from,
            valid_to: None,
            fields,
        }
    }

    /// Set the end of the validity interval
    pub fn with_valid_to(mut self, valid_to: DateTime<Utc>) -> Self {
        self.valid_to = Some(valid_to);
        self
    }

    /// Parse one snapshot-stream record from JSON text
    ///
    /// # Errors
    ///
    /// Returns `InvalidSnapshot` if the text is not a record with an
    /// `entityId`, a parseable `validFrom`, and an object-valued `data`.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ChangeFinderError::InvalidSnapshot {
            reason: e.to_string(),
        })
    }

    /// Look up a field value
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Look up a numeric field value as `f64`
    pub fn number(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(Value::as_f64)
    }

    /// Look up a string field value
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_stream_record() {
        let text = r#"{
            "entityId": "p1",
            "hash": "abc",
            "validFrom": "2020-08-03T04:23:53.241Z",
            "validTo": null,
            "data": {"name": "Chorby Soul", "soul": 7}
        }"#;

        let snapshot = Snapshot::from_json_str(text).unwrap();
        assert_eq!(snapshot.entity_id, "p1");
        assert_eq!(snapshot.valid_to, None);
        assert_eq!(snapshot.text("name"), Some("Chorby Soul"));
        assert_eq!(snapshot.number("soul"), Some(7.0));
    }

    #[test]
    fn test_parse_rejects_missing_entity_id() {
        let err = Snapshot::from_json_str(r#"{"validFrom": "2020-08-03T04:23:53Z", "data": {}}"#)
            .unwrap_err();
        assert!(matches!(err, ChangeFinderError::InvalidSnapshot { .. }));
    }

    #[test]
    fn test_serialize_uses_stream_shape() {
        let mut fields = Fields::new();
        fields.insert("a".to_string(), json!(1));
        let snapshot = Snapshot::new("p1", "2020-08-03T04:23:53Z".parse().unwrap(), fields);

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["entityId"], json!("p1"));
        assert_eq!(value["data"]["a"], json!(1));
    }
}
