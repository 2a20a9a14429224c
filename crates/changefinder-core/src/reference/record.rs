use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{EntityId, Provenance};

/// One row of a reference event table
///
/// A record may involve several entities (a feedback swaps two players,
/// an incineration has a victim and a replacement); `entity_ids` lists all
/// of them, in the order the table defines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub entity_ids: Vec<EntityId>,
    pub season: u32,
    pub day: u32,
    pub game_id: String,
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl ReferenceRecord {
    /// Whether `entity_id` is any of this record's participants
    pub fn involves(&self, entity_id: &str) -> bool {
        self.entity_ids.iter().any(|id| id == entity_id)
    }

    /// Whether `entity_id` occupies the given participant position
    pub fn has_participant_at(&self, position: usize, entity_id: &str) -> bool {
        self.entity_ids.get(position).map(String::as_str) == Some(entity_id)
    }

    /// In-game-event provenance populated from this record
    pub fn game_event(&self) -> Provenance {
        Provenance::GameEvent {
            season: self.season,
            day: self.day,
            game_id: self.game_id.clone(),
            observed_at: self.observed_at,
        }
    }

    /// Period-boundary provenance for the day of this record
    pub fn period_boundary(&self) -> Provenance {
        Provenance::PeriodBoundary {
            season: self.season,
            day: self.day,
        }
    }
}
