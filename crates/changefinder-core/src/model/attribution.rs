//! Attribution categories, provenance shapes, and rule anomalies.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::snapshot::FieldName;

/// Mechanism an attribution blames for a set of changed fields
///
/// The set is closed: adding a mechanism means adding a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionKind {
    /// No rule explained the fields
    Unknown,
    /// Entity first observed when recording began
    RecordingStart,
    /// Hand edit by the source's operators
    Manual,
    /// A field was renamed without changing its meaning
    RenamedAttributes,
    /// A field's encoding changed without changing its meaning
    ChangedAttributeFormat,
    /// Per-game counters that move on almost every appearance
    CounterTracker,
    /// A group of attributes was introduced at once
    AddedAttributes,
    /// An election that predates the event feed
    PreFeedElection,
    /// Spurious allergy flag set by a source defect
    CreepingAllergy,
    /// Spurious allergy flag cleared again
    CreepingDeallergize,
    /// Zero fate spuriously replaced by a real one
    FatelessFated,
    Peanut,
    FirstBlood,
    Interview,
    FeedbackFate,
    IncinerationReplacement,
    Incinerated,
    WeeklyModsWearOff,
    /// Floating-point noise from re-serialization, not a real change
    PrecisionDrift,
    /// A value periodically reset to a default
    ValueReset,
    /// A value clamped to its floor or ceiling
    AttributesCapped,
}

impl AttributionKind {
    /// Stable snake_case name, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributionKind::Unknown => "unknown",
            AttributionKind::RecordingStart => "recording_start",
            AttributionKind::Manual => "manual",
            AttributionKind::RenamedAttributes => "renamed_attributes",
            AttributionKind::ChangedAttributeFormat => "changed_attribute_format",
            AttributionKind::CounterTracker => "counter_tracker",
            AttributionKind::AddedAttributes => "added_attributes",
            AttributionKind::PreFeedElection => "pre_feed_election",
            AttributionKind::CreepingAllergy => "creeping_allergy",
            AttributionKind::CreepingDeallergize => "creeping_deallergize",
            AttributionKind::FatelessFated => "fateless_fated",
            AttributionKind::Peanut => "peanut",
            AttributionKind::FirstBlood => "first_blood",
            AttributionKind::Interview => "interview",
            AttributionKind::FeedbackFate => "feedback_fate",
            AttributionKind::IncinerationReplacement => "incineration_replacement",
            AttributionKind::Incinerated => "incinerated",
            AttributionKind::WeeklyModsWearOff => "weekly_mods_wear_off",
            AttributionKind::PrecisionDrift => "precision_drift",
            AttributionKind::ValueReset => "value_reset",
            AttributionKind::AttributesCapped => "attributes_capped",
        }
    }
}

impl std::fmt::Display for AttributionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When, as far as the evidence shows, the mechanism acted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "timing", rename_all = "snake_case")]
pub enum Provenance {
    /// Somewhere between the predecessor and the current snapshot
    UnknownTime,
    /// At the close of a period (e.g. the last day of a week)
    PeriodBoundary { season: u32, day: u32 },
    /// During a specific game, corroborated by a reference record
    GameEvent {
        season: u32,
        day: u32,
        game_id: String,
        observed_at: DateTime<Utc>,
    },
    /// At a scheduled, season-level event
    Scheduled { season: u32 },
}

/// A typed claim that a subset of the changed fields is explained by one mechanism
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    pub kind: AttributionKind,
    pub fields: BTreeSet<FieldName>,
    pub provenance: Provenance,
}

impl Attribution {
    /// Create an attribution with explicit provenance
    pub fn new<I, S>(kind: AttributionKind, fields: I, provenance: Provenance) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FieldName>,
    {
        Self {
            kind,
            fields: fields.into_iter().map(Into::into).collect(),
            provenance,
        }
    }

    /// Create an attribution whose timing is unknown
    pub fn unknown_time<I, S>(kind: AttributionKind, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FieldName>,
    {
        Self::new(kind, fields, Provenance::UnknownTime)
    }

    /// The fallback attribution for fields no rule explained
    pub fn unknown<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FieldName>,
    {
        Self::unknown_time(AttributionKind::Unknown, fields)
    }

    /// Whether this attribution claims the given field
    pub fn claims(&self, field: &str) -> bool {
        self.fields.contains(field)
    }
}

/// Category of a rule-local anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// An observed transition the rule's own bookkeeping says cannot happen
    ImpossibleTransition,
}

/// A non-fatal oddity a rule noticed while attributing a change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    pub rule: String,
    pub kind: AnomalyKind,
    pub description: String,
}

impl Anomaly {
    pub fn impossible_transition(rule: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            kind: AnomalyKind::ImpossibleTransition,
            description: description.into(),
        }
    }
}
