//! Catalogue configuration
//!
//! Parses the YAML rule catalogue and validates schema version, windows,
//! epsilon, and override uniqueness.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ChangeFinderError, Result};
use crate::model::{EntityId, FieldName};

const BUILTIN_CATALOGUE: &str = include_str!("../../config/catalogue.yaml");

/// Data the standard rules are built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogueConfig {
    pub schema_version: u32,

    /// Instant recording began; snapshots in this second with no predecessor
    /// are first observations, not births
    pub recording_start: DateTime<Utc>,

    /// Largest difference still treated as float re-serialization noise
    pub drift_epsilon: f64,

    /// How far back event lookups without a predecessor interval reach
    pub reference_lookback_hours: i64,

    #[serde(default)]
    pub manual_overrides: Vec<ManualOverride>,

    #[serde(default)]
    pub manual_patterns: Vec<ManualPattern>,

    #[serde(default)]
    pub renamed_attributes: Vec<BTreeSet<FieldName>>,

    #[serde(default)]
    pub format_changes: Vec<FormatChange>,

    #[serde(default)]
    pub counter_fields: BTreeSet<FieldName>,

    #[serde(default)]
    pub added_attribute_groups: Vec<BTreeSet<FieldName>>,

    #[serde(default)]
    pub elections: Vec<ElectionWindow>,

    pub source_defect: SourceDefectWindow,

    pub peanuts: ReferenceEventConfig,

    pub feedbacks: ReferenceEventConfig,

    pub first_blood_field: FieldName,

    pub interview: InterviewConfig,

    pub incinerations: IncinerationConfig,

    pub weekly_mods: WeeklyModsConfig,

    #[serde(default)]
    pub value_resets: Vec<ValueReset>,

    pub caps: CapsConfig,
}

/// A hand edit pinned to one exact snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManualOverride {
    pub entity_id: EntityId,
    pub valid_from: DateTime<Utc>,
    pub fields: BTreeSet<FieldName>,
    #[serde(default)]
    pub note: Option<String>,
}

/// A hand edit recognized by the value it replaced
///
/// Fires when `field` is the only remaining change and the predecessor's
/// value was one of `previous_values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManualPattern {
    pub field: FieldName,
    pub previous_values: BTreeSet<String>,
}

/// A field whose encoding changed at known instants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatChange {
    pub field: FieldName,
    pub instants: Vec<DateTime<Utc>>,
}

/// An election that happened before the event feed existed; bounds inclusive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElectionWindow {
    pub season: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ElectionWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// The stretch during which a source defect flipped allergy and fate flags
///
/// Bounds are exclusive. Inside it, a diff made only of `companions` may be
/// explained by the defect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceDefectWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub allergy_field: FieldName,
    pub fate_field: FieldName,
    pub companions: BTreeSet<FieldName>,
}

impl SourceDefectWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start < instant && instant < self.end
    }
}

/// How a reference-table rule decides it applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Every remaining field is one of `fields`; claims them all
    AllWithin,
    /// Some remaining field is one of `fields`; claims those
    AnyOf,
}

/// A rule corroborated by one record of a reference table between the
/// predecessor and the current snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceEventConfig {
    pub table: String,
    pub mode: MatchMode,
    pub fields: BTreeSet<FieldName>,
}

/// Coffee-and-ritual style first interview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterviewConfig {
    /// Numeric field that is zero before the interview
    pub zero_field: FieldName,
    /// Text field that is empty before the interview
    pub blank_field: FieldName,
}

/// Records list the victim first and the replacement second
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncinerationConfig {
    pub table: String,
    pub deceased_field: FieldName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeeklyModsConfig {
    pub field: FieldName,
    pub games_table: String,
    /// Days per period; the last day of a period satisfies `(day + 1) % period_days == 0`
    pub period_days: u32,
}

/// A field periodically reset to one of a few defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValueReset {
    pub field: FieldName,
    pub values: Vec<f64>,
}

/// Floors apply to every numeric field, ceilings only to `ceiling_fields`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapsConfig {
    pub floors: Vec<f64>,
    pub ceilings: Vec<f64>,
    pub ceiling_fields: BTreeSet<FieldName>,
}

impl CatalogueConfig {
    /// The catalogue shipped with the crate
    ///
    /// # Errors
    ///
    /// Returns `InvalidCatalogue` if the embedded catalogue does not parse,
    /// which only a broken build can cause.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_CATALOGUE)
    }

    /// Parse and validate a catalogue from YAML text
    ///
    /// # Errors
    ///
    /// Returns `InvalidCatalogue` on a YAML error or a failed validation.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: CatalogueConfig =
            serde_yaml::from_str(content).map_err(|e| invalid(format!("YAML parse error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Parse and validate a catalogue file
    ///
    /// # Errors
    ///
    /// Returns `InvalidCatalogue` if the file cannot be read, parsed, or validated.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| invalid(format!("Failed to read catalogue file: {}", e)))?;

        Self::from_yaml_str(&content)
    }

    /// Check internal consistency
    ///
    /// # Errors
    ///
    /// Returns `InvalidCatalogue` naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.schema_version != 0 {
            return Err(invalid(format!(
                "Unsupported schema_version: {}. Expected 0",
                self.schema_version
            )));
        }

        if !(self.drift_epsilon > 0.0 && self.drift_epsilon.is_finite()) {
            return Err(invalid(format!(
                "drift_epsilon must be positive, got {}",
                self.drift_epsilon
            )));
        }

        if self.reference_lookback_hours <= 0 {
            return Err(invalid(format!(
                "reference_lookback_hours must be positive, got {}",
                self.reference_lookback_hours
            )));
        }

        let mut seen = HashSet::new();
        for entry in &self.manual_overrides {
            if entry.fields.is_empty() {
                return Err(invalid(format!(
                    "Manual override for {} at {} lists no fields",
                    entry.entity_id, entry.valid_from
                )));
            }
            if !seen.insert((entry.entity_id.as_str(), entry.valid_from)) {
                return Err(invalid(format!(
                    "Duplicate manual override for {} at {}",
                    entry.entity_id, entry.valid_from
                )));
            }
        }

        for pair in &self.renamed_attributes {
            if pair.len() < 2 {
                return Err(invalid(format!(
                    "Rename entry {:?} must name at least two fields",
                    pair
                )));
            }
        }

        for group in &self.added_attribute_groups {
            if group.is_empty() {
                return Err(invalid("Added attribute group is empty".to_string()));
            }
        }

        for election in &self.elections {
            if election.start > election.end {
                return Err(invalid(format!(
                    "Election window for season {} ends before it starts",
                    election.season
                )));
            }
        }

        if self.source_defect.start > self.source_defect.end {
            return Err(invalid(
                "Source defect window ends before it starts".to_string(),
            ));
        }

        for (name, event) in [("peanuts", &self.peanuts), ("feedbacks", &self.feedbacks)] {
            if event.fields.is_empty() {
                return Err(invalid(format!("Reference event {} lists no fields", name)));
            }
        }

        if self.weekly_mods.period_days == 0 {
            return Err(invalid("weekly_mods.period_days must be positive".to_string()));
        }

        Ok(())
    }

    pub fn reference_lookback(&self) -> Duration {
        Duration::hours(self.reference_lookback_hours)
    }

    /// Every reference table some rule reads, deduplicated and sorted
    pub fn reference_tables(&self) -> Vec<&str> {
        let tables: BTreeSet<&str> = [
            self.peanuts.table.as_str(),
            self.feedbacks.table.as_str(),
            self.incinerations.table.as_str(),
            self.weekly_mods.games_table.as_str(),
        ]
        .into_iter()
        .collect();
        tables.into_iter().collect()
    }
}

fn invalid(reason: String) -> ChangeFinderError {
    ChangeFinderError::InvalidCatalogue { reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalogue_is_valid() {
        let config = CatalogueConfig::builtin().unwrap();
        assert!(config.drift_epsilon > 0.0);
        assert!(config.counter_fields.contains("hitStreak"));
        assert_eq!(config.elections.len(), 3);
        assert_eq!(
            config.reference_tables(),
            vec!["feedbacks", "games", "incinerations", "peanuts"]
        );
    }

    #[test]
    fn test_rejects_duplicate_manual_override() {
        let mut config = CatalogueConfig::builtin().unwrap();
        let first = config.manual_overrides[0].clone();
        config.manual_overrides.push(first);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate manual override"));
    }

    #[test]
    fn test_rejects_inverted_election_window() {
        let mut config = CatalogueConfig::builtin().unwrap();
        let election = &mut config.elections[0];
        std::mem::swap(&mut election.start, &mut election.end);
        assert!(matches!(
            config.validate(),
            Err(ChangeFinderError::InvalidCatalogue { .. })
        ));
    }

    #[test]
    fn test_rejects_non_positive_epsilon() {
        let mut config = CatalogueConfig::builtin().unwrap();
        config.drift_epsilon = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_single_field_rename() {
        let mut config = CatalogueConfig::builtin().unwrap();
        config
            .renamed_attributes
            .push(BTreeSet::from(["id".to_string()]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let err = CatalogueConfig::from_yaml_str("schema_version: 0\nsurprise: true\n").unwrap_err();
        assert!(matches!(err, ChangeFinderError::InvalidCatalogue { .. }));
    }

    #[test]
    fn test_window_bounds() {
        let config = CatalogueConfig::builtin().unwrap();
        let election = &config.elections[0];
        assert!(election.contains(election.start));
        assert!(election.contains(election.end));
        assert!(!config.source_defect.contains(config.source_defect.start));
        assert!(!config.source_defect.contains(config.source_defect.end));
    }
}
