//! The standard rule catalogue.
//!
//! Rules are listed from most mechanically certain (exact manual
//! overrides, known renames and format changes) to least certain (broad
//! reference-table lookups, numeric clean-up), so earlier rules shadow
//! later ones for shared fields. The data each rule matches against comes
//! from a [`CatalogueConfig`].

pub mod config;
pub mod events;
pub mod manual;
pub mod structural;
pub mod values;
pub mod windows;

pub use config::CatalogueConfig;
pub use events::{IncinerationRule, ReferenceEventRule, WeeklyModsWearOffRule};
pub use manual::ManualOverrideRule;
pub use structural::{
    AddedAttributesRule, CounterTrackerRule, FormatChangeRule, RecordingStartRule,
    RenamedAttributesRule,
};
pub use values::{
    AttributesCappedRule, FirstValueRule, InterviewRule, PrecisionDriftRule, ValueResetRule,
};
pub use windows::{CreepingAllergyRule, ElectionWindowRule, FatelessFatedRule};

use serde_json::Value;

use crate::diff::ChangedFieldSet;
use crate::errors::Result;
use crate::model::{Anomaly, Attribution, AttributionKind};
use crate::rule::{Rule, RuleOutcome};

/// The catalogue in priority order
pub fn standard_rules(config: &CatalogueConfig) -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(ManualOverrideRule::new(
            &config.manual_overrides,
            config.manual_patterns.clone(),
        )),
        Box::new(RecordingStartRule::new(config.recording_start)),
        Box::new(RenamedAttributesRule::new(config.renamed_attributes.clone())),
        Box::new(FormatChangeRule::new(config.format_changes.clone())),
        Box::new(CounterTrackerRule::new(config.counter_fields.clone())),
        Box::new(AddedAttributesRule::new(
            config.added_attribute_groups.clone(),
        )),
        Box::new(ElectionWindowRule::new(config.elections.clone())),
        Box::new(CreepingAllergyRule::new(config.source_defect.clone())),
        Box::new(FatelessFatedRule::new(config.source_defect.clone())),
        Box::new(ReferenceEventRule::new(
            "peanut",
            AttributionKind::Peanut,
            config.peanuts.clone(),
        )),
        Box::new(FirstValueRule::new(
            "first_blood",
            AttributionKind::FirstBlood,
            config.first_blood_field.clone(),
        )),
        Box::new(InterviewRule::new(config.interview.clone())),
        Box::new(ReferenceEventRule::new(
            "feedback_fate",
            AttributionKind::FeedbackFate,
            config.feedbacks.clone(),
        )),
        Box::new(IncinerationRule::new(
            config.incinerations.clone(),
            config.reference_lookback(),
        )),
        Box::new(WeeklyModsWearOffRule::new(config.weekly_mods.clone())),
        Box::new(PrecisionDriftRule::new(config.drift_epsilon)),
        Box::new(ValueResetRule::new(config.value_resets.clone())),
        Box::new(AttributesCappedRule::new(config.caps.clone())),
    ]
}

/// Attributions a single rule invocation has made so far
///
/// Keeps a private copy of the remaining set so a rule that yields several
/// attributions never hands the pipeline overlapping claims.
struct Claims<'r> {
    rule: &'r str,
    remaining: ChangedFieldSet,
    outcome: RuleOutcome,
}

impl<'r> Claims<'r> {
    fn new(rule: &'r str, changed: &ChangedFieldSet) -> Self {
        Self {
            rule,
            remaining: changed.clone(),
            outcome: RuleOutcome::none(),
        }
    }

    fn remaining(&self) -> &ChangedFieldSet {
        &self.remaining
    }

    fn push(&mut self, attribution: Attribution) -> Result<()> {
        self.remaining.claim(self.rule, &attribution.fields)?;
        self.outcome.attributions.push(attribution);
        Ok(())
    }

    fn anomaly(&mut self, anomaly: Anomaly) {
        self.outcome.anomalies.push(anomaly);
    }

    fn finish(self) -> RuleOutcome {
        self.outcome
    }
}

/// Missing, null, false, or numerically zero
fn is_zero_like(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(_) => false,
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// An emptied collection or string
fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        Some(Value::Null) => true,
        _ => false,
    }
}
