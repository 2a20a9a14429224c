//! Rules that look only at the old and new value of a field.

use std::collections::BTreeSet;

use super::config::{CapsConfig, InterviewConfig, ValueReset};
use super::Claims;
use crate::diff::{numbers_within_epsilon, ChangedFieldSet};
use crate::errors::Result;
use crate::model::{Attribution, AttributionKind, FieldName, Snapshot};
use crate::rule::{Rule, RuleContext, RuleOutcome};

/// A field taking its first non-zero value
pub struct FirstValueRule {
    name: String,
    kind: AttributionKind,
    field: FieldName,
}

impl FirstValueRule {
    pub fn new(name: impl Into<String>, kind: AttributionKind, field: FieldName) -> Self {
        Self {
            name: name.into(),
            kind,
            field,
        }
    }
}

impl Rule for FirstValueRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome> {
        let first = changed.contains(&self.field)
            && ctx
                .predecessor
                .is_some_and(|p| p.number(&self.field) == Some(0.0));
        if !first {
            return Ok(RuleOutcome::none());
        }
        Ok(RuleOutcome::single(Attribution::unknown_time(
            self.kind,
            [self.field.clone()],
        )))
    }
}

/// First interview: a zeroed number and a blank text filled in together
pub struct InterviewRule {
    config: InterviewConfig,
}

impl InterviewRule {
    const NAME: &'static str = "interview";

    pub fn new(config: InterviewConfig) -> Self {
        Self { config }
    }
}

impl Rule for InterviewRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome> {
        let Some(predecessor) = ctx.predecessor else {
            return Ok(RuleOutcome::none());
        };
        let InterviewConfig {
            zero_field,
            blank_field,
        } = &self.config;

        let interviewed = changed.contains(zero_field)
            && changed.contains(blank_field)
            && predecessor.number(zero_field) == Some(0.0)
            && predecessor.text(blank_field) == Some("");
        if !interviewed {
            return Ok(RuleOutcome::none());
        }
        Ok(RuleOutcome::single(Attribution::unknown_time(
            AttributionKind::Interview,
            [zero_field.clone(), blank_field.clone()],
        )))
    }
}

/// Float re-serialization noise
///
/// Claims remaining fields present on both sides whose numeric values
/// differ by less than epsilon. Values of other types are never close.
pub struct PrecisionDriftRule {
    epsilon: f64,
}

impl PrecisionDriftRule {
    const NAME: &'static str = "precision_drift";

    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }
}

impl Rule for PrecisionDriftRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome> {
        let Some(predecessor) = ctx.predecessor else {
            return Ok(RuleOutcome::none());
        };
        let drifted: BTreeSet<FieldName> = changed
            .iter()
            .filter(|f| match (predecessor.field(f), ctx.current.field(f)) {
                (Some(before), Some(after)) => numbers_within_epsilon(before, after, self.epsilon),
                _ => false,
            })
            .map(str::to_string)
            .collect();

        if drifted.is_empty() {
            return Ok(RuleOutcome::none());
        }
        Ok(RuleOutcome::single(Attribution::unknown_time(
            AttributionKind::PrecisionDrift,
            drifted,
        )))
    }
}

/// A field set back to one of its defaults
pub struct ValueResetRule {
    resets: Vec<ValueReset>,
}

impl ValueResetRule {
    const NAME: &'static str = "value_reset";

    pub fn new(resets: Vec<ValueReset>) -> Self {
        Self { resets }
    }
}

impl Rule for ValueResetRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome> {
        let mut claims = Claims::new(Self::NAME, changed);
        for reset in &self.resets {
            let is_reset = claims.remaining().contains(&reset.field)
                && ctx
                    .current
                    .number(&reset.field)
                    .is_some_and(|value| reset.values.contains(&value));
            if is_reset {
                claims.push(Attribution::unknown_time(
                    AttributionKind::ValueReset,
                    [reset.field.clone()],
                ))?;
            }
        }
        Ok(claims.finish())
    }
}

/// Values clamped to a floor from below or a ceiling from above
pub struct AttributesCappedRule {
    caps: CapsConfig,
}

impl AttributesCappedRule {
    const NAME: &'static str = "attributes_capped";

    pub fn new(caps: CapsConfig) -> Self {
        Self { caps }
    }

    fn is_capped(&self, field: &str, predecessor: &Snapshot, current: &Snapshot) -> bool {
        let (Some(before), Some(after)) = (predecessor.number(field), current.number(field)) else {
            return false;
        };
        let floored = self
            .caps
            .floors
            .iter()
            .any(|&floor| after == floor && before < floor);
        let ceilinged = self.caps.ceiling_fields.contains(field)
            && self
                .caps
                .ceilings
                .iter()
                .any(|&ceiling| after == ceiling && before > ceiling);
        floored || ceilinged
    }
}

impl Rule for AttributesCappedRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome> {
        let Some(predecessor) = ctx.predecessor else {
            return Ok(RuleOutcome::none());
        };
        let capped: BTreeSet<FieldName> = changed
            .iter()
            .filter(|f| self.is_capped(f, predecessor, ctx.current))
            .map(str::to_string)
            .collect();

        if capped.is_empty() {
            return Ok(RuleOutcome::none());
        }
        Ok(RuleOutcome::single(Attribution::unknown_time(
            AttributionKind::AttributesCapped,
            capped,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Fields;
    use crate::reference::NoReferenceData;
    use crate::store::InMemoryAuxState;
    use serde_json::json;

    fn snapshot(at: &str, fields: serde_json::Value) -> Snapshot {
        let fields: Fields = serde_json::from_value(fields).unwrap();
        Snapshot::new("p1", at.parse().unwrap(), fields)
    }

    fn apply(
        rule: &dyn Rule,
        predecessor: Option<&Snapshot>,
        current: &Snapshot,
        changed: &[&str],
    ) -> RuleOutcome {
        let mut aux = InMemoryAuxState::new();
        let mut ctx = RuleContext::new(predecessor, current, &NoReferenceData, &mut aux);
        let changed: ChangedFieldSet = changed.iter().copied().collect();
        rule.apply(&mut ctx, &changed).unwrap()
    }

    fn claimed(outcome: &RuleOutcome) -> Vec<&str> {
        outcome
            .attributions
            .iter()
            .flat_map(|a| a.fields.iter().map(String::as_str))
            .collect()
    }

    #[test]
    fn test_first_blood() {
        let rule = FirstValueRule::new("first_blood", AttributionKind::FirstBlood, "blood".into());
        let before = snapshot("2020-09-01T00:00:00Z", json!({"blood": 0}));
        let after = snapshot("2020-09-02T00:00:00Z", json!({"blood": 4}));
        let outcome = apply(&rule, Some(&before), &after, &["blood"]);
        assert_eq!(outcome.attributions[0].kind, AttributionKind::FirstBlood);

        let again = snapshot("2020-09-03T00:00:00Z", json!({"blood": 5}));
        assert!(apply(&rule, Some(&after), &again, &["blood"]).is_empty());
        assert!(apply(&rule, None, &after, &["blood"]).is_empty());
    }

    #[test]
    fn test_interview_needs_both_fields() {
        let rule = InterviewRule::new(InterviewConfig {
            zero_field: "coffee".into(),
            blank_field: "ritual".into(),
        });
        let before = snapshot("2020-09-01T00:00:00Z", json!({"coffee": 0, "ritual": ""}));
        let after = snapshot("2020-09-02T00:00:00Z", json!({"coffee": 3, "ritual": "Yoga"}));
        let outcome = apply(&rule, Some(&before), &after, &["coffee", "ritual", "moxie"]);
        assert_eq!(claimed(&outcome), vec!["coffee", "ritual"]);

        assert!(apply(&rule, Some(&before), &after, &["coffee"]).is_empty());
    }

    #[test]
    fn test_drift_within_epsilon() {
        let rule = PrecisionDriftRule::new(1e-9);
        let before = snapshot("2020-09-01T00:00:00Z", json!({"a": 0.100000001, "b": 0.5}));
        let after = snapshot("2020-09-02T00:00:00Z", json!({"a": 0.1000000005, "b": 0.6}));
        let outcome = apply(&rule, Some(&before), &after, &["a", "b"]);
        assert_eq!(claimed(&outcome), vec!["a"]);
        assert_eq!(
            outcome.attributions[0].kind,
            AttributionKind::PrecisionDrift
        );
    }

    #[test]
    fn test_drift_ignores_type_changes_and_missing_sides() {
        let rule = PrecisionDriftRule::new(1e-9);
        let before = snapshot("2020-09-01T00:00:00Z", json!({"a": "1", "b": 1}));
        let after = snapshot("2020-09-02T00:00:00Z", json!({"a": 1}));
        assert!(apply(&rule, Some(&before), &after, &["a", "b"]).is_empty());
    }

    #[test]
    fn test_value_reset() {
        let rule = ValueResetRule::new(vec![ValueReset {
            field: "tragicness".into(),
            values: vec![0.0, 0.1],
        }]);
        let before = snapshot("2020-09-01T00:00:00Z", json!({"tragicness": 0.4}));
        let reset = snapshot("2020-09-02T00:00:00Z", json!({"tragicness": 0.1}));
        let moved = snapshot("2020-09-02T00:00:00Z", json!({"tragicness": 0.2}));
        assert_eq!(
            claimed(&apply(&rule, Some(&before), &reset, &["tragicness"])),
            vec!["tragicness"]
        );
        assert!(apply(&rule, Some(&before), &moved, &["tragicness"]).is_empty());
    }

    #[test]
    fn test_caps() {
        let rule = AttributesCappedRule::new(CapsConfig {
            floors: vec![0.01, 0.001],
            ceilings: vec![0.99, 0.999],
            ceiling_fields: ["tragicness".to_string()].into_iter().collect(),
        });
        let before = snapshot(
            "2020-09-01T00:00:00Z",
            json!({"moxie": 0.005, "tragicness": 0.995, "buoyancy": 0.9995, "divinity": 0.5}),
        );
        let after = snapshot(
            "2020-09-02T00:00:00Z",
            json!({"moxie": 0.01, "tragicness": 0.99, "buoyancy": 0.999, "divinity": 0.01}),
        );
        let outcome = apply(
            &rule,
            Some(&before),
            &after,
            &["moxie", "tragicness", "buoyancy", "divinity"],
        );
        assert_eq!(claimed(&outcome), vec!["moxie", "tragicness"]);
    }
}
