//! Rules keyed on known stretches of time.

use serde_json::Value;

use super::config::{ElectionWindow, SourceDefectWindow};
use super::{is_truthy, Claims};
use crate::diff::ChangedFieldSet;
use crate::errors::Result;
use crate::model::{Anomaly, Attribution, AttributionKind, Provenance};
use crate::rule::{Rule, RuleContext, RuleOutcome};

/// Aux slot remembering whether the source defect last set (`true`) or
/// cleared (`false`) the allergy flag
pub const CREEPING_ALLERGY_SLOT: &str = "creeping_allergy";

/// Elections held before the event feed recorded them
///
/// Everything that changed inside a window is blamed on that season's
/// election.
pub struct ElectionWindowRule {
    elections: Vec<ElectionWindow>,
}

impl ElectionWindowRule {
    const NAME: &'static str = "election_window";

    pub fn new(elections: Vec<ElectionWindow>) -> Self {
        Self { elections }
    }
}

impl Rule for ElectionWindowRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome> {
        let at = ctx.current.valid_from;
        Ok(match self.elections.iter().find(|e| e.contains(at)) {
            Some(election) => RuleOutcome::single(Attribution::new(
                AttributionKind::PreFeedElection,
                changed.iter(),
                Provenance::Scheduled {
                    season: election.season,
                },
            )),
            None => RuleOutcome::none(),
        })
    }
}

/// Allergy flags toggled by a source defect
///
/// Inside the defect window, a diff of only companion fields that toggles
/// the allergy flag is the defect at work. The defect sets the flag at
/// most once per entity and clears it only after that set. Aux state tracks
/// the flag, and any toggle breaking that order is reported as an anomaly.
pub struct CreepingAllergyRule {
    window: SourceDefectWindow,
}

impl CreepingAllergyRule {
    const NAME: &'static str = "creeping_allergy";

    pub fn new(window: SourceDefectWindow) -> Self {
        Self { window }
    }
}

impl Rule for CreepingAllergyRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome> {
        let field = &self.window.allergy_field;
        if ctx.predecessor.is_none()
            || !self.window.contains(ctx.current.valid_from)
            || !changed.contains(field)
            || !changed.is_subset_of(self.window.companions.iter().map(String::as_str))
        {
            return Ok(RuleOutcome::none());
        }

        let mut claims = Claims::new(Self::NAME, changed);
        let previously_set = ctx.aux_get(CREEPING_ALLERGY_SLOT).and_then(Value::as_bool);
        let now_set = is_truthy(ctx.current.field(field));

        let kind = if now_set {
            match previously_set {
                None => {}
                Some(true) => claims.anomaly(Anomaly::impossible_transition(
                    Self::NAME,
                    format!("{} set twice for {}", field, ctx.entity_id()),
                )),
                Some(false) => claims.anomaly(Anomaly::impossible_transition(
                    Self::NAME,
                    format!("{} set again after clearing for {}", field, ctx.entity_id()),
                )),
            }
            AttributionKind::CreepingAllergy
        } else {
            match previously_set {
                None => claims.anomaly(Anomaly::impossible_transition(
                    Self::NAME,
                    format!("{} cleared for {} without being set", field, ctx.entity_id()),
                )),
                Some(false) => claims.anomaly(Anomaly::impossible_transition(
                    Self::NAME,
                    format!("{} cleared twice for {}", field, ctx.entity_id()),
                )),
                Some(true) => {}
            }
            AttributionKind::CreepingDeallergize
        };

        ctx.aux_set(CREEPING_ALLERGY_SLOT, Value::Bool(now_set));
        claims.push(Attribution::unknown_time(kind, [field.clone()]))?;
        Ok(claims.finish())
    }
}

/// Zero fate spuriously replaced during the source defect window
pub struct FatelessFatedRule {
    window: SourceDefectWindow,
}

impl FatelessFatedRule {
    const NAME: &'static str = "fateless_fated";

    pub fn new(window: SourceDefectWindow) -> Self {
        Self { window }
    }
}

impl Rule for FatelessFatedRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome> {
        let Some(predecessor) = ctx.predecessor else {
            return Ok(RuleOutcome::none());
        };
        let field = &self.window.fate_field;
        let fated = self.window.contains(ctx.current.valid_from)
            && changed.contains(field)
            && changed.is_subset_of(self.window.companions.iter().map(String::as_str))
            && predecessor.number(field) == Some(0.0)
            && ctx.current.number(field).is_some_and(|fate| fate != 0.0);

        if !fated {
            return Ok(RuleOutcome::none());
        }
        Ok(RuleOutcome::single(Attribution::unknown_time(
            AttributionKind::FatelessFated,
            [field.clone()],
        )))
    }
}
