//! Rules for changes in the shape of the data rather than in the entity.

use std::collections::BTreeSet;

use chrono::{DateTime, SubsecRound, Utc};

use super::config::FormatChange;
use super::{is_zero_like, Claims};
use crate::diff::ChangedFieldSet;
use crate::errors::Result;
use crate::model::{Attribution, AttributionKind, FieldName};
use crate::rule::{Rule, RuleContext, RuleOutcome};

/// First observation of an entity when recording began
///
/// Matches to the second: some sources carry milliseconds, some don't.
pub struct RecordingStartRule {
    start: DateTime<Utc>,
}

impl RecordingStartRule {
    const NAME: &'static str = "recording_start";

    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start: start.trunc_subsecs(0),
        }
    }
}

impl Rule for RecordingStartRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome> {
        if ctx.predecessor.is_some() || ctx.current.valid_from.trunc_subsecs(0) != self.start {
            return Ok(RuleOutcome::none());
        }
        Ok(RuleOutcome::single(Attribution::unknown_time(
            AttributionKind::RecordingStart,
            changed.iter(),
        )))
    }
}

/// A set of fields renamed together, e.g. `id` becoming `_id`
///
/// Fires only when the remaining set is exactly one configured group.
pub struct RenamedAttributesRule {
    groups: Vec<BTreeSet<FieldName>>,
}

impl RenamedAttributesRule {
    const NAME: &'static str = "renamed_attributes";

    pub fn new(groups: Vec<BTreeSet<FieldName>>) -> Self {
        Self { groups }
    }
}

impl Rule for RenamedAttributesRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, _ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome> {
        let matched = self.groups.iter().find(|group| changed.as_set() == *group);
        Ok(match matched {
            Some(group) => RuleOutcome::single(Attribution::unknown_time(
                AttributionKind::RenamedAttributes,
                group.iter().cloned(),
            )),
            None => RuleOutcome::none(),
        })
    }
}

/// A field whose encoding changed at a known instant
pub struct FormatChangeRule {
    changes: Vec<FormatChange>,
}

impl FormatChangeRule {
    const NAME: &'static str = "format_change";

    pub fn new(changes: Vec<FormatChange>) -> Self {
        Self { changes }
    }
}

impl Rule for FormatChangeRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome> {
        let mut claims = Claims::new(Self::NAME, changed);
        for change in &self.changes {
            if claims.remaining().contains(&change.field)
                && change.instants.contains(&ctx.current.valid_from)
            {
                claims.push(Attribution::unknown_time(
                    AttributionKind::ChangedAttributeFormat,
                    [change.field.clone()],
                ))?;
            }
        }
        Ok(claims.finish())
    }
}

/// Counters that move with nearly every appearance of the entity
pub struct CounterTrackerRule {
    fields: BTreeSet<FieldName>,
}

impl CounterTrackerRule {
    const NAME: &'static str = "counter_tracker";

    pub fn new(fields: BTreeSet<FieldName>) -> Self {
        Self { fields }
    }
}

impl Rule for CounterTrackerRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, _ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome> {
        let counters = changed.intersection(self.fields.iter().map(String::as_str));
        if counters.is_empty() {
            return Ok(RuleOutcome::none());
        }
        Ok(RuleOutcome::single(Attribution::unknown_time(
            AttributionKind::CounterTracker,
            counters,
        )))
    }
}

/// A group of attributes introduced to every entity at once
///
/// Each group must have changed in full and been absent or zero before.
pub struct AddedAttributesRule {
    groups: Vec<BTreeSet<FieldName>>,
}

impl AddedAttributesRule {
    const NAME: &'static str = "added_attributes";

    pub fn new(groups: Vec<BTreeSet<FieldName>>) -> Self {
        Self { groups }
    }
}

impl Rule for AddedAttributesRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome> {
        let Some(predecessor) = ctx.predecessor else {
            return Ok(RuleOutcome::none());
        };

        let mut claims = Claims::new(Self::NAME, changed);
        for group in &self.groups {
            let added = claims
                .remaining()
                .contains_all(group.iter().map(String::as_str))
                && group.iter().all(|f| is_zero_like(predecessor.field(f)));
            if added {
                claims.push(Attribution::unknown_time(
                    AttributionKind::AddedAttributes,
                    group.iter().cloned(),
                ))?;
            }
        }
        Ok(claims.finish())
    }
}
