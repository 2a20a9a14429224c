//! Rules corroborated by reference event tables.
//!
//! Event lookups expect zero or one record; zero means the rule does not
//! fire, more than one is a fatal ambiguous match. The games table is the
//! exception: only the latest game before the snapshot counts.

use chrono::Duration;

use super::config::{IncinerationConfig, MatchMode, ReferenceEventConfig, WeeklyModsConfig};
use super::is_empty_value;
use crate::diff::ChangedFieldSet;
use crate::errors::Result;
use crate::model::{Attribution, AttributionKind};
use crate::reference::{expect_at_most_one, TimeWindow};
use crate::rule::{Rule, RuleContext, RuleOutcome};

/// Position of the incinerated entity in an incineration record
const VICTIM: usize = 0;
/// Position of the entity that took the victim's place
const REPLACEMENT: usize = 1;

/// A change explained by one record of a reference table observed between
/// the predecessor and the current snapshot
pub struct ReferenceEventRule {
    name: String,
    kind: AttributionKind,
    config: ReferenceEventConfig,
}

impl ReferenceEventRule {
    pub fn new(name: impl Into<String>, kind: AttributionKind, config: ReferenceEventConfig) -> Self {
        Self {
            name: name.into(),
            kind,
            config,
        }
    }
}

impl Rule for ReferenceEventRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome> {
        let Some(predecessor) = ctx.predecessor else {
            return Ok(RuleOutcome::none());
        };

        let watched = || self.config.fields.iter().map(String::as_str);
        let fields = match self.config.mode {
            MatchMode::AllWithin if changed.is_subset_of(watched()) => changed.as_set().clone(),
            MatchMode::AllWithin => return Ok(RuleOutcome::none()),
            MatchMode::AnyOf => changed.intersection(watched()),
        };
        if fields.is_empty() {
            return Ok(RuleOutcome::none());
        }

        let window = TimeWindow::between(predecessor.valid_from, ctx.current.valid_from);
        Ok(match ctx.lookup_one(&self.name, &self.config.table, &window)? {
            Some(record) => {
                RuleOutcome::single(Attribution::new(self.kind, fields, record.game_event()))
            }
            None => RuleOutcome::none(),
        })
    }
}

/// Incineration victims and their replacements
///
/// A replacement appears with no predecessor, so its record is searched
/// over the lookback leading up to its first snapshot, and it claims
/// everything. A victim claims only the deceased flag, searched between
/// its predecessor and current snapshot.
pub struct IncinerationRule {
    config: IncinerationConfig,
    lookback: Duration,
}

impl IncinerationRule {
    const NAME: &'static str = "incineration";

    pub fn new(config: IncinerationConfig, lookback: Duration) -> Self {
        Self { config, lookback }
    }
}

impl Rule for IncinerationRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome> {
        let (window, position) = match ctx.predecessor {
            None => (
                TimeWindow::lookback(ctx.current.valid_from, self.lookback),
                REPLACEMENT,
            ),
            Some(_) if !changed.contains(&self.config.deceased_field) => {
                return Ok(RuleOutcome::none())
            }
            Some(predecessor) => (
                TimeWindow::between(predecessor.valid_from, ctx.current.valid_from),
                VICTIM,
            ),
        };

        let entity_id = ctx.entity_id();
        let records = ctx
            .lookup_all(&self.config.table, &window)
            .into_iter()
            .filter(|r| r.has_participant_at(position, entity_id))
            .collect();
        let Some(record) = expect_at_most_one(Self::NAME, &self.config.table, entity_id, records)?
        else {
            return Ok(RuleOutcome::none());
        };

        let attribution = if position == REPLACEMENT {
            Attribution::new(
                AttributionKind::IncinerationReplacement,
                changed.iter(),
                record.game_event(),
            )
        } else {
            Attribution::new(
                AttributionKind::Incinerated,
                [self.config.deceased_field.clone()],
                record.game_event(),
            )
        };
        Ok(RuleOutcome::single(attribution))
    }
}

/// Weekly modifications removed at the close of a period
///
/// The field must have been emptied, and the last game the entity played
/// since its predecessor must fall on the last day of a period.
pub struct WeeklyModsWearOffRule {
    config: WeeklyModsConfig,
}

impl WeeklyModsWearOffRule {
    const NAME: &'static str = "weekly_mods_wear_off";

    pub fn new(config: WeeklyModsConfig) -> Self {
        Self { config }
    }
}

impl Rule for WeeklyModsWearOffRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome> {
        let Some(predecessor) = ctx.predecessor else {
            return Ok(RuleOutcome::none());
        };
        let field = &self.config.field;
        if !changed.contains(field) || !is_empty_value(ctx.current.field(field)) {
            return Ok(RuleOutcome::none());
        }

        let window = TimeWindow::between(predecessor.valid_from, ctx.current.valid_from);
        // Tables are sorted by observed_at
        let Some(game) = ctx.lookup_all(&self.config.games_table, &window).pop() else {
            return Ok(RuleOutcome::none());
        };
        let closes_period = game
            .day
            .checked_add(1)
            .is_some_and(|next| next % self.config.period_days == 0);
        if !closes_period {
            return Ok(RuleOutcome::none());
        }
        Ok(RuleOutcome::single(Attribution::new(
            AttributionKind::WeeklyModsWearOff,
            [field.clone()],
            game.period_boundary(),
        )))
    }
}
