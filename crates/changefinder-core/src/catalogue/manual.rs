use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use super::config::{ManualOverride, ManualPattern};
use super::Claims;
use crate::diff::ChangedFieldSet;
use crate::errors::Result;
use crate::model::{Attribution, AttributionKind, EntityId, FieldName};
use crate::rule::{Rule, RuleContext, RuleOutcome};

/// Hand edits by the source's operators
///
/// Exact `(entity_id, valid_from)` entries claim whichever of their listed
/// fields are still remaining. Patterns then claim a lone changed field
/// whose previous value was a known placeholder.
pub struct ManualOverrideRule {
    overrides: HashMap<(EntityId, DateTime<Utc>), BTreeSet<FieldName>>,
    patterns: Vec<ManualPattern>,
}

impl ManualOverrideRule {
    const NAME: &'static str = "manual_override";

    pub fn new(overrides: &[ManualOverride], patterns: Vec<ManualPattern>) -> Self {
        let overrides = overrides
            .iter()
            .map(|o| ((o.entity_id.clone(), o.valid_from), o.fields.clone()))
            .collect();
        Self {
            overrides,
            patterns,
        }
    }
}

impl Rule for ManualOverrideRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome> {
        let mut claims = Claims::new(Self::NAME, changed);

        let key = (ctx.entity_id().to_string(), ctx.current.valid_from);
        if let Some(fields) = self.overrides.get(&key) {
            let fields = claims
                .remaining()
                .intersection(fields.iter().map(String::as_str));
            if !fields.is_empty() {
                claims.push(Attribution::unknown_time(AttributionKind::Manual, fields))?;
            }
        }

        if let Some(predecessor) = ctx.predecessor {
            for pattern in &self.patterns {
                let remaining = claims.remaining();
                if remaining.len() != 1 || !remaining.contains(&pattern.field) {
                    continue;
                }
                let replaced_placeholder = predecessor
                    .text(&pattern.field)
                    .is_some_and(|previous| pattern.previous_values.contains(previous));
                if replaced_placeholder {
                    claims.push(Attribution::unknown_time(
                        AttributionKind::Manual,
                        [pattern.field.clone()],
                    ))?;
                }
            }
        }

        Ok(claims.finish())
    }
}
