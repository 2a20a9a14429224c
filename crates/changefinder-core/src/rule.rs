//! The Rule contract.
//!
//! A rule recognizes a diff pattern and claims responsibility for part of
//! it. Rules run in a fixed priority order; each sees the predecessor (if
//! any), the current snapshot, the still-unexplained field names, and its
//! injected collaborators, and returns the attributions it makes.
//!
//! Rules never mutate the changed set themselves. The pipeline checks each
//! returned attribution against the set as it stood before that
//! attribution and then removes the claimed names, so "removes exactly
//! what it claims" holds by construction and a bad claim surfaces as a
//! [`ClaimViolation`](crate::ChangeFinderError::ClaimViolation).

use serde_json::Value;

use crate::diff::ChangedFieldSet;
use crate::errors::Result;
use crate::model::{Anomaly, Attribution, Snapshot};
use crate::reference::{expect_at_most_one, ReferenceData, ReferenceRecord, TimeWindow};
use crate::store::AuxStateStore;

/// Everything a rule may look at while handling one snapshot
pub struct RuleContext<'a> {
    pub predecessor: Option<&'a Snapshot>,
    pub current: &'a Snapshot,
    reference: &'a dyn ReferenceData,
    aux: &'a mut dyn AuxStateStore,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        predecessor: Option<&'a Snapshot>,
        current: &'a Snapshot,
        reference: &'a dyn ReferenceData,
        aux: &'a mut dyn AuxStateStore,
    ) -> Self {
        Self {
            predecessor,
            current,
            reference,
            aux,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.current.entity_id
    }

    /// Auxiliary fact stored for this entity under `slot`
    pub fn aux_get(&self, slot: &str) -> Option<&Value> {
        self.aux.get(&self.current.entity_id, slot)
    }

    /// Remember a fact for this entity under `slot`
    pub fn aux_set(&mut self, slot: &str, value: Value) {
        let entity_id = self.current.entity_id.clone();
        self.aux.set(&entity_id, slot, value);
    }

    /// Every record of `table` involving this entity inside `window`
    pub fn lookup_all(&self, table: &str, window: &TimeWindow) -> Vec<&'a ReferenceRecord> {
        self.reference.lookup(table, &self.current.entity_id, window)
    }

    /// The single record of `table` involving this entity inside `window`
    ///
    /// # Errors
    ///
    /// Returns `AmbiguousReferenceMatch` (attributed to `rule`) when more
    /// than one record matched.
    pub fn lookup_one(
        &self,
        rule: &str,
        table: &str,
        window: &TimeWindow,
    ) -> Result<Option<&'a ReferenceRecord>> {
        let records = self.lookup_all(table, window);
        expect_at_most_one(rule, table, &self.current.entity_id, records)
    }
}

/// What one rule invocation produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOutcome {
    /// Claims in the order they apply; each must be disjoint from the ones before it
    pub attributions: Vec<Attribution>,
    /// Non-fatal anomalies noticed along the way
    pub anomalies: Vec<Anomaly>,
}

impl RuleOutcome {
    /// The rule does not fire
    pub fn none() -> Self {
        Self::default()
    }

    pub fn single(attribution: Attribution) -> Self {
        Self {
            attributions: vec![attribution],
            anomalies: Vec::new(),
        }
    }

    pub fn with(mut self, attribution: Attribution) -> Self {
        self.attributions.push(attribution);
        self
    }

    pub fn with_anomaly(mut self, anomaly: Anomaly) -> Self {
        self.anomalies.push(anomaly);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.attributions.is_empty() && self.anomalies.is_empty()
    }
}

/// A unit of attribution logic
///
/// Implementations inspect only the context, the remaining changed set,
/// and their own configuration. They may return zero, one, or several
/// attributions; independent mechanisms may each explain a disjoint part
/// of one diff.
pub trait Rule: Send + Sync {
    /// Stable name used in logs and errors
    fn name(&self) -> &str;

    /// Examine one snapshot and claim what this rule explains
    ///
    /// # Errors
    ///
    /// Returns `AmbiguousReferenceMatch` when a lookup that should match at
    /// most once matched several records. No other error is expected.
    fn apply(&self, ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome>;
}

/// A rule backed by a closure
///
/// Handy for one-off rules and tests.
///
/// ```
/// use changefinder_core::rule::{FnRule, RuleOutcome};
/// use changefinder_core::{Attribution, AttributionKind};
///
/// let rule = FnRule::new("hits", |_ctx, changed| {
///     let hits = changed.intersection(["hitStreak"]);
///     if hits.is_empty() {
///         return Ok(RuleOutcome::none());
///     }
///     Ok(RuleOutcome::single(Attribution::unknown_time(
///         AttributionKind::CounterTracker,
///         hits,
///     )))
/// });
/// ```
pub struct FnRule<F> {
    name: String,
    f: F,
}

impl<F> FnRule<F>
where
    F: Fn(&mut RuleContext<'_>, &ChangedFieldSet) -> Result<RuleOutcome> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Rule for FnRule<F>
where
    F: Fn(&mut RuleContext<'_>, &ChangedFieldSet) -> Result<RuleOutcome> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &mut RuleContext<'_>, changed: &ChangedFieldSet) -> Result<RuleOutcome> {
        (self.f)(ctx, changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributionKind, Fields};
    use crate::reference::{InMemoryReferenceData, NoReferenceData};
    use crate::store::InMemoryAuxState;
    use serde_json::json;

    fn snapshot() -> Snapshot {
        Snapshot::new("p1", "2020-08-03T04:23:53Z".parse().unwrap(), Fields::new())
    }

    #[test]
    fn test_aux_is_scoped_to_current_entity() {
        let current = snapshot();
        let mut aux = InMemoryAuxState::new();
        {
            let mut ctx = RuleContext::new(None, &current, &NoReferenceData, &mut aux);
            ctx.aux_set("seen", json!(true));
            assert_eq!(ctx.aux_get("seen"), Some(&json!(true)));
        }
        assert_eq!(aux.get("p1", "seen"), Some(&json!(true)));
        assert!(aux.get("p2", "seen").is_none());
    }

    #[test]
    fn test_lookup_one_with_empty_reference_data() {
        let current = snapshot();
        let mut aux = InMemoryAuxState::new();
        let reference = InMemoryReferenceData::new();
        let ctx = RuleContext::new(None, &current, &reference, &mut aux);
        let window = TimeWindow::lookback(current.valid_from, chrono::Duration::hours(1));
        assert_eq!(ctx.lookup_one("r", "games", &window).unwrap(), None);
    }

    #[test]
    fn test_fn_rule_delegates() {
        let rule = FnRule::new("everything", |_ctx, changed| {
            Ok(RuleOutcome::single(Attribution::unknown_time(
                AttributionKind::Manual,
                changed.iter(),
            )))
        });
        let current = snapshot();
        let mut aux = InMemoryAuxState::new();
        let mut ctx = RuleContext::new(None, &current, &NoReferenceData, &mut aux);
        let changed: ChangedFieldSet = ["a"].into_iter().collect();

        let outcome = rule.apply(&mut ctx, &changed).unwrap();
        assert_eq!(rule.name(), "everything");
        assert_eq!(outcome.attributions.len(), 1);
        assert!(outcome.anomalies.is_empty());
    }

    #[test]
    fn test_outcome_builders() {
        assert!(RuleOutcome::none().is_empty());
        let outcome = RuleOutcome::none()
            .with(Attribution::unknown(["a"]))
            .with_anomaly(Anomaly::impossible_transition("r", "odd"));
        assert_eq!(outcome.attributions.len(), 1);
        assert_eq!(outcome.anomalies.len(), 1);
    }
}
