//! Pipeline Runner
//!
//! Drives each snapshot through diff, the ordered rule list, and the
//! Unknown fallback, producing one [`Change`] per snapshot.
//!
//! ## Processing a snapshot
//!
//! 1. Fetch the predecessor for the entity; reject a snapshot older than it.
//! 2. Diff predecessor and current into a [`ChangedFieldSet`].
//! 3. Run rules in priority order. Every attribution a rule returns is
//!    checked against the set as it stood before that attribution
//!    (non-empty, subset of remaining) and its fields are removed. Stop as
//!    soon as nothing remains.
//! 4. Whatever remains is claimed by a single Unknown attribution.
//! 5. Store the current snapshot as the new predecessor, even on fallback.
//!
//! A fatal error (ambiguous reference match, claim violation, out-of-order
//! snapshot) aborts the snapshot before step 5, so the stored predecessor
//! is left as it was. Auxiliary state written by rules that ran before the
//! failure is kept.

use changefinder_core_types::RunId;
use tracing::{debug, info, warn};

use crate::diff::{compute_changed_fields, ChangedFieldSet};
use crate::errors::{ChangeFinderError, Result};
use crate::logging_facility::schema::{EVENT_ANOMALY, EVENT_FALLBACK, EVENT_RULE_FIRED};
use crate::model::{Attribution, Change, Snapshot};
use crate::reference::ReferenceData;
use crate::rule::{Rule, RuleContext};
use crate::store::{AuxStateStore, InMemoryAuxState, InMemorySnapshotStore, SnapshotStore};
use crate::{log_op_end, log_op_error, log_op_start};

/// Ordered rule list plus the stores it reads and writes
///
/// Configured only through the rules it is built with. One pipeline owns
/// its stores; to process entities in parallel, shard snapshots by entity
/// id across several pipelines.
pub struct Pipeline<S = InMemorySnapshotStore, A = InMemoryAuxState> {
    rules: Vec<Box<dyn Rule>>,
    reference: Box<dyn ReferenceData>,
    snapshots: S,
    aux: A,
    run_id: RunId,
}

impl Pipeline {
    /// Create a pipeline with empty in-memory stores
    pub fn new<R>(rules: Vec<Box<dyn Rule>>, reference: R) -> Self
    where
        R: ReferenceData + 'static,
    {
        Self::with_stores(
            rules,
            reference,
            InMemorySnapshotStore::new(),
            InMemoryAuxState::new(),
        )
    }
}

impl<S, A> Pipeline<S, A>
where
    S: SnapshotStore,
    A: AuxStateStore,
{
    /// Create a pipeline over injected stores
    pub fn with_stores<R>(rules: Vec<Box<dyn Rule>>, reference: R, snapshots: S, aux: A) -> Self
    where
        R: ReferenceData + 'static,
    {
        Self {
            rules,
            reference: Box::new(reference),
            snapshots,
            aux,
            run_id: RunId::new(),
        }
    }

    /// Correlation id attached to every log line of this pipeline
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Rule names in priority order
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn snapshot_store(&self) -> &S {
        &self.snapshots
    }

    pub fn aux_state(&self) -> &A {
        &self.aux
    }

    /// Attribute one snapshot
    ///
    /// # Errors
    ///
    /// - `OutOfOrderSnapshot` if `current` is older than the stored predecessor
    /// - `AmbiguousReferenceMatch` if a rule's lookup matched several records
    /// - `ClaimViolation` / `EmptyClaim` if a rule broke the claim contract
    ///
    /// On error the snapshot store is not updated.
    pub fn process(&mut self, current: Snapshot) -> Result<Change> {
        let entity_id = current.entity_id.clone();
        log_op_start!(
            "process",
            entity_id = entity_id.as_str(),
            run_id = self.run_id.as_str()
        );
        let start = std::time::Instant::now();

        let change = self.process_impl(current).map_err(|e| {
            log_op_error!(
                "process",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                entity_id = entity_id.as_str(),
                run_id = self.run_id.as_str()
            );
            e
        })?;

        log_op_end!(
            "process",
            duration_ms = start.elapsed().as_millis() as u64,
            entity_id = entity_id.as_str(),
            run_id = self.run_id.as_str(),
            changed_len = change.claimed_fields().len(),
            attributions_len = change.attributions.len(),
            anomalies_len = change.anomalies.len()
        );

        Ok(change)
    }

    /// Attribute an ordered batch, one Change per snapshot in input order
    ///
    /// # Errors
    ///
    /// Stops at the first fatal error; see [`Pipeline::process`].
    pub fn process_all<I>(&mut self, snapshots: I) -> Result<Vec<Change>>
    where
        I: IntoIterator<Item = Snapshot>,
    {
        snapshots.into_iter().map(|s| self.process(s)).collect()
    }

    fn process_impl(&mut self, current: Snapshot) -> Result<Change> {
        let predecessor = self.snapshots.get(&current.entity_id);

        if let Some(previous) = predecessor {
            if current.valid_from < previous.valid_from {
                return Err(ChangeFinderError::OutOfOrderSnapshot {
                    entity_id: current.entity_id.clone(),
                    previous: previous.valid_from.to_rfc3339(),
                    current: current.valid_from.to_rfc3339(),
                });
            }
        }

        let mut changed = compute_changed_fields(predecessor, &current);
        let mut attributions = Vec::new();
        let mut anomalies = Vec::new();

        let run_id = self.run_id.as_str();
        let mut ctx = RuleContext::new(predecessor, &current, self.reference.as_ref(), &mut self.aux);
        for rule in &self.rules {
            if changed.is_empty() {
                break;
            }
            let outcome = rule.apply(&mut ctx, &changed)?;

            for attribution in outcome.attributions {
                changed.claim(rule.name(), &attribution.fields)?;
                debug!(
                    component = module_path!(),
                    op = "process",
                    event = EVENT_RULE_FIRED,
                    entity_id = current.entity_id.as_str(),
                    run_id,
                    rule = rule.name(),
                    kind = attribution.kind.as_str(),
                    fields = ?attribution.fields,
                );
                attributions.push(attribution);
            }

            for anomaly in outcome.anomalies {
                warn!(
                    component = module_path!(),
                    op = "process",
                    event = EVENT_ANOMALY,
                    entity_id = current.entity_id.as_str(),
                    run_id,
                    rule = anomaly.rule.as_str(),
                    description = anomaly.description.as_str(),
                );
                anomalies.push(anomaly);
            }
        }

        if let Some(fallback) = unknown_fallback(&mut changed) {
            info!(
                component = module_path!(),
                op = "process",
                event = EVENT_FALLBACK,
                entity_id = current.entity_id.as_str(),
                run_id,
                fields = ?fallback.fields,
            );
            attributions.push(fallback);
        }

        let change = Change {
            entity_id: current.entity_id.clone(),
            valid_from: current.valid_from,
            predecessor: predecessor.map(|p| p.fields.clone()),
            current: current.fields.clone(),
            attributions,
            anomalies,
        };

        let entity_id = current.entity_id.clone();
        self.snapshots.set(&entity_id, current);

        Ok(change)
    }
}

/// The Unknown attribution for whatever no rule explained, if anything
fn unknown_fallback(changed: &mut ChangedFieldSet) -> Option<Attribution> {
    if changed.is_empty() {
        return None;
    }
    Some(Attribution::unknown(changed.take_remaining()))
}
