//! The shrinking set of not-yet-explained field names.

use std::collections::BTreeSet;

use crate::errors::{ChangeFinderError, Result};
use crate::model::FieldName;

/// Field names that changed and are still unexplained during one pipeline run
///
/// Seeded from a diff, shrinks monotonically as attributions are accepted,
/// never persisted across runs. Rules only ever see it read-only; the
/// pipeline is the sole place that removes claimed names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedFieldSet {
    remaining: BTreeSet<FieldName>,
}

impl ChangedFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.remaining.contains(field)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.remaining.iter().map(String::as_str)
    }

    /// Remaining names as an owned, sorted vector
    pub fn to_vec(&self) -> Vec<&str> {
        self.iter().collect()
    }

    pub fn as_set(&self) -> &BTreeSet<FieldName> {
        &self.remaining
    }

    /// Whether every remaining name is one of `allowed`
    pub fn is_subset_of<'a, I>(&self, allowed: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let allowed: BTreeSet<&str> = allowed.into_iter().collect();
        self.iter().all(|f| allowed.contains(f))
    }

    /// Whether every name in `fields` is still remaining
    pub fn contains_all<'a, I>(&self, fields: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        fields.into_iter().all(|f| self.contains(f))
    }

    /// Remaining names that are also in `fields`
    pub fn intersection<'a, I>(&self, fields: I) -> BTreeSet<FieldName>
    where
        I: IntoIterator<Item = &'a str>,
    {
        fields
            .into_iter()
            .filter(|f| self.contains(f))
            .map(str::to_string)
            .collect()
    }

    /// Consume a claim on behalf of `rule`.
    ///
    /// The claim must be non-empty and every field must still be
    /// remaining; on success the fields are removed.
    ///
    /// # Errors
    ///
    /// - `EmptyClaim` if `fields` is empty
    /// - `ClaimViolation` naming the first field not in the remaining set;
    ///   nothing is removed in that case
    pub fn claim(&mut self, rule: &str, fields: &BTreeSet<FieldName>) -> Result<()> {
        if fields.is_empty() {
            return Err(ChangeFinderError::EmptyClaim {
                rule: rule.to_string(),
            });
        }
        if let Some(field) = fields.iter().find(|f| !self.remaining.contains(*f)) {
            return Err(ChangeFinderError::ClaimViolation {
                rule: rule.to_string(),
                field: field.clone(),
            });
        }
        for field in fields {
            self.remaining.remove(field);
        }
        Ok(())
    }

    /// Hand back everything still remaining, leaving the set empty
    pub fn take_remaining(&mut self) -> BTreeSet<FieldName> {
        std::mem::take(&mut self.remaining)
    }
}

impl FromIterator<FieldName> for ChangedFieldSet {
    fn from_iter<T: IntoIterator<Item = FieldName>>(iter: T) -> Self {
        Self {
            remaining: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for ChangedFieldSet {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        iter.into_iter().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<FieldName> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_claim_removes_fields() {
        let mut changed: ChangedFieldSet = ["a", "b", "c"].into_iter().collect();
        changed.claim("r", &set(&["a", "c"])).unwrap();
        assert_eq!(changed.to_vec(), vec!["b"]);
    }

    #[test]
    fn test_claim_outside_remaining_is_violation() {
        let mut changed: ChangedFieldSet = ["a", "b"].into_iter().collect();
        let err = changed.claim("r", &set(&["a", "z"])).unwrap_err();
        assert_eq!(
            err,
            ChangeFinderError::ClaimViolation {
                rule: "r".to_string(),
                field: "z".to_string()
            }
        );
        // Nothing consumed on failure
        assert_eq!(changed.len(), 2);
    }

    #[test]
    fn test_double_claim_is_violation() {
        let mut changed: ChangedFieldSet = ["a"].into_iter().collect();
        changed.claim("first", &set(&["a"])).unwrap();
        assert!(matches!(
            changed.claim("second", &set(&["a"])),
            Err(ChangeFinderError::ClaimViolation { .. })
        ));
    }

    #[test]
    fn test_empty_claim_rejected() {
        let mut changed: ChangedFieldSet = ["a"].into_iter().collect();
        assert!(matches!(
            changed.claim("r", &BTreeSet::new()),
            Err(ChangeFinderError::EmptyClaim { .. })
        ));
    }

    #[test]
    fn test_subset_and_intersection() {
        let changed: ChangedFieldSet = ["fate", "peanutAllergy"].into_iter().collect();
        assert!(changed.is_subset_of(["fate", "peanutAllergy", "tragicness"]));
        assert!(!changed.is_subset_of(["fate"]));
        assert_eq!(changed.intersection(["fate", "blood"]), set(&["fate"]));
        assert!(changed.contains_all(["fate"]));
    }

    #[test]
    fn test_take_remaining_empties() {
        let mut changed: ChangedFieldSet = ["a", "b"].into_iter().collect();
        let rest = changed.take_remaining();
        assert_eq!(rest, set(&["a", "b"]));
        assert!(changed.is_empty());
    }
}
