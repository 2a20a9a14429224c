use std::collections::HashMap;

use super::{ReferenceData, ReferenceRecord, TimeWindow};

/// Reference tables held in memory, each sorted by observation time
#[derive(Debug, Clone, Default)]
pub struct InMemoryReferenceData {
    tables: HashMap<String, Vec<ReferenceRecord>>,
}

impl InMemoryReferenceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `table` with `records`
    pub fn insert_table(&mut self, table: impl Into<String>, mut records: Vec<ReferenceRecord>) {
        records.sort_by_key(|r| r.observed_at);
        self.tables.insert(table.into(), records);
    }

    /// Builder-style variant of [`insert_table`](Self::insert_table)
    pub fn with_table(mut self, table: impl Into<String>, records: Vec<ReferenceRecord>) -> Self {
        self.insert_table(table, records);
        self
    }

    /// Number of records in `table` (zero if absent)
    pub fn table_len(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, Vec::len)
    }
}

impl ReferenceData for InMemoryReferenceData {
    fn lookup<'a>(
        &'a self,
        table: &str,
        entity_id: &str,
        window: &TimeWindow,
    ) -> Vec<&'a ReferenceRecord> {
        self.tables
            .get(table)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| window.contains(r.observed_at) && r.involves(entity_id))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Reference data with no tables at all
///
/// For pipelines whose rules never consult reference data, and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReferenceData;

impl ReferenceData for NoReferenceData {
    fn lookup<'a>(
        &'a self,
        _table: &str,
        _entity_id: &str,
        _window: &TimeWindow,
    ) -> Vec<&'a ReferenceRecord> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::expect_at_most_one;
    use crate::ChangeFinderError;
    use chrono::{DateTime, Utc};

    fn t(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn record(ids: &[&str], at: &str) -> ReferenceRecord {
        ReferenceRecord {
            entity_ids: ids.iter().map(|s| s.to_string()).collect(),
            season: 2,
            day: 10,
            game_id: "g".to_string(),
            observed_at: t(at),
            attributes: Default::default(),
        }
    }

    fn data() -> InMemoryReferenceData {
        InMemoryReferenceData::new().with_table(
            "feedbacks",
            vec![
                record(&["p2", "p1"], "2020-08-02T12:00:00Z"),
                record(&["p1", "p3"], "2020-08-01T12:00:00Z"),
                record(&["p4", "p5"], "2020-08-01T13:00:00Z"),
            ],
        )
    }

    #[test]
    fn test_lookup_filters_entity_and_window_in_time_order() {
        let data = data();
        let window = TimeWindow::new(t("2020-08-01T00:00:00Z"), t("2020-08-03T00:00:00Z"));
        let found = data.lookup("feedbacks", "p1", &window);
        assert_eq!(found.len(), 2);
        assert!(found[0].observed_at < found[1].observed_at);

        let narrow = TimeWindow::new(t("2020-08-02T00:00:00Z"), t("2020-08-03T00:00:00Z"));
        assert_eq!(data.lookup("feedbacks", "p1", &narrow).len(), 1);
    }

    #[test]
    fn test_unknown_table_is_empty() {
        let window = TimeWindow::new(t("2020-08-01T00:00:00Z"), t("2020-08-03T00:00:00Z"));
        assert!(data().lookup("nope", "p1", &window).is_empty());
        assert!(NoReferenceData.lookup("feedbacks", "p1", &window).is_empty());
    }

    #[test]
    fn test_expect_at_most_one() {
        let data = data();
        let window = TimeWindow::new(t("2020-08-01T00:00:00Z"), t("2020-08-03T00:00:00Z"));

        let none = expect_at_most_one("r", "feedbacks", "p9", data.lookup("feedbacks", "p9", &window));
        assert_eq!(none.unwrap(), None);

        let one = expect_at_most_one("r", "feedbacks", "p4", data.lookup("feedbacks", "p4", &window));
        assert!(one.unwrap().is_some());

        let many = expect_at_most_one("r", "feedbacks", "p1", data.lookup("feedbacks", "p1", &window));
        assert_eq!(
            many.unwrap_err(),
            ChangeFinderError::AmbiguousReferenceMatch {
                rule: "r".to_string(),
                table: "feedbacks".to_string(),
                entity_id: "p1".to_string(),
                matches: 2,
            }
        );
    }
}
