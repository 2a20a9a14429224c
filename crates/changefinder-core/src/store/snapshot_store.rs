use std::collections::HashMap;

use crate::model::Snapshot;

/// Holds the most recently processed snapshot per entity id
///
/// At most one predecessor per id; `set` replaces it unconditionally.
pub trait SnapshotStore {
    /// Predecessor for `entity_id`, if any snapshot was processed for it
    fn get(&self, entity_id: &str) -> Option<&Snapshot>;

    /// Record `snapshot` as the latest observed state for `entity_id`
    fn set(&mut self, entity_id: &str, snapshot: Snapshot);

    /// Number of entities with a stored predecessor
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory snapshot store
///
/// A plain HashMap with no eviction; lives as long as the pipeline.
/// Not thread-safe by itself: shard pipelines by entity id instead.
#[derive(Debug, Clone, Default)]
pub struct InMemorySnapshotStore {
    latest: HashMap<String, Snapshot>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn get(&self, entity_id: &str) -> Option<&Snapshot> {
        self.latest.get(entity_id)
    }

    fn set(&mut self, entity_id: &str, snapshot: Snapshot) {
        self.latest.insert(entity_id.to_string(), snapshot);
    }

    fn len(&self) -> usize {
        self.latest.len()
    }
}
