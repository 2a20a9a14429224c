use std::collections::HashMap;

use serde_json::Value;

/// Small per-entity facts that rules remember across snapshots
///
/// Values are addressed by `(entity_id, slot)`. Each rule uses its own
/// slot names, so rules never read or clobber each other's facts.
/// Missing entries read as `None`.
pub trait AuxStateStore {
    fn get(&self, entity_id: &str, slot: &str) -> Option<&Value>;

    fn set(&mut self, entity_id: &str, slot: &str, value: Value);
}

/// In-memory auxiliary state
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuxState {
    slots: HashMap<String, HashMap<String, Value>>,
}

impl InMemoryAuxState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities with at least one stored fact
    pub fn entity_count(&self) -> usize {
        self.slots.len()
    }
}

impl AuxStateStore for InMemoryAuxState {
    fn get(&self, entity_id: &str, slot: &str) -> Option<&Value> {
        self.slots.get(entity_id).and_then(|s| s.get(slot))
    }

    fn set(&mut self, entity_id: &str, slot: &str, value: Value) {
        self.slots
            .entry(entity_id.to_string())
            .or_default()
            .insert(slot.to_string(), value);
    }
}
