// Owned identifier -> state table injected into the reconciler.

use super::state::EntityState;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: HashMap<String, EntityState>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identifier: &str) -> Option<&EntityState> {
        self.entities.get(identifier)
    }

    pub fn get_mut(&mut self, identifier: &str) -> Option<&mut EntityState> {
        self.entities.get_mut(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entities.contains_key(identifier)
    }

    /// Inserts or overwrites the record keyed by its own identifier.
    pub fn upsert(&mut self, state: EntityState) {
        self.entities.insert(state.identifier.clone(), state);
    }

    pub fn remove(&mut self, identifier: &str) -> Option<EntityState> {
        self.entities.remove(identifier)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EntityState> {
        self.entities.values_mut()
    }

    /// Cloned records ordered by identifier so readers see a stable view.
    pub fn snapshot(&self) -> Vec<EntityState> {
        let mut out: Vec<EntityState> = self.entities.values().cloned().collect();
        out.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        out
    }
}
