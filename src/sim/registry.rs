//! Authoritative set of unresolved entities
//!
//! An entity is a member from the moment it is spawned until it reaches a
//! terminal state. Both operations are idempotent so redundant paths (a
//! direct placement call and a cascade cleanup on the same id) are harmless.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::entity::EntityId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LifecycleRegistry {
    alive: BTreeSet<EntityId>,
}

impl LifecycleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id`. Returns false (and does nothing) if already present.
    pub fn register(&mut self, id: EntityId) -> bool {
        let added = self.alive.insert(id);
        if added {
            log::debug!("Registered entity {id}; active count {}", self.alive.len());
        }
        added
    }

    /// Remove `id`. Returns true only when a removal actually happened.
    pub fn unregister(&mut self, id: EntityId) -> bool {
        let removed = self.alive.remove(&id);
        if removed {
            log::debug!("Unregistered entity {id}; active count {}", self.alive.len());
        }
        removed
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.alive.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.alive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alive.is_empty()
    }

    /// Members in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive.iter().copied()
    }

    /// Level reset. The registry is expected to be empty already; leftovers
    /// are reported and kept rather than silently dropped.
    pub fn reinitialize(&mut self) -> bool {
        if self.alive.is_empty() {
            return true;
        }
        log::warn!(
            "Registry not empty at level reset: {} entities still unresolved",
            self.alive.len()
        );
        false
    }
}
