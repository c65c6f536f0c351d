//! Sorting areas: accept or reject released entities
//!
//! An area tracks the dragging entity hovering over it. When that entity is
//! released the area decides:
//! - matching kind: the entity is placed and joins the occupants
//! - anything else: every occupant plus the dropped entity is destroyed in
//!   one batch, and the occupant list is cleared
//!
//! The area only moves entity state. Registry and score bookkeeping for the
//! returned `PlacementOutcome` belong to the level coordinator.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityId, EntityKind, EntityState, find_entity, find_entity_mut};
use super::movement::{AreaWanderer, Rect};
use crate::tuning::Tuning;

/// Result of resolving a release over an area
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    Accepted {
        area: usize,
        entity: EntityId,
        kind: EntityKind,
    },
    Rejected {
        area: usize,
        /// Kind the area accepts
        area_kind: EntityKind,
        dropped: EntityId,
        /// Previously placed occupants destroyed by the cascade
        evicted: Vec<EntityId>,
        destroyed_count: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortingArea {
    pub accepted: EntityKind,
    pub region: Rect,
    occupants: Vec<EntityId>,
    hovered: Option<EntityId>,
}

impl SortingArea {
    pub fn new(accepted: EntityKind, region: Rect) -> Self {
        Self {
            accepted,
            region,
            occupants: Vec::new(),
            hovered: None,
        }
    }

    pub fn overlaps(&self, pos: Vec2) -> bool {
        self.region.contains(pos)
    }

    pub fn occupants(&self) -> &[EntityId] {
        &self.occupants
    }

    pub fn hovered(&self) -> Option<EntityId> {
        self.hovered
    }

    /// Whether releasing the hovered entity here would be accepted (for highlight)
    pub fn hover_is_correct(&self, entities: &[Entity]) -> Option<bool> {
        let id = self.hovered?;
        find_entity(entities, id).map(|e| e.kind == self.accepted)
    }

    /// A dragging entity entered the region. The latest entrant wins.
    pub fn hover_enter(&mut self, entity: &Entity) {
        if entity.state() == EntityState::Dragging {
            self.hovered = Some(entity.id);
        }
    }

    pub fn hover_exit(&mut self, id: EntityId) {
        if self.hovered == Some(id) {
            self.hovered = None;
        }
    }

    /// Drop every reference to an entity that vanished through another path
    pub fn forget(&mut self, id: EntityId) {
        self.hover_exit(id);
        self.occupants.retain(|&o| o != id);
    }

    /// Resolve the release of `id`. Returns None when this area was not
    /// hovered by it or the reference turned out to be stale.
    pub fn resolve_release<R: Rng>(
        &mut self,
        area_index: usize,
        id: EntityId,
        entities: &mut [Entity],
        tuning: &Tuning,
        rng: &mut R,
    ) -> Option<PlacementOutcome> {
        if self.hovered != Some(id) {
            return None;
        }
        // Cleared whatever the outcome
        self.hovered = None;

        let Some(entity) = find_entity_mut(entities, id) else {
            log::warn!("Area {area_index}: hovered entity {id} no longer exists");
            return None;
        };
        if entity.state() != EntityState::Dragging {
            log::warn!("Area {area_index}: entity {id} released in state {:?}", entity.state());
            return None;
        }

        if entity.kind == self.accepted {
            let (fx, fy) = tuning.placed_wander_inset;
            let wander = AreaWanderer::new(
                self.region.inset_fraction(fx, fy),
                entity.pos,
                tuning.placed_wander_speed,
                tuning.placed_wander_pause,
                rng,
            );
            entity.place(area_index, wander);
            self.occupants.push(id);
            return Some(PlacementOutcome::Accepted {
                area: area_index,
                entity: id,
                kind: entity.kind,
            });
        }

        entity.destroy();
        let evicted: Vec<EntityId> = self
            .occupants
            .drain(..)
            .filter(|&o| o != id && find_entity(entities, o).is_some())
            .collect();
        let destroyed_count = evicted.len() as u32 + 1;

        Some(PlacementOutcome::Rejected {
            area: area_index,
            area_kind: self.accepted,
            dropped: id,
            evicted,
            destroyed_count,
        })
    }
}
