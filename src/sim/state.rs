//! Game state and outward events
//!
//! `GameState` is the composition root: it builds the areas, spawners,
//! registry and coordinator from a `Layout` and a `Tuning`, and owns the
//! seeded RNG so a run is reproducible from its seed and inputs.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::area::SortingArea;
use super::clock::Clock;
use super::coordinator::LevelCoordinator;
use super::entity::{Entity, EntityId, EntityKind, EntityState, IdAllocator, find_entity};
use super::movement::Rect;
use super::spawner::{SpawnerConfig, SpawnerId};
use super::tick::PointerId;
use crate::consts::*;
use crate::persistence::{MemoryStore, ProgressStore};
use crate::tuning::Tuning;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    /// Level cleared, waiting out the real-time grace period
    LevelTransition,
    /// Run ended
    GameOver,
}

/// Everything the outside world hears about, in the order it happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Spawned {
        id: EntityId,
        kind: EntityKind,
        spawner: SpawnerId,
    },
    SpawnerFinished {
        spawner: SpawnerId,
    },
    CorrectPlacement {
        id: EntityId,
        kind: EntityKind,
        area: usize,
        points: u64,
    },
    IncorrectPlacement {
        area: usize,
        /// Kind the rejecting area accepts
        area_kind: EntityKind,
        /// The released entity that triggered the rejection
        dropped: EntityId,
        /// Previously placed occupants wiped with it
        evicted: Vec<EntityId>,
        destroyed_count: u32,
        /// Points actually deducted (floored at zero total)
        penalty: u64,
    },
    Flicked {
        id: EntityId,
        kind: EntityKind,
        points: u64,
    },
    Expired {
        id: EntityId,
        kind: EntityKind,
    },
    /// Completion barrier passed; the grace period starts
    LevelCleared {
        level: u32,
        score: u64,
    },
    /// Next level started
    LevelComplete {
        new_level: u32,
    },
    GameOver {
        final_score: u64,
        high_score: u64,
        level_reached: u32,
    },
    SlowMotionStarted,
}

/// One sorting area in a layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaSpec {
    pub accepts: EntityKind,
    pub region: Rect,
}

/// Static arrangement of the playfield
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub bounds: Rect,
    pub areas: Vec<AreaSpec>,
    pub spawners: Vec<Vec2>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            bounds: Rect::from_center(Vec2::ZERO, Vec2::new(WORLD_HALF_WIDTH, WORLD_HALF_HEIGHT)),
            areas: vec![
                AreaSpec {
                    accepts: EntityKind::TypeA,
                    region: Rect::new(Vec2::new(-7.5, -2.0), Vec2::new(-4.5, 2.0)),
                },
                AreaSpec {
                    accepts: EntityKind::TypeB,
                    region: Rect::new(Vec2::new(4.5, -2.0), Vec2::new(7.5, 2.0)),
                },
            ],
            spawners: vec![Vec2::new(0.0, 2.5), Vec2::new(0.0, -2.5)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("playfield bounds are empty")]
    EmptyBounds,

    #[error("sorting areas {0} and {1} overlap")]
    OverlappingAreas(usize, usize),

    #[error("sorting area {0} lies outside the playfield")]
    AreaOutOfBounds(usize),

    #[error("{0} sorting areas accept Evil, which is never sortable")]
    EvilArea(usize),
}

impl Layout {
    /// At most one area may claim any release, so areas must not overlap
    pub fn validate(&self) -> Result<(), LayoutError> {
        let size = self.bounds.size();
        if size.x <= 0.0 || size.y <= 0.0 {
            return Err(LayoutError::EmptyBounds);
        }

        let evil = self.areas.iter().filter(|a| a.accepts == EntityKind::Evil).count();
        if evil > 0 {
            return Err(LayoutError::EvilArea(evil));
        }

        for (i, a) in self.areas.iter().enumerate() {
            if !self.bounds.contains(a.region.min) || !self.bounds.contains(a.region.max) {
                return Err(LayoutError::AreaOutOfBounds(i));
            }
            for (j, b) in self.areas.iter().enumerate().skip(i + 1) {
                let r1 = &a.region;
                let r2 = &b.region;
                let overlap_x = r1.min.x < r2.max.x && r2.min.x < r1.max.x;
                let overlap_y = r1.min.y < r2.max.y && r2.min.y < r1.max.y;
                if overlap_x && overlap_y {
                    return Err(LayoutError::OverlappingAreas(i, j));
                }
            }
        }
        Ok(())
    }
}

/// Complete game state (deterministic given seed and inputs)
#[derive(Debug)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub tuning: Tuning,
    pub clock: Clock,
    pub phase: GamePhase,
    /// Playfield
    pub bounds: Rect,
    /// Live entities (sorted by id for determinism)
    pub entities: Vec<Entity>,
    pub areas: Vec<SortingArea>,
    pub coordinator: LevelCoordinator,
    /// Events since the last `drain_events`
    pub events: Vec<GameEvent>,
    pub(crate) ids: IdAllocator,
    /// Which entity each pointer holds
    pub(crate) grabs: BTreeMap<PointerId, EntityId>,
    /// Which area each dragged entity currently overlaps
    pub(crate) overlaps: BTreeMap<EntityId, usize>,
    /// Released this tick, awaiting resolution (entity, release velocity)
    pub(crate) releases: Vec<(EntityId, Vec2)>,
}

impl GameState {
    /// Default layout and tuning, progress kept in memory
    pub fn new(seed: u64) -> Self {
        Self::build(seed, Tuning::default(), Layout::default(), Box::new(MemoryStore::new()))
    }

    pub fn with_layout(
        seed: u64,
        tuning: Tuning,
        layout: Layout,
        store: Box<dyn ProgressStore>,
    ) -> Result<Self, LayoutError> {
        layout.validate()?;
        Ok(Self::build(seed, tuning.sanitized(), layout, store))
    }

    fn build(seed: u64, tuning: Tuning, layout: Layout, store: Box<dyn ProgressStore>) -> Self {
        let configs: Vec<SpawnerConfig> = layout
            .spawners
            .iter()
            .map(|&p| SpawnerConfig::at(p, &tuning))
            .collect();
        let coordinator = LevelCoordinator::new(&configs, &tuning, store);
        let areas = layout
            .areas
            .iter()
            .map(|a| SortingArea::new(a.accepts, a.region))
            .collect();

        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            tuning,
            clock: Clock::new(),
            phase: GamePhase::Playing,
            bounds: layout.bounds,
            entities: Vec::new(),
            areas,
            coordinator,
            events: Vec::new(),
            ids: IdAllocator::default(),
            grabs: BTreeMap::new(),
            overlaps: BTreeMap::new(),
            releases: Vec::new(),
        };

        state.coordinator.begin(
            &mut state.entities,
            &state.tuning,
            &mut state.rng,
            &mut state.events,
        );
        state.update_phase();
        state
    }

    pub fn level(&self) -> u32 {
        self.coordinator.level()
    }

    pub fn score(&self) -> u64 {
        self.coordinator.score().total()
    }

    pub fn is_game_over(&self) -> bool {
        self.coordinator.is_game_over()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        find_entity(&self.entities, id)
    }

    /// Entities still counted against level completion
    pub fn unresolved_count(&self) -> usize {
        self.coordinator.registry().len()
    }

    /// Region wandering entities are kept inside
    pub fn wander_bounds(&self) -> Rect {
        self.bounds.shrink(self.tuning.bounds_padding)
    }

    /// Flicked entities are dropped once they leave this
    pub fn cull_bounds(&self) -> Rect {
        self.bounds.shrink(-self.tuning.bounds_padding)
    }

    /// Nearest grabbable entity within the hit radius of `pos`.
    /// Ties go to the newest entity (drawn on top).
    pub fn entity_at(&self, pos: Vec2) -> Option<EntityId> {
        let r2 = ENTITY_HIT_RADIUS * ENTITY_HIT_RADIUS;
        self.entities
            .iter()
            .filter(|e| e.state() == EntityState::Wandering)
            .map(|e| (e.pos.distance_squared(pos), e.id))
            .filter(|&(d2, _)| d2 <= r2)
            .min_by(|a, b| a.0.total_cmp(&b.0).then(b.1.cmp(&a.1)))
            .map(|(_, id)| id)
    }

    /// Take all events accumulated so far
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn update_phase(&mut self) {
        let phase = if self.coordinator.is_game_over() {
            GamePhase::GameOver
        } else if self.coordinator.is_transitioning() {
            GamePhase::LevelTransition
        } else {
            GamePhase::Playing
        };
        if phase != self.phase {
            log::info!("Phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }
}
