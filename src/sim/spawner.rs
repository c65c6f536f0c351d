//! Budgeted, rate-limited spawn points
//!
//! A scheduler emits entities every `interval ± jitter` seconds of scaled
//! time until it has created `budget` of them, then reports `Finished`
//! exactly once. Finished only means "no more will be created"; it says
//! nothing about whether earlier entities are still alive.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityKind, IdAllocator, KindTraits};
use crate::tuning::{MIN_SPAWN_INTERVAL, Tuning};

/// Index of a scheduler within its level
pub type SpawnerId = u32;

/// Placement and pacing of one spawn point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnerConfig {
    pub position: Vec2,
    pub interval: f32,
    pub jitter: f32,
    pub budget: u32,
}

impl SpawnerConfig {
    /// Spawn point at `position` using the tuning's pacing
    pub fn at(position: Vec2, tuning: &Tuning) -> Self {
        Self {
            position,
            interval: tuning.spawn_interval,
            jitter: tuning.spawn_jitter,
            budget: tuning.spawn_budget,
        }
    }
}

/// Notifications published by a scheduler
#[derive(Debug, Clone, PartialEq)]
pub enum SpawnerEvent {
    Spawned(Entity),
    Finished(SpawnerId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnScheduler {
    pub id: SpawnerId,
    pub position: Vec2,
    interval: f32,
    jitter: f32,
    budget: u32,
    spawned: u32,
    active: bool,
    finished: bool,
    /// Scaled seconds until the next spawn
    countdown: f32,
}

impl SpawnScheduler {
    pub fn new(id: SpawnerId, config: &SpawnerConfig) -> Self {
        Self {
            id,
            position: config.position,
            interval: config.interval.max(MIN_SPAWN_INTERVAL),
            jitter: config.jitter.abs(),
            budget: config.budget,
            spawned: 0,
            active: false,
            finished: false,
            countdown: 0.0,
        }
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    pub fn jitter(&self) -> f32 {
        self.jitter
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn spawned_count(&self) -> u32 {
        self.spawned
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn has_finished(&self) -> bool {
        self.finished
    }

    /// Begin emitting. A no-op while already active. A zero budget finishes
    /// on the spot without spawning.
    pub fn start(&mut self, out: &mut Vec<SpawnerEvent>) {
        if self.active {
            return;
        }
        self.active = true;
        self.spawned = 0;
        self.finished = false;
        // First entity on the next tick
        self.countdown = 0.0;
        log::debug!(
            "Spawner {} started (budget {}, interval {:.2}s)",
            self.id,
            self.budget,
            self.interval
        );

        if self.budget == 0 {
            self.finish(out);
        }
    }

    /// Halt emission without touching counters. Cancels any pending
    /// countdown, so a stopped scheduler never reports `Finished`.
    pub fn stop(&mut self) {
        if self.active {
            log::debug!("Spawner {} stopped at {}/{}", self.id, self.spawned, self.budget);
        }
        self.active = false;
    }

    /// Level difficulty delta: shorter interval, bigger budget
    pub fn apply_level_delta(&mut self, interval_scale: f32, budget_growth: u32) {
        self.interval = (self.interval * interval_scale).max(MIN_SPAWN_INTERVAL);
        self.budget = self.budget.saturating_add(budget_growth);
    }

    /// Advance by `dt` seconds of scaled time
    pub fn tick<R: Rng>(
        &mut self,
        dt: f32,
        ids: &mut IdAllocator,
        tuning: &Tuning,
        rng: &mut R,
        out: &mut Vec<SpawnerEvent>,
    ) {
        if !self.active {
            return;
        }

        self.countdown -= dt;
        while self.active && self.countdown <= 0.0 {
            self.spawn_one(ids, tuning, rng, out);
            if self.spawned >= self.budget {
                self.finish(out);
                return;
            }
            self.countdown += self.next_delay(rng);
        }
    }

    fn next_delay<R: Rng>(&self, rng: &mut R) -> f32 {
        let jitter = if self.jitter > 0.0 {
            rng.random_range(-self.jitter..=self.jitter)
        } else {
            0.0
        };
        (self.interval + jitter).max(MIN_SPAWN_INTERVAL)
    }

    fn spawn_one<R: Rng>(
        &mut self,
        ids: &mut IdAllocator,
        tuning: &Tuning,
        rng: &mut R,
        out: &mut Vec<SpawnerEvent>,
    ) {
        let kind = if rng.random::<f32>() < tuning.evil_spawn_chance {
            EntityKind::Evil
        } else if rng.random::<bool>() {
            EntityKind::TypeA
        } else {
            EntityKind::TypeB
        };
        let traits = KindTraits::lookup(kind, tuning);
        let entity = Entity::new(ids.next_id(), kind, self.position, self.id, &traits, tuning);
        self.spawned += 1;
        out.push(SpawnerEvent::Spawned(entity));
    }

    fn finish(&mut self, out: &mut Vec<SpawnerEvent>) {
        if self.finished || !self.active {
            return;
        }
        self.finished = true;
        self.active = false;
        log::debug!("Spawner {} finished after {} spawns", self.id, self.spawned);
        out.push(SpawnerEvent::Finished(self.id));
    }
}
