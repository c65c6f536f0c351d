//! Level progression
//!
//! Owns the spawners, the lifecycle registry and the score. Decides when a
//! level is complete (every spawner finished and nothing left unresolved),
//! paces the transition to the next level on real time, and runs the
//! game-over sequence when an entity expires.
//!
//! The completion check runs after every spawner `Finished` and after every
//! unregister that actually removed something. `transition` being set is
//! what keeps it from firing twice for one level.

use std::collections::BTreeSet;

use rand::Rng;

use super::area::PlacementOutcome;
use super::clock::Clock;
use super::entity::{Entity, EntityId, IdAllocator, KindTraits};
use super::movement::Zigzag;
use super::registry::LifecycleRegistry;
use super::score::ScoreKeeper;
use super::spawner::{SpawnScheduler, SpawnerConfig, SpawnerEvent, SpawnerId};
use super::state::GameEvent;
use crate::highscores::HighScores;
use crate::persistence::{ProgressStore, now_millis};
use crate::tuning::Tuning;

/// Real-time grace period between completion and the next level
#[derive(Debug, Clone, Copy, PartialEq)]
struct Transition {
    remaining_real: f32,
}

#[derive(Debug)]
pub struct LevelCoordinator {
    level: u32,
    spawners: Vec<SpawnScheduler>,
    registry: LifecycleRegistry,
    finished: BTreeSet<SpawnerId>,
    score: ScoreKeeper,
    game_over: bool,
    transition: Option<Transition>,
    transition_delay: f32,
    records: HighScores,
    store: Box<dyn ProgressStore>,
}

impl LevelCoordinator {
    /// One scheduler per config, ids assigned in order. Progress records are
    /// loaded from `store`; a failed load starts from empty records.
    pub fn new(configs: &[SpawnerConfig], tuning: &Tuning, store: Box<dyn ProgressStore>) -> Self {
        let spawners = configs
            .iter()
            .enumerate()
            .map(|(i, c)| SpawnScheduler::new(i as SpawnerId, c))
            .collect();
        let records = store.load().unwrap_or_else(|e| {
            log::warn!("Could not load progress, starting fresh: {e}");
            HighScores::new()
        });

        Self {
            level: 1,
            spawners,
            registry: LifecycleRegistry::new(),
            finished: BTreeSet::new(),
            score: ScoreKeeper::new(),
            game_over: false,
            transition: None,
            transition_delay: tuning.level_transition_delay.max(0.0),
            records,
            store,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn score(&self) -> &ScoreKeeper {
        &self.score
    }

    pub fn registry(&self) -> &LifecycleRegistry {
        &self.registry
    }

    pub fn spawners(&self) -> &[SpawnScheduler] {
        &self.spawners
    }

    pub fn finished_spawner_count(&self) -> usize {
        self.finished.len()
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Real seconds until the next level starts, while transitioning
    pub fn transition_remaining(&self) -> Option<f32> {
        self.transition.map(|t| t.remaining_real)
    }

    pub fn records(&self) -> &HighScores {
        &self.records
    }

    /// Start the first level
    pub fn begin<R: Rng>(
        &mut self,
        entities: &mut Vec<Entity>,
        tuning: &Tuning,
        rng: &mut R,
        out: &mut Vec<GameEvent>,
    ) {
        log::info!("Level {} started with {} spawners", self.level, self.spawners.len());
        let mut produced = Vec::new();
        for s in &mut self.spawners {
            s.start(&mut produced);
        }
        self.handle_spawner_events(produced, entities, tuning, rng, out);
    }

    /// Advance every spawner by `dt` of scaled time
    pub fn tick_spawners<R: Rng>(
        &mut self,
        dt: f32,
        ids: &mut IdAllocator,
        entities: &mut Vec<Entity>,
        tuning: &Tuning,
        rng: &mut R,
        out: &mut Vec<GameEvent>,
    ) {
        if self.game_over || self.transition.is_some() {
            return;
        }
        let mut produced = Vec::new();
        for s in &mut self.spawners {
            s.tick(dt, ids, tuning, rng, &mut produced);
        }
        self.handle_spawner_events(produced, entities, tuning, rng, out);
    }

    fn handle_spawner_events<R: Rng>(
        &mut self,
        produced: Vec<SpawnerEvent>,
        entities: &mut Vec<Entity>,
        tuning: &Tuning,
        rng: &mut R,
        out: &mut Vec<GameEvent>,
    ) {
        for event in produced {
            match event {
                SpawnerEvent::Spawned(mut entity) => {
                    if self.on_spawned(&mut entity, tuning, rng) {
                        out.push(GameEvent::Spawned {
                            id: entity.id,
                            kind: entity.kind,
                            spawner: entity.origin_spawner,
                        });
                        // Ids are monotonic, so pushing keeps the list sorted
                        entities.push(entity);
                    }
                }
                SpawnerEvent::Finished(id) => {
                    out.push(GameEvent::SpawnerFinished { spawner: id });
                    self.on_spawner_finished(id, out);
                }
            }
        }
    }

    /// Register a freshly spawned entity and apply this level's difficulty.
    /// Refused once the game is over.
    pub fn on_spawned<R: Rng>(
        &mut self,
        entity: &mut Entity,
        tuning: &Tuning,
        rng: &mut R,
    ) -> bool {
        if self.game_over {
            log::debug!("Spawn of entity {} refused after game over", entity.id);
            return false;
        }

        let bonus = self.level as f32 * tuning.level_move_bonus;
        let zigzag = if rng.random::<f32>() < tuning.erratic_chance(self.level) {
            let (f_lo, f_hi) = tuning.zigzag_frequency;
            let (a_lo, a_hi) = tuning.zigzag_amplitude;
            Some(Zigzag {
                speed_multiplier: tuning.erratic_speed_multiplier,
                frequency: rng.random_range(f_lo..=f_hi),
                amplitude: rng.random_range(a_lo..=a_hi),
            })
        } else {
            None
        };
        entity.apply_difficulty(bonus, bonus, zigzag);
        self.registry.register(entity.id)
    }

    pub fn on_spawner_finished(&mut self, id: SpawnerId, out: &mut Vec<GameEvent>) {
        if self.finished.insert(id) {
            log::debug!(
                "Spawner finished. Total finished: {}/{}",
                self.finished.len(),
                self.spawners.len()
            );
        }
        self.check_level_complete(out);
    }

    /// Idempotent. Only an actual removal triggers the completion check.
    pub fn unregister(&mut self, id: EntityId, out: &mut Vec<GameEvent>) -> bool {
        let removed = self.registry.unregister(id);
        if removed {
            self.check_level_complete(out);
        }
        removed
    }

    /// Fires at most once per level. Returns true when it fired.
    pub fn check_level_complete(&mut self, out: &mut Vec<GameEvent>) -> bool {
        if self.game_over || self.transition.is_some() {
            return false;
        }
        if self.finished.len() < self.spawners.len() || !self.registry.is_empty() {
            return false;
        }

        log::info!("Level {} completed with score {}", self.level, self.score.total());
        for s in &mut self.spawners {
            s.stop();
        }
        self.transition = Some(Transition {
            remaining_real: self.transition_delay,
        });

        if self.records.submit_level_score(self.level, self.score.total()) {
            log::info!("New best for level {}: {}", self.level, self.score.total());
            self.persist();
        }
        out.push(GameEvent::LevelCleared {
            level: self.level,
            score: self.score.total(),
        });
        true
    }

    /// Count down the grace period on real time; when it runs out, start
    /// the next level. Returns true on the tick the new level begins.
    pub fn tick_transition<R: Rng>(
        &mut self,
        real_dt: f32,
        entities: &mut Vec<Entity>,
        tuning: &Tuning,
        rng: &mut R,
        out: &mut Vec<GameEvent>,
    ) -> bool {
        if self.game_over {
            return false;
        }
        let Some(transition) = &mut self.transition else {
            return false;
        };
        transition.remaining_real -= real_dt;
        if transition.remaining_real > 0.0 {
            return false;
        }

        self.level += 1;
        for s in &mut self.spawners {
            s.apply_level_delta(tuning.interval_scale_per_level, tuning.budget_growth_per_level);
        }
        self.registry.reinitialize();
        self.finished.clear();

        let mut produced = Vec::new();
        for s in &mut self.spawners {
            s.start(&mut produced);
        }
        self.transition = None;
        log::info!("Level {} started", self.level);
        out.push(GameEvent::LevelComplete { new_level: self.level });

        // Processed after the transition flag is cleared so zero-budget
        // spawners can still complete the new level
        self.handle_spawner_events(produced, entities, tuning, rng, out);
        true
    }

    /// Score and unregister the result of a release over an area
    pub fn apply_placement(
        &mut self,
        outcome: &PlacementOutcome,
        tuning: &Tuning,
        out: &mut Vec<GameEvent>,
    ) {
        if self.game_over {
            return;
        }
        match outcome {
            PlacementOutcome::Accepted { area, entity, kind } => {
                let points = KindTraits::lookup(*kind, tuning).place_points;
                self.score.award_correct(*kind, points);
                out.push(GameEvent::CorrectPlacement {
                    id: *entity,
                    kind: *kind,
                    area: *area,
                    points,
                });
                self.unregister(*entity, out);
            }
            PlacementOutcome::Rejected {
                area,
                area_kind,
                dropped,
                evicted,
                destroyed_count,
            } => {
                let penalty = self.score.penalize(*destroyed_count, tuning.points_per_correct);
                log::debug!(
                    "Area {area} rejected entity {dropped}: {destroyed_count} destroyed, -{penalty}"
                );
                out.push(GameEvent::IncorrectPlacement {
                    area: *area,
                    area_kind: *area_kind,
                    dropped: *dropped,
                    evicted: evicted.clone(),
                    destroyed_count: *destroyed_count,
                    penalty,
                });
                // Evicted occupants were unregistered when placed; these are no-ops
                self.unregister(*dropped, out);
                for &id in evicted {
                    self.unregister(id, out);
                }
            }
        }
    }

    /// An entity was flicked out of play
    pub fn apply_flick(&mut self, entity: &Entity, tuning: &Tuning, out: &mut Vec<GameEvent>) {
        if self.game_over {
            return;
        }
        let points = KindTraits::lookup(entity.kind, tuning).flick_points;
        self.score.award_flick(entity.kind, points);
        out.push(GameEvent::Flicked {
            id: entity.id,
            kind: entity.kind,
            points,
        });
        self.unregister(entity.id, out);
    }

    /// Game-over sequence. Only the first expiry of a run triggers it.
    pub fn on_expired(
        &mut self,
        entity: &Entity,
        clock: &mut Clock,
        out: &mut Vec<GameEvent>,
    ) -> bool {
        if self.game_over {
            self.registry.unregister(entity.id);
            return false;
        }
        // Set before unregistering so the removal cannot complete the level
        self.game_over = true;
        self.registry.unregister(entity.id);
        out.push(GameEvent::Expired {
            id: entity.id,
            kind: entity.kind,
        });

        for s in &mut self.spawners {
            s.stop();
        }
        self.transition = None;
        clock.freeze();

        let final_score = self.score.total();
        self.records.submit_high_score(final_score);
        self.records.submit_highest_level(self.level);
        if let Some(rank) = self.records.add_score(final_score, self.level, now_millis()) {
            log::info!("Run placed #{rank} on the leaderboard");
        }
        self.persist();

        log::info!(
            "Game over on level {}: entity {} ({}) expired, final score {}",
            self.level,
            entity.id,
            entity.kind.as_str(),
            final_score
        );
        out.push(GameEvent::GameOver {
            final_score,
            high_score: self.records.high_score(),
            level_reached: self.level,
        });
        true
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.records) {
            log::warn!("Failed to save progress: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryStore, PersistenceError};
    use crate::sim::entity::EntityKind;
    use glam::Vec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[derive(Debug)]
    struct BrokenStore;

    impl ProgressStore for BrokenStore {
        fn load(&self) -> Result<HighScores, PersistenceError> {
            Err(PersistenceError::Unavailable("disk gone".into()))
        }

        fn save(&mut self, _records: &HighScores) -> Result<(), PersistenceError> {
            Err(PersistenceError::Unavailable("disk gone".into()))
        }
    }

    fn configs(budgets: &[u32]) -> Vec<SpawnerConfig> {
        budgets
            .iter()
            .map(|&budget| SpawnerConfig {
                position: Vec2::ZERO,
                interval: 0.5,
                jitter: 0.0,
                budget,
            })
            .collect()
    }

    fn coordinator(budgets: &[u32]) -> LevelCoordinator {
        LevelCoordinator::new(&configs(budgets), &Tuning::default(), Box::new(MemoryStore::new()))
    }

    fn cleared_count(events: &[GameEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, GameEvent::LevelCleared { .. }))
            .count()
    }

    #[test]
    fn test_completion_needs_both_conditions() {
        let mut c = coordinator(&[1, 1]);
        let mut out = Vec::new();
        c.registry.register(1);
        c.on_spawner_finished(0, &mut out);
        c.on_spawner_finished(1, &mut out);
        assert!(!c.is_transitioning());
        assert!(c.unregister(1, &mut out));
        assert!(c.is_transitioning());
        assert_eq!(cleared_count(&out), 1);
    }

    #[test]
    fn test_completion_fires_once() {
        let mut c = coordinator(&[3, 2]);
        let mut out = Vec::new();
        for id in 1..=5 {
            c.registry.register(id);
        }
        c.on_spawner_finished(0, &mut out);
        for id in 1..=5 {
            c.unregister(id, &mut out);
        }
        c.on_spawner_finished(1, &mut out);
        // Late duplicate events
        assert!(!c.unregister(3, &mut out));
        c.on_spawner_finished(1, &mut out);
        assert!(!c.check_level_complete(&mut out));
        assert_eq!(cleared_count(&out), 1);
    }

    #[test]
    fn test_transition_waits_on_real_time() {
        let mut rng = Pcg32::seed_from_u64(1);
        let tuning = Tuning::default();
        let mut c = coordinator(&[0]);
        let mut entities = Vec::new();
        let mut out = Vec::new();
        c.begin(&mut entities, &tuning, &mut rng, &mut out);
        assert!(c.is_transitioning());

        assert!(!c.tick_transition(0.5, &mut entities, &tuning, &mut rng, &mut out));
        assert_eq!(c.level(), 1);
        assert!(c.tick_transition(0.5, &mut entities, &tuning, &mut rng, &mut out));
        assert_eq!(c.level(), 2);
        assert!(out.contains(&GameEvent::LevelComplete { new_level: 2 }));
        // Difficulty delta applied
        assert_eq!(c.spawners()[0].budget(), 5);
        assert!((c.spawners()[0].interval() - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_game_over_blocks_completion_and_score() {
        let tuning = Tuning::default();
        let mut c = coordinator(&[1]);
        let mut clock = Clock::new();
        let mut out = Vec::new();
        let e = Entity::new(
            1,
            EntityKind::TypeA,
            Vec2::ZERO,
            0,
            &KindTraits::lookup(EntityKind::TypeA, &tuning),
            &tuning,
        );
        c.registry.register(1);
        c.on_spawner_finished(0, &mut out);

        assert!(c.on_expired(&e, &mut clock, &mut out));
        assert!(!c.on_expired(&e, &mut clock, &mut out));
        assert!(c.is_game_over());
        assert!(clock.is_frozen());
        assert!(c.registry().is_empty());
        assert_eq!(cleared_count(&out), 0);

        c.apply_placement(
            &PlacementOutcome::Accepted {
                area: 0,
                entity: 2,
                kind: EntityKind::TypeA,
            },
            &tuning,
            &mut out,
        );
        assert_eq!(c.score().total(), 0);
        let overs: Vec<_> = out
            .iter()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .collect();
        assert_eq!(overs.len(), 1);
    }

    #[test]
    fn test_rejection_penalty_and_unregister() {
        let tuning = Tuning::default();
        let mut c = coordinator(&[5]);
        let mut out = Vec::new();
        for id in 1..=4 {
            c.registry.register(id);
        }
        for id in 1..=3 {
            c.apply_placement(
                &PlacementOutcome::Accepted {
                    area: 0,
                    entity: id,
                    kind: EntityKind::TypeA,
                },
                &tuning,
                &mut out,
            );
        }
        assert_eq!(c.score().total(), 30);
        c.apply_placement(
            &PlacementOutcome::Rejected {
                area: 0,
                area_kind: EntityKind::TypeA,
                dropped: 4,
                evicted: vec![1, 2, 3],
                destroyed_count: 4,
            },
            &tuning,
            &mut out,
        );
        assert_eq!(c.score().total(), 0);
        assert!(c.registry().is_empty());
        assert!(out.contains(&GameEvent::IncorrectPlacement {
            area: 0,
            area_kind: EntityKind::TypeA,
            dropped: 4,
            evicted: vec![1, 2, 3],
            destroyed_count: 4,
            penalty: 30,
        }));
    }

    #[test]
    fn test_broken_store_does_not_block_play() {
        let tuning = Tuning::default();
        let mut c = LevelCoordinator::new(&configs(&[1]), &tuning, Box::new(BrokenStore));
        let mut clock = Clock::new();
        let mut out = Vec::new();
        c.registry.register(1);
        c.apply_placement(
            &PlacementOutcome::Accepted {
                area: 0,
                entity: 1,
                kind: EntityKind::TypeB,
            },
            &tuning,
            &mut out,
        );
        c.on_spawner_finished(0, &mut out);
        assert!(c.is_transitioning());
        assert_eq!(c.records().level_score(1), 10);

        let e = Entity::new(
            9,
            EntityKind::Evil,
            Vec2::ZERO,
            0,
            &KindTraits::lookup(EntityKind::Evil, &tuning),
            &tuning,
        );
        assert!(c.on_expired(&e, &mut clock, &mut out));
        assert!(matches!(
            out.last(),
            Some(GameEvent::GameOver {
                final_score: 10,
                high_score: 10,
                level_reached: 1
            })
        ));
    }

    #[test]
    fn test_difficulty_applied_on_spawn() {
        let mut rng = Pcg32::seed_from_u64(4);
        let tuning = Tuning::default();
        let mut c = coordinator(&[1]);
        c.level = 3;
        let mut e = Entity::new(
            1,
            EntityKind::TypeA,
            Vec2::ZERO,
            0,
            &KindTraits::lookup(EntityKind::TypeA, &tuning),
            &tuning,
        );
        assert!(c.on_spawned(&mut e, &tuning, &mut rng));
        assert!((e.speed() - 1.6).abs() < 1e-5);
        assert!((e.move_duration() - 2.6).abs() < 1e-5);
        assert!(c.registry().contains(1));
        assert!(!c.on_spawned(&mut e, &tuning, &mut rng));
    }
}
