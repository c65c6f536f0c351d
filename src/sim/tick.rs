//! Fixed timestep simulation tick
//!
//! One call advances everything in a fixed order:
//! 1. slow-motion request, then the clock (real and scaled deltas)
//! 2. spawners (scaled time)
//! 3. pointer input, then hover refresh
//! 4. entity updates (expiry ends the run)
//! 5. release resolution: area, else flick, else back to wandering
//! 6. despawn of resolved entities
//! 7. level transition pacing (real time)
//!
//! Entities update before releases resolve, and every resolution runs the
//! completion check, so a terminal transition is always seen by the
//! coordinator within the same tick.

use glam::Vec2;

use super::area::PlacementOutcome;
use super::clock::Step;
use super::entity::{EntityId, EntityState, WanderContext, find_entity, find_entity_mut};
use super::movement::{Avoidance, Rect};
use super::state::{GameEvent, GameState};

/// Identifies one finger / mouse button
pub type PointerId = u32;

/// Discrete pointer events, world coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// `hit` is the entity the host's hit test found, if it ran one;
    /// otherwise the nearest entity within the hit radius is used
    Began {
        pointer: PointerId,
        pos: Vec2,
        hit: Option<EntityId>,
    },
    Moved {
        pointer: PointerId,
        pos: Vec2,
    },
    Ended {
        pointer: PointerId,
    },
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Applied in order
    pub pointers: Vec<PointerEvent>,
    /// Start (or restart) the slow-motion window
    pub activate_slow_motion: bool,
}

/// Advance the game state by `real_dt` seconds of wall time
pub fn tick(state: &mut GameState, input: &TickInput, real_dt: f32) {
    if state.coordinator.is_game_over() {
        // Real time keeps running for UI pacing; gameplay is frozen
        state.clock.advance(real_dt);
        return;
    }

    if input.activate_slow_motion {
        let factor = state.tuning.slow_motion_factor;
        let duration = state.tuning.slow_motion_duration;
        if state.clock.start_slow_motion(factor, duration) {
            state.events.push(GameEvent::SlowMotionStarted);
        }
    }
    let step = state.clock.advance(real_dt);

    state.coordinator.tick_spawners(
        step.dt,
        &mut state.ids,
        &mut state.entities,
        &state.tuning,
        &mut state.rng,
        &mut state.events,
    );

    let now = state.clock.real_elapsed();
    for event in &input.pointers {
        handle_pointer(state, event, now);
    }
    refresh_hover(state);

    update_entities(state, &step);
    resolve_releases(state);
    cull(state);

    state.coordinator.tick_transition(
        step.real_dt,
        &mut state.entities,
        &state.tuning,
        &mut state.rng,
        &mut state.events,
    );
    state.update_phase();
}

fn handle_pointer(state: &mut GameState, event: &PointerEvent, now: f64) {
    match *event {
        PointerEvent::Began { pointer, pos, hit } => {
            if state.grabs.contains_key(&pointer) {
                log::debug!("Pointer {pointer} already holds an entity");
                return;
            }
            let Some(id) = hit.or_else(|| state.entity_at(pos)) else {
                return;
            };
            let grabbed = find_entity_mut(&mut state.entities, id)
                .is_some_and(|e| e.begin_drag(pointer, pos, now));
            if grabbed {
                state.grabs.insert(pointer, id);
            }
        }
        PointerEvent::Moved { pointer, pos } => {
            let Some(&id) = state.grabs.get(&pointer) else {
                return;
            };
            if let Some(entity) = find_entity_mut(&mut state.entities, id) {
                entity.drag_to(pos, now);
            }
        }
        PointerEvent::Ended { pointer } => {
            let Some(id) = state.grabs.remove(&pointer) else {
                return;
            };
            let released = find_entity_mut(&mut state.entities, id).and_then(|e| e.end_drag(now));
            if let Some(velocity) = released {
                state.releases.push((id, velocity));
            }
        }
    }
}

/// Track which area each dragged entity overlaps and feed enter/exit to
/// the areas. The first area containing the entity counts. An area whose
/// hover slot was vacated goes back to an entity still inside it.
fn refresh_hover(state: &mut GameState) {
    let GameState {
        entities,
        areas,
        overlaps,
        ..
    } = state;

    for entity in entities.iter().filter(|e| e.state() == EntityState::Dragging) {
        let current = areas.iter().position(|a| a.overlaps(entity.pos));
        let previous = overlaps.get(&entity.id).copied();
        if current == previous {
            continue;
        }
        if let Some(i) = previous {
            areas[i].hover_exit(entity.id);
        }
        match current {
            Some(i) => {
                areas[i].hover_enter(entity);
                overlaps.insert(entity.id, i);
            }
            None => {
                overlaps.remove(&entity.id);
            }
        }
    }

    for (&id, &i) in overlaps.iter() {
        if areas[i].hovered().is_some() {
            continue;
        }
        if let Some(entity) = find_entity(entities, id) {
            areas[i].hover_enter(entity);
        }
    }
}

fn update_entities(state: &mut GameState, step: &Step) {
    let bounds = state.wander_bounds();
    let exclusions: Vec<Rect> = state.areas.iter().map(|a| a.region).collect();
    let ctx = WanderContext {
        bounds: &bounds,
        exclusions: &exclusions,
        avoidance: Avoidance {
            look_ahead: state.tuning.avoidance_look_ahead,
            probe_radius: state.tuning.exclusion_probe_radius,
            max_attempts: state.tuning.safe_direction_attempts,
        },
    };

    let mut expired = Vec::new();
    for entity in &mut state.entities {
        if entity.update(step, &ctx, &mut state.rng) {
            expired.push(entity.id);
        }
    }

    for id in expired {
        if let Some(entity) = find_entity(&state.entities, id) {
            state.coordinator.on_expired(entity, &mut state.clock, &mut state.events);
        }
    }
}

fn resolve_releases(state: &mut GameState) {
    let releases = std::mem::take(&mut state.releases);
    for (id, velocity) in releases {
        let area = state.overlaps.remove(&id);

        if state.coordinator.is_game_over() {
            if let Some(entity) = find_entity_mut(&mut state.entities, id) {
                entity.resume_wandering();
            }
            continue;
        }

        // The area the entity is released inside judges it, whoever holds
        // the hover slot right now
        if let (Some(i), Some(entity)) = (area, find_entity(&state.entities, id)) {
            state.areas[i].hover_enter(entity);
        }
        let outcome = area.and_then(|i| {
            let (entities, tuning, rng) = (&mut state.entities, &state.tuning, &mut state.rng);
            state.areas[i].resolve_release(i, id, entities, tuning, rng)
        });
        if let Some(outcome) = outcome {
            state.coordinator.apply_placement(&outcome, &state.tuning, &mut state.events);
            if let PlacementOutcome::Rejected { evicted, .. } = &outcome {
                state.entities.retain(|e| !evicted.contains(&e.id));
            }
            continue;
        }

        let Some(entity) = find_entity_mut(&mut state.entities, id) else {
            continue;
        };
        if velocity.length() >= state.tuning.flick_threshold {
            if entity.flick(velocity, state.tuning.fling_multiplier) {
                log::debug!("Entity {id} flicked at {:.2} u/s", velocity.length());
                state.coordinator.apply_flick(entity, &state.tuning, &mut state.events);
            }
        } else {
            entity.resume_wandering();
        }
    }
}

/// Drop entities that have left play
fn cull(state: &mut GameState) {
    let cull_bounds = state.cull_bounds();
    let GameState {
        entities,
        areas,
        overlaps,
        ..
    } = state;

    entities.retain(|e| {
        let keep = match e.state() {
            EntityState::Destroyed | EntityState::Expired => false,
            EntityState::FlickedGone => cull_bounds.contains(e.pos),
            _ => true,
        };
        if !keep {
            for area in areas.iter_mut() {
                area.forget(e.id);
            }
            overlaps.remove(&e.id);
        }
        keep
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::persistence::MemoryStore;
    use crate::sim::entity::{Entity, EntityKind, KindTraits};
    use crate::sim::state::{GamePhase, Layout};
    use crate::tuning::Tuning;

    /// Put an entity into play as if a spawner had produced it
    fn inject(state: &mut GameState, kind: EntityKind, pos: Vec2) -> EntityId {
        let traits = KindTraits::lookup(kind, &state.tuning);
        let mut entity = Entity::new(state.ids.next_id(), kind, pos, 0, &traits, &state.tuning);
        assert!(state.coordinator.on_spawned(&mut entity, &state.tuning, &mut state.rng));
        let id = entity.id;
        state.entities.push(entity);
        id
    }

    /// Pick up `id`, carry it to `to` and let go, all within one tick
    fn drop_at(state: &mut GameState, id: EntityId, to: Vec2) {
        let from = state.entity(id).map(|e| e.pos).unwrap();
        let input = TickInput {
            pointers: vec![
                PointerEvent::Began {
                    pointer: 0,
                    pos: from,
                    hit: Some(id),
                },
                PointerEvent::Moved { pointer: 0, pos: to },
                PointerEvent::Ended { pointer: 0 },
            ],
            ..Default::default()
        };
        tick(state, &input, SIM_DT);
    }

    fn area_center(state: &GameState, kind: EntityKind) -> Vec2 {
        state
            .areas
            .iter()
            .find(|a| a.accepted == kind)
            .map(|a| a.region.center())
            .unwrap()
    }

    fn count<F: Fn(&GameEvent) -> bool>(events: &[GameEvent], f: F) -> usize {
        events.iter().filter(|e| f(e)).count()
    }

    fn state_with(seed: u64, tuning: Tuning) -> GameState {
        let store = Box::new(MemoryStore::new());
        GameState::with_layout(seed, tuning, Layout::default(), store).unwrap()
    }

    fn pointers(events: Vec<PointerEvent>) -> TickInput {
        TickInput {
            pointers: events,
            ..Default::default()
        }
    }

    fn single_spawner_state(seed: u64, tuning: Tuning) -> GameState {
        let layout = Layout {
            spawners: vec![Vec2::ZERO],
            ..Default::default()
        };
        GameState::with_layout(seed, tuning, layout, Box::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn test_first_spawns_on_first_tick() {
        let mut state = GameState::new(12345);
        assert!(state.entities.is_empty());

        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.entities.len(), 2);
        assert_eq!(state.unresolved_count(), 2);
        let events = state.drain_events();
        assert_eq!(count(&events, |e| matches!(e, GameEvent::Spawned { .. })), 2);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_correct_placement_scores() {
        let mut state = GameState::new(1);
        let id = inject(&mut state, EntityKind::TypeB, Vec2::ZERO);
        let target = area_center(&state, EntityKind::TypeB);
        drop_at(&mut state, id, target);

        let entity = state.entity(id).unwrap();
        assert_eq!(entity.state(), EntityState::Placed);
        assert_eq!(state.score(), 10);
        assert!(!state.coordinator.registry().contains(id));
        assert!(state.drain_events().contains(&GameEvent::CorrectPlacement {
            id,
            kind: EntityKind::TypeB,
            area: 1,
            points: 10,
        }));
        assert_eq!(state.areas[1].occupants(), &[id]);
        assert_eq!(state.areas[1].hovered(), None);
    }

    #[test]
    fn test_rejection_cascades_area_occupants() {
        let mut state = GameState::new(2);
        let b_center = area_center(&state, EntityKind::TypeB);
        let a_center = area_center(&state, EntityKind::TypeA);

        for _ in 0..2 {
            let id = inject(&mut state, EntityKind::TypeB, Vec2::ZERO);
            drop_at(&mut state, id, b_center);
        }
        let placed_a: Vec<EntityId> = (0..3)
            .map(|_| {
                let id = inject(&mut state, EntityKind::TypeA, Vec2::ZERO);
                drop_at(&mut state, id, a_center);
                id
            })
            .collect();
        assert_eq!(state.score(), 50);
        state.drain_events();

        let wrong = inject(&mut state, EntityKind::TypeB, Vec2::ZERO);
        drop_at(&mut state, wrong, a_center);

        assert_eq!(state.score(), 10);
        assert!(state.areas[0].occupants().is_empty());
        assert_eq!(state.areas[1].occupants().len(), 2);
        assert!(state.entity(wrong).is_none());
        for &id in &placed_a {
            assert!(state.entity(id).is_none());
        }
        assert!(!state.coordinator.registry().contains(wrong));
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::IncorrectPlacement {
            area: 0,
            area_kind: EntityKind::TypeA,
            dropped: wrong,
            evicted: placed_a.clone(),
            destroyed_count: 4,
            penalty: 40,
        }));
        assert_eq!(state.coordinator.score().mis_sorted(), 4);
    }

    #[test]
    fn test_evil_never_accepted() {
        let mut state = GameState::new(3);
        let id = inject(&mut state, EntityKind::Evil, Vec2::ZERO);
        let target = area_center(&state, EntityKind::TypeA);
        drop_at(&mut state, id, target);
        assert!(state.entity(id).is_none());
        assert_eq!(state.score(), 0);
        assert_eq!(state.coordinator.score().mis_sorted(), 1);
    }

    fn flick_with(release_speed: f32) -> (GameState, EntityId) {
        let mut state = GameState::new(4);
        let id = inject(&mut state, EntityKind::Evil, Vec2::ZERO);
        let grab = TickInput {
            pointers: vec![PointerEvent::Began {
                pointer: 3,
                pos: Vec2::ZERO,
                hit: Some(id),
            }],
            ..Default::default()
        };
        tick(&mut state, &grab, 0.5);

        // Samples half a second apart in real time
        let throw = TickInput {
            pointers: vec![
                PointerEvent::Moved {
                    pointer: 3,
                    pos: Vec2::new(release_speed * 0.5, 0.0),
                },
                PointerEvent::Ended { pointer: 3 },
            ],
            ..Default::default()
        };
        tick(&mut state, &throw, 0.5);
        (state, id)
    }

    #[test]
    fn test_flick_threshold_is_inclusive() {
        let (mut state, id) = flick_with(3.0);
        let entity = state.entity(id).unwrap();
        assert_eq!(entity.state(), EntityState::FlickedGone);
        assert!(!state.coordinator.registry().contains(id));
        assert_eq!(state.score(), 10);
        assert!(state.drain_events().contains(&GameEvent::Flicked {
            id,
            kind: EntityKind::Evil,
            points: 10,
        }));
    }

    #[test]
    fn test_below_threshold_resumes_wandering() {
        let (state, id) = flick_with(2.0);
        let entity = state.entity(id).unwrap();
        assert_eq!(entity.state(), EntityState::Wandering);
        assert!(state.coordinator.registry().contains(id));
        assert_eq!(state.score(), 0);
    }

    #[test]
    fn test_held_still_release_is_not_a_flick() {
        let mut state = GameState::new(4);
        let id = inject(&mut state, EntityKind::TypeA, Vec2::ZERO);
        let grab = PointerEvent::Began {
            pointer: 0,
            pos: Vec2::ZERO,
            hit: Some(id),
        };
        tick(&mut state, &pointers(vec![grab]), SIM_DT);
        // A fast move, then two seconds without the pointer moving
        let fast = PointerEvent::Moved {
            pointer: 0,
            pos: Vec2::new(0.0, 1.0),
        };
        tick(&mut state, &pointers(vec![fast]), SIM_DT);
        for _ in 0..120 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        tick(&mut state, &pointers(vec![PointerEvent::Ended { pointer: 0 }]), SIM_DT);

        assert_eq!(state.entity(id).map(|e| e.state()), Some(EntityState::Wandering));
        assert!(state.coordinator.registry().contains(id));
        assert_eq!(state.coordinator.score().flicked(EntityKind::TypeA), 0);
    }

    #[test]
    fn test_release_judged_by_area_after_hover_slot_vacated() {
        let mut state = GameState::new(9);
        let a = inject(&mut state, EntityKind::TypeA, Vec2::new(-1.0, 0.0));
        let b = inject(&mut state, EntityKind::TypeB, Vec2::new(1.0, 0.0));
        let a_center = area_center(&state, EntityKind::TypeA);

        // Pointer 0 parks A in its area
        let input = pointers(vec![
            PointerEvent::Began {
                pointer: 0,
                pos: Vec2::new(-1.0, 0.0),
                hit: Some(a),
            },
            PointerEvent::Moved {
                pointer: 0,
                pos: a_center,
            },
        ]);
        tick(&mut state, &input, SIM_DT);
        assert_eq!(state.areas[0].hovered(), Some(a));

        // Pointer 1 passes B through the same area and back out
        let input = pointers(vec![
            PointerEvent::Began {
                pointer: 1,
                pos: Vec2::new(1.0, 0.0),
                hit: Some(b),
            },
            PointerEvent::Moved {
                pointer: 1,
                pos: a_center + Vec2::new(0.0, 1.0),
            },
        ]);
        tick(&mut state, &input, SIM_DT);
        assert_eq!(state.areas[0].hovered(), Some(b));
        let input = pointers(vec![PointerEvent::Moved {
            pointer: 1,
            pos: Vec2::new(1.0, 0.0),
        }]);
        tick(&mut state, &input, SIM_DT);
        assert_eq!(state.areas[0].hovered(), Some(a));

        tick(&mut state, &pointers(vec![PointerEvent::Ended { pointer: 0 }]), SIM_DT);
        assert_eq!(state.entity(a).map(|e| e.state()), Some(EntityState::Placed));
        assert_eq!(state.score(), 10);
        assert_eq!(state.areas[0].occupants(), &[a]);
        assert_eq!(state.entity(b).map(|e| e.state()), Some(EntityState::Dragging));
    }

    #[test]
    fn test_simultaneous_releases_in_one_area() {
        let mut state = GameState::new(10);
        let a1 = inject(&mut state, EntityKind::TypeA, Vec2::new(-1.0, 0.0));
        let a2 = inject(&mut state, EntityKind::TypeA, Vec2::new(1.0, 0.0));
        let a_center = area_center(&state, EntityKind::TypeA);
        let input = pointers(vec![
            PointerEvent::Began {
                pointer: 0,
                pos: Vec2::new(-1.0, 0.0),
                hit: Some(a1),
            },
            PointerEvent::Began {
                pointer: 1,
                pos: Vec2::new(1.0, 0.0),
                hit: Some(a2),
            },
            PointerEvent::Moved {
                pointer: 0,
                pos: a_center,
            },
            PointerEvent::Moved {
                pointer: 1,
                pos: a_center + Vec2::new(0.0, 1.0),
            },
            PointerEvent::Ended { pointer: 0 },
            PointerEvent::Ended { pointer: 1 },
        ]);
        tick(&mut state, &input, SIM_DT);
        assert_eq!(state.areas[0].occupants(), &[a1, a2]);
        assert_eq!(state.score(), 20);
    }

    #[test]
    fn test_flicked_entity_leaves_play() {
        let tuning = Tuning {
            fling_multiplier: 20.0,
            ..Default::default()
        };
        let mut state = state_with(4, tuning);
        let id = inject(&mut state, EntityKind::TypeA, Vec2::ZERO);
        let input = TickInput {
            pointers: vec![PointerEvent::Began {
                pointer: 0,
                pos: Vec2::ZERO,
                hit: Some(id),
            }],
            ..Default::default()
        };
        tick(&mut state, &input, 0.1);
        let input = TickInput {
            pointers: vec![
                PointerEvent::Moved {
                    pointer: 0,
                    pos: Vec2::new(0.0, 1.0),
                },
                PointerEvent::Ended { pointer: 0 },
            ],
            ..Default::default()
        };
        tick(&mut state, &input, 0.1);
        // TypeA flicks are allowed but worth nothing
        assert_eq!(state.entity(id).map(|e| e.state()), Some(EntityState::FlickedGone));
        assert_eq!(state.score(), 0);

        for _ in 0..30 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert!(state.entity(id).is_none());
    }

    #[test]
    fn test_drag_suspends_expiry() {
        let tuning = Tuning {
            spawn_interval: 1000.0,
            spawn_jitter: 0.0,
            spawn_budget: 2,
            ..Default::default()
        };
        let mut state = single_spawner_state(8, tuning);
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.entities.len(), 1);
        let id = state.entities[0].id;

        let grab = TickInput {
            pointers: vec![PointerEvent::Began {
                pointer: 0,
                pos: Vec2::ZERO,
                hit: Some(id),
            }],
            ..Default::default()
        };
        tick(&mut state, &grab, SIM_DT);
        let held_life = state.entity(id).unwrap().life_remaining();

        // Twice the lifetime, held the whole time
        for _ in 0..600 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert!(!state.is_game_over());
        let entity = state.entity(id).unwrap();
        assert_eq!(entity.state(), EntityState::Dragging);
        assert_eq!(entity.life_remaining(), held_life);

        let release = TickInput {
            pointers: vec![PointerEvent::Ended { pointer: 0 }],
            ..Default::default()
        };
        tick(&mut state, &release, SIM_DT);
        assert_eq!(state.entity(id).unwrap().state(), EntityState::Wandering);

        // Resumes from where it left off
        let mut ticks = 0;
        while !state.is_game_over() && ticks < 1000 {
            tick(&mut state, &TickInput::default(), SIM_DT);
            ticks += 1;
        }
        assert!(state.is_game_over());
        let expected = (held_life / SIM_DT).ceil() as i32;
        assert!((ticks - expected).abs() <= 2, "expired after {ticks} ticks, expected ~{expected}");
    }

    #[test]
    fn test_expiry_ends_the_run_once() {
        let mut state = GameState::new(99);
        let mut events = Vec::new();
        for _ in 0..1200 {
            tick(&mut state, &TickInput::default(), SIM_DT);
            events.extend(state.drain_events());
            if state.is_game_over() {
                break;
            }
        }
        assert!(state.is_game_over());
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state.clock.is_frozen());

        let position = |f: fn(&GameEvent) -> bool| events.iter().position(f).unwrap();
        let expired_at = position(|e| matches!(e, GameEvent::Expired { .. }));
        let over_at = position(|e| matches!(e, GameEvent::GameOver { .. }));
        assert!(expired_at < over_at);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::GameOver { .. })), 1);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::LevelCleared { .. })), 0);

        // Frozen: nothing else happens
        let entities_before = state.entities.len();
        for _ in 0..120 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert!(state.drain_events().is_empty());
        assert_eq!(state.entities.len(), entities_before);
    }

    #[test]
    fn test_level_completes_once_and_advances() {
        let tuning = Tuning {
            spawn_interval: 0.1,
            spawn_jitter: 0.0,
            spawn_budget: 2,
            evil_spawn_chance: 0.0,
            ..Default::default()
        };
        let mut state = state_with(21, tuning);
        let mut events = Vec::new();

        for _ in 0..400 {
            let next = state
                .entities
                .iter()
                .find(|e| e.state() == EntityState::Wandering)
                .map(|e| (e.id, e.kind));
            match next {
                Some((id, kind)) => {
                    let target = area_center(&state, kind);
                    drop_at(&mut state, id, target);
                }
                None => tick(&mut state, &TickInput::default(), SIM_DT),
            }
            events.extend(state.drain_events());
            if state.level() == 2 {
                break;
            }
        }

        assert_eq!(state.level(), 2);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::LevelCleared { level: 1, .. })), 1);
        assert!(events.contains(&GameEvent::LevelComplete { new_level: 2 }));
        assert_eq!(state.score(), 40);
        assert_eq!(state.coordinator.records().level_score(1), 40);
        // Budget grew for the new level
        assert!(state.coordinator.spawners().iter().all(|s| s.budget() == 7));
    }

    #[test]
    fn test_transition_phase_uses_real_time() {
        let tuning = Tuning {
            spawn_budget: 0,
            ..Default::default()
        };
        let mut state = state_with(5, tuning);
        assert_eq!(state.phase, GamePhase::LevelTransition);

        // Slow motion must not stretch the grace period
        let input = TickInput {
            activate_slow_motion: true,
            ..Default::default()
        };
        tick(&mut state, &input, 0.5);
        assert_eq!(state.level(), 1);
        tick(&mut state, &TickInput::default(), 0.5);
        assert_eq!(state.level(), 2);
    }

    #[test]
    fn test_slow_motion_scales_gameplay_time() {
        let mut state = GameState::new(6);
        let id = inject(&mut state, EntityKind::TypeA, Vec2::ZERO);
        let before = state.entity(id).unwrap().life_remaining();
        let input = TickInput {
            activate_slow_motion: true,
            ..Default::default()
        };
        tick(&mut state, &input, 0.1);
        assert!(state.drain_events().contains(&GameEvent::SlowMotionStarted));
        assert!((state.clock.time_scale() - 0.2).abs() < 1e-6);
        let after = state.entity(id).unwrap().life_remaining();
        assert!((before - after - 0.02).abs() < 1e-5);
    }

    #[test]
    fn test_one_entity_per_pointer() {
        let mut state = GameState::new(7);
        let a = inject(&mut state, EntityKind::TypeA, Vec2::new(-1.0, 0.0));
        let b = inject(&mut state, EntityKind::TypeB, Vec2::new(1.0, 0.0));
        let input = TickInput {
            pointers: vec![
                PointerEvent::Began {
                    pointer: 0,
                    pos: Vec2::ZERO,
                    hit: Some(a),
                },
                // Same pointer again: ignored
                PointerEvent::Began {
                    pointer: 0,
                    pos: Vec2::ZERO,
                    hit: Some(b),
                },
                // Another pointer on an entity already held: ignored
                PointerEvent::Began {
                    pointer: 1,
                    pos: Vec2::ZERO,
                    hit: Some(a),
                },
            ],
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);
        assert_eq!(state.entity(a).unwrap().drag_pointer(), Some(0));
        assert_eq!(state.entity(b).unwrap().state(), EntityState::Wandering);
        assert_eq!(state.grabs.len(), 1);
    }

    #[test]
    fn test_determinism() {
        let mut state1 = GameState::new(424242);
        let mut state2 = GameState::new(424242);

        for i in 0..300 {
            let input = TickInput {
                activate_slow_motion: i == 100,
                ..Default::default()
            };
            tick(&mut state1, &input, SIM_DT);
            tick(&mut state2, &input, SIM_DT);
        }

        assert_eq!(state1.clock.ticks(), state2.clock.ticks());
        assert_eq!(state1.entities, state2.entities);
        assert_eq!(state1.drain_events(), state2.drain_events());
    }
}
