//! Sortable entities and their lifecycle state machine
//!
//! ```text
//! Wandering ──drag──▶ Dragging ──release──▶ Wandering
//!     │                  ├──────────────▶ Placed       (accepted by an area)
//!     │                  ├──────────────▶ Destroyed    (rejected by an area)
//!     │                  └──────────────▶ FlickedGone  (released fast enough)
//!     └──lifetime out──▶ Expired
//! ```
//!
//! Terminal states have no outgoing transitions. Every transition method
//! returns `false` instead of acting when called from the wrong state, which
//! is what keeps an entity from reaching two terminal states.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::clock::Step;
use super::movement::{AreaWanderer, Avoidance, Rect, Zigzag, keep_inside, pick_safe_direction};
use super::spawner::SpawnerId;
use super::tick::PointerId;
use crate::tuning::Tuning;

/// Unique for the lifetime of a run
pub type EntityId = u32;

/// Hands out entity ids; never reuses one within a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdAllocator {
    next: EntityId,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    pub fn next_id(&mut self) -> EntityId {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Look up an entity in a slice kept sorted by id
pub fn find_entity_mut(entities: &mut [Entity], id: EntityId) -> Option<&mut Entity> {
    match entities.binary_search_by_key(&id, |e| e.id) {
        Ok(i) => Some(&mut entities[i]),
        Err(_) => None,
    }
}

pub fn find_entity(entities: &[Entity], id: EntityId) -> Option<&Entity> {
    entities
        .binary_search_by_key(&id, |e| e.id)
        .ok()
        .map(|i| &entities[i])
}

/// Closed set of sortable kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    TypeA,
    TypeB,
    /// Never accepted by any area; meant to be flicked away
    Evil,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::TypeA, EntityKind::TypeB, EntityKind::Evil];

    /// Dense index for per-kind tables
    pub fn index(self) -> usize {
        match self {
            EntityKind::TypeA => 0,
            EntityKind::TypeB => 1,
            EntityKind::Evil => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::TypeA => "TypeA",
            EntityKind::TypeB => "TypeB",
            EntityKind::Evil => "Evil",
        }
    }
}

/// Per-kind values looked up once instead of branching on kind everywhere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindTraits {
    pub lifetime: f32,
    pub move_speed: f32,
    /// Awarded on correct placement
    pub place_points: u64,
    /// Awarded when flicked out of play
    pub flick_points: u64,
}

impl KindTraits {
    pub fn lookup(kind: EntityKind, tuning: &Tuning) -> Self {
        let k = match kind {
            EntityKind::TypeA => &tuning.type_a,
            EntityKind::TypeB => &tuning.type_b,
            EntityKind::Evil => &tuning.evil,
        };
        Self {
            lifetime: k.lifetime,
            move_speed: k.move_speed,
            place_points: tuning.points_per_correct,
            flick_points: k.flick_points,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityState {
    Wandering,
    Dragging,
    Placed,
    FlickedGone,
    Destroyed,
    Expired,
}

impl EntityState {
    /// Unresolved entities are exactly the registry members
    pub fn is_unresolved(&self) -> bool {
        matches!(self, EntityState::Wandering | EntityState::Dragging)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_unresolved()
    }
}

/// Alternating move / pause phases while wandering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum WanderPhase {
    Moving { remaining: f32 },
    Paused { remaining: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Motion {
    dir: Vec2,
    phase: WanderPhase,
    speed: f32,
    move_duration: f32,
    pause_duration: f32,
    zigzag: Option<Zigzag>,
    /// Scaled seconds spent moving, drives the zig-zag oscillation
    age: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Sample {
    pos: Vec2,
    t: f64,
}

/// Rolling pointer sample used to estimate release velocity
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DragSampler {
    last: Option<Sample>,
    velocity: Vec2,
}

impl DragSampler {
    pub fn new(pos: Vec2, t: f64) -> Self {
        Self {
            last: Some(Sample { pos, t }),
            velocity: Vec2::ZERO,
        }
    }

    /// Record a pointer position at real time `t`. Samples that share a
    /// timestamp with the previous one move the anchor but keep the velocity.
    pub fn record(&mut self, pos: Vec2, t: f64) {
        if let Some(last) = self.last {
            let dt = (t - last.t) as f32;
            if dt > 0.0 {
                self.velocity = (pos - last.pos) / dt;
            }
        }
        self.last = Some(Sample { pos, t });
    }

    /// The pointer stayed where it was until `t`
    pub fn hold(&mut self, t: f64) {
        if let Some(last) = self.last {
            self.record(last.pos, t);
        }
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Drag {
    /// None once released and awaiting resolution
    pointer: Option<PointerId>,
    offset: Vec2,
    sampler: DragSampler,
}

/// Where and how a placed entity lives on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Residence {
    pub area: usize,
    wander: AreaWanderer,
}

/// Movement context shared by all wandering entities in a tick
pub struct WanderContext<'a> {
    /// Playfield already shrunk by the bounds padding
    pub bounds: &'a Rect,
    /// Regions wandering entities steer away from (sorting areas)
    pub exclusions: &'a [Rect],
    pub avoidance: Avoidance,
}

/// One sortable object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub origin_spawner: SpawnerId,
    pub pos: Vec2,
    state: EntityState,
    life_remaining: f32,
    life_total: f32,
    near_expiry_threshold: f32,
    motion: Motion,
    drag: Option<Drag>,
    fling_velocity: Vec2,
    residence: Option<Residence>,
}

impl Entity {
    pub fn new(
        id: EntityId,
        kind: EntityKind,
        pos: Vec2,
        origin_spawner: SpawnerId,
        traits: &KindTraits,
        tuning: &Tuning,
    ) -> Self {
        Self {
            id,
            kind,
            origin_spawner,
            pos,
            state: EntityState::Wandering,
            life_remaining: traits.lifetime,
            life_total: traits.lifetime,
            near_expiry_threshold: tuning.near_expiry_threshold,
            motion: Motion {
                dir: Vec2::ZERO,
                // Zero-length pause: pick a heading on the first update
                phase: WanderPhase::Paused { remaining: 0.0 },
                speed: traits.move_speed,
                move_duration: tuning.move_duration.max(crate::tuning::MIN_PHASE_DURATION),
                pause_duration: tuning.pause_duration.max(0.0),
                zigzag: None,
                age: 0.0,
            },
            drag: None,
            fling_velocity: Vec2::ZERO,
            residence: None,
        }
    }

    /// Level-based difficulty: faster, longer moves, maybe erratic
    pub fn apply_difficulty(
        &mut self,
        speed_bonus: f32,
        duration_bonus: f32,
        zigzag: Option<Zigzag>,
    ) {
        self.motion.speed += speed_bonus.max(0.0);
        self.motion.move_duration += duration_bonus.max(0.0);
        self.motion.zigzag = zigzag;
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    pub fn life_remaining(&self) -> f32 {
        self.life_remaining
    }

    pub fn life_total(&self) -> f32 {
        self.life_total
    }

    /// Fraction of lifetime left, for life indicators
    pub fn life_fraction(&self) -> f32 {
        crate::clamp01(self.life_remaining / self.life_total)
    }

    /// Presentation cue: flash when close to expiring
    pub fn is_near_expiry(&self) -> bool {
        self.state.is_unresolved() && self.life_remaining <= self.near_expiry_threshold
    }

    pub fn is_erratic(&self) -> bool {
        self.motion.zigzag.is_some()
    }

    pub fn zigzag(&self) -> Option<&Zigzag> {
        self.motion.zigzag.as_ref()
    }

    pub fn is_moving(&self) -> bool {
        self.state == EntityState::Wandering
            && matches!(self.motion.phase, WanderPhase::Moving { .. })
    }

    pub fn heading(&self) -> Vec2 {
        self.motion.dir
    }

    pub fn speed(&self) -> f32 {
        self.motion.speed
    }

    pub fn move_duration(&self) -> f32 {
        self.motion.move_duration
    }

    /// Pointer currently dragging this entity
    pub fn drag_pointer(&self) -> Option<PointerId> {
        self.drag.as_ref().and_then(|d| d.pointer)
    }

    pub fn residence(&self) -> Option<&Residence> {
        self.residence.as_ref()
    }

    pub fn fling_velocity(&self) -> Vec2 {
        self.fling_velocity
    }

    // === Transitions ===

    /// Pointer pressed on this entity. Only a wandering entity can be picked up.
    pub fn begin_drag(&mut self, pointer: PointerId, pointer_pos: Vec2, now_real: f64) -> bool {
        if self.state != EntityState::Wandering {
            return false;
        }
        self.state = EntityState::Dragging;
        self.drag = Some(Drag {
            pointer: Some(pointer),
            offset: self.pos - pointer_pos,
            sampler: DragSampler::new(pointer_pos, now_real),
        });
        true
    }

    /// Follow the pointer 1:1 (keeping the grab offset)
    pub fn drag_to(&mut self, pointer_pos: Vec2, now_real: f64) -> bool {
        if self.state != EntityState::Dragging {
            return false;
        }
        match &mut self.drag {
            Some(drag) if drag.pointer.is_some() => {
                drag.sampler.record(pointer_pos, now_real);
                self.pos = pointer_pos + drag.offset;
                true
            }
            _ => false,
        }
    }

    /// Pointer lifted at `now_real`. A pointer that has not moved since its
    /// last sample releases at rest. Returns the release velocity; the entity
    /// stays in `Dragging` until the release is resolved this tick.
    pub fn end_drag(&mut self, now_real: f64) -> Option<Vec2> {
        if self.state != EntityState::Dragging {
            return None;
        }
        let drag = self.drag.as_mut()?;
        drag.pointer.take()?;
        drag.sampler.hold(now_real);
        Some(drag.sampler.velocity())
    }

    /// Release resolved with no area and no flick: back to wandering
    pub fn resume_wandering(&mut self) -> bool {
        if self.state != EntityState::Dragging {
            return false;
        }
        self.state = EntityState::Wandering;
        self.drag = None;
        self.motion.phase = WanderPhase::Paused { remaining: 0.0 };
        true
    }

    /// Accepted by an area. The lifetime stops for good.
    pub fn place(&mut self, area: usize, wander: AreaWanderer) -> bool {
        if self.state != EntityState::Dragging {
            return false;
        }
        self.state = EntityState::Placed;
        self.drag = None;
        self.residence = Some(Residence { area, wander });
        true
    }

    /// Rejected by an area (mis-sort)
    pub fn destroy(&mut self) -> bool {
        if !self.state.is_unresolved() {
            return false;
        }
        self.state = EntityState::Destroyed;
        self.drag = None;
        true
    }

    /// Released fast enough to leave play
    pub fn flick(&mut self, release_velocity: Vec2, fling_multiplier: f32) -> bool {
        if self.state != EntityState::Dragging {
            return false;
        }
        self.state = EntityState::FlickedGone;
        self.drag = None;
        self.fling_velocity = release_velocity * fling_multiplier;
        true
    }

    /// Advance timers and movement. Returns true on the tick the entity expires.
    pub fn update<R: Rng>(&mut self, step: &Step, ctx: &WanderContext, rng: &mut R) -> bool {
        let dt = step.dt;
        match self.state {
            EntityState::Wandering => {
                self.wander(dt, ctx, rng);
                self.life_remaining -= dt;
                if self.life_remaining <= 0.0 {
                    self.life_remaining = 0.0;
                    self.state = EntityState::Expired;
                    return true;
                }
            }
            EntityState::Placed => {
                if let Some(residence) = &mut self.residence {
                    residence.wander.update(&mut self.pos, dt, rng);
                }
            }
            EntityState::FlickedGone => {
                self.pos += self.fling_velocity * dt;
            }
            // Dragging suspends both movement and the lifetime
            EntityState::Dragging | EntityState::Destroyed | EntityState::Expired => {}
        }
        false
    }

    fn wander<R: Rng>(&mut self, dt: f32, ctx: &WanderContext, rng: &mut R) {
        let motion = &mut self.motion;
        match &mut motion.phase {
            WanderPhase::Paused { remaining } => {
                *remaining -= dt;
                if *remaining <= 0.0 {
                    motion.dir = pick_safe_direction(
                        self.pos,
                        ctx.bounds,
                        ctx.exclusions,
                        &ctx.avoidance,
                        rng,
                    );
                    motion.phase = WanderPhase::Moving {
                        remaining: motion.move_duration,
                    };
                }
            }
            WanderPhase::Moving { remaining } => {
                *remaining -= dt;
                let done = *remaining <= 0.0;

                motion.age += dt;
                let (heading, speed) = match &motion.zigzag {
                    Some(z) => (
                        z.heading(motion.dir, motion.age),
                        motion.speed * z.speed_multiplier,
                    ),
                    None => (motion.dir, motion.speed),
                };
                self.pos += heading * speed * dt;
                keep_inside(&mut self.pos, &mut motion.dir, ctx.bounds);

                if done {
                    motion.phase = WanderPhase::Paused {
                        remaining: motion.pause_duration,
                    };
                }
            }
        }
    }
}
