//! Data-driven game balance
//!
//! Every number that shapes difficulty lives here so a balance pass never has
//! to touch simulation code. Loaded from JSON; missing fields fall back to the
//! defaults below.

use serde::{Deserialize, Serialize};

/// Smallest spawn interval a scheduler will ever wait (seconds)
pub const MIN_SPAWN_INTERVAL: f32 = 0.05;
/// Smallest move/pause phase length (seconds)
pub const MIN_PHASE_DURATION: f32 = 0.05;

/// Per-kind balance values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KindTuning {
    /// Lifetime before expiry (seconds of scaled time)
    pub lifetime: f32,
    /// Points awarded when flicked out of play
    pub flick_points: u64,
    /// Base wander speed (world units/s) before level bonus
    pub move_speed: f32,
}

/// Complete balance table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Scoring ===
    /// Points per correct placement, also the per-entity mis-sort penalty
    pub points_per_correct: u64,

    // === Kinds ===
    pub type_a: KindTuning,
    pub type_b: KindTuning,
    pub evil: KindTuning,

    // === Lifetime / flick ===
    /// Remaining lifetime below which an entity is flagged near expiry
    pub near_expiry_threshold: f32,
    /// Release speed at or above which a release is a flick
    pub flick_threshold: f32,
    /// Multiplier applied to release velocity for the fling-off motion
    pub fling_multiplier: f32,

    // === Wandering ===
    pub move_duration: f32,
    pub pause_duration: f32,
    /// Added to move speed and move duration per level
    pub level_move_bonus: f32,
    pub safe_direction_attempts: u32,
    pub avoidance_look_ahead: f32,
    pub exclusion_probe_radius: f32,
    pub bounds_padding: f32,

    // === Erratic movement ===
    pub erratic_speed_multiplier: f32,
    pub zigzag_frequency: (f32, f32),
    pub zigzag_amplitude: (f32, f32),
    /// First level that can spawn erratic entities
    pub erratic_start_level: u32,
    pub erratic_base_chance: f32,
    pub erratic_chance_per_level: f32,

    // === Spawning ===
    pub evil_spawn_chance: f32,
    pub spawn_interval: f32,
    pub spawn_jitter: f32,
    pub spawn_budget: u32,
    /// Interval multiplier applied per completed level (shrinks)
    pub interval_scale_per_level: f32,
    /// Budget added per completed level (grows)
    pub budget_growth_per_level: u32,

    // === Pacing ===
    /// Real-time pause between level complete and the next level starting
    pub level_transition_delay: f32,
    pub slow_motion_factor: f32,
    /// Real-time length of a slow-motion window
    pub slow_motion_duration: f32,

    // === Placed wander ===
    pub placed_wander_speed: f32,
    pub placed_wander_pause: (f32, f32),
    /// Fraction of area width/height a placed entity may roam in
    pub placed_wander_inset: (f32, f32),
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            points_per_correct: 10,

            type_a: KindTuning {
                lifetime: 5.0,
                flick_points: 0,
                move_speed: 1.0,
            },
            type_b: KindTuning {
                lifetime: 5.0,
                flick_points: 0,
                move_speed: 1.0,
            },
            evil: KindTuning {
                lifetime: 6.0,
                flick_points: 10,
                move_speed: 1.2,
            },

            near_expiry_threshold: 2.0,
            flick_threshold: 3.0,
            fling_multiplier: 1.0,

            move_duration: 2.0,
            pause_duration: 1.0,
            level_move_bonus: 0.2,
            safe_direction_attempts: 30,
            avoidance_look_ahead: 1.5,
            exclusion_probe_radius: 0.3,
            bounds_padding: 0.5,

            erratic_speed_multiplier: 1.5,
            zigzag_frequency: (2.0, 10.0),
            zigzag_amplitude: (0.5, 3.0),
            erratic_start_level: 3,
            erratic_base_chance: 0.1,
            erratic_chance_per_level: 0.05,

            evil_spawn_chance: 0.05,
            spawn_interval: 3.0,
            spawn_jitter: 0.5,
            spawn_budget: 15,
            interval_scale_per_level: 0.9,
            budget_growth_per_level: 5,

            level_transition_delay: 1.0,
            slow_motion_factor: 0.2,
            slow_motion_duration: 5.0,

            placed_wander_speed: 0.3,
            placed_wander_pause: (1.0, 2.0),
            placed_wander_inset: (0.9, 0.8),
        }
    }
}

impl Tuning {
    /// Parse tuning from JSON (unknown fields ignored, missing fields default)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let tuning: Tuning = serde_json::from_str(json)?;
        Ok(tuning.sanitized())
    }

    /// Clamp out-of-range values to safe minimums instead of rejecting them
    pub fn sanitized(mut self) -> Self {
        self.move_duration = self.move_duration.max(MIN_PHASE_DURATION);
        self.pause_duration = self.pause_duration.max(0.0);
        self.spawn_interval = self.spawn_interval.max(MIN_SPAWN_INTERVAL);
        self.spawn_jitter = self.spawn_jitter.abs();
        self.flick_threshold = self.flick_threshold.max(0.0);
        self.safe_direction_attempts = self.safe_direction_attempts.max(1);
        self.interval_scale_per_level = self.interval_scale_per_level.clamp(0.01, 1.0);
        self.slow_motion_factor = self.slow_motion_factor.clamp(0.01, 1.0);
        self.level_transition_delay = self.level_transition_delay.max(0.0);
        self.evil_spawn_chance = crate::clamp01(self.evil_spawn_chance);
        self.placed_wander_speed = self.placed_wander_speed.max(0.01);
        self.placed_wander_pause = ordered(self.placed_wander_pause);
        self.zigzag_frequency = ordered(self.zigzag_frequency);
        self.zigzag_amplitude = ordered(self.zigzag_amplitude);
        for kind in [&mut self.type_a, &mut self.type_b, &mut self.evil] {
            kind.lifetime = kind.lifetime.max(MIN_PHASE_DURATION);
            kind.move_speed = kind.move_speed.max(0.0);
        }
        self
    }

    /// Chance that an entity spawned at `level` moves erratically
    pub fn erratic_chance(&self, level: u32) -> f32 {
        if level < self.erratic_start_level {
            return 0.0;
        }
        let extra = (level - self.erratic_start_level) as f32;
        crate::clamp01(self.erratic_base_chance + extra * self.erratic_chance_per_level)
    }
}

fn ordered((a, b): (f32, f32)) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}
