//! Simulation clock with two time bases
//!
//! Gameplay timers (lifetimes, movement phases, spawn intervals) run on
//! scaled time, which slows during slow motion and stops at game over.
//! Pacing timers (level transition delay, slow-motion window, drag velocity
//! sampling) run on real time and are never scaled.

use serde::{Deserialize, Serialize};

/// Time deltas for one tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Step {
    /// Unscaled seconds since the previous tick
    pub real_dt: f32,
    /// Gameplay seconds since the previous tick (real_dt * time scale)
    pub dt: f32,
}

/// An active slow-motion window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct SlowMotion {
    factor: f32,
    remaining_real: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clock {
    /// Scaled seconds since the run started
    elapsed: f64,
    /// Real seconds since the run started
    real_elapsed: f64,
    ticks: u64,
    slow_motion: Option<SlowMotion>,
    frozen: bool,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        Self {
            elapsed: 0.0,
            real_elapsed: 0.0,
            ticks: 0,
            slow_motion: None,
            frozen: false,
        }
    }

    /// Advance both time bases by one tick of `real_dt` seconds
    pub fn advance(&mut self, real_dt: f32) -> Step {
        let real_dt = real_dt.max(0.0);
        let scale = self.time_scale();

        self.ticks += 1;
        self.real_elapsed += real_dt as f64;
        let dt = real_dt * scale;
        self.elapsed += dt as f64;

        if let Some(slow) = &mut self.slow_motion {
            slow.remaining_real -= real_dt;
            if slow.remaining_real <= 0.0 {
                log::debug!("Slow motion ended");
                self.slow_motion = None;
            }
        }

        Step { real_dt, dt }
    }

    /// Current gameplay time scale (0 when frozen)
    pub fn time_scale(&self) -> f32 {
        if self.frozen {
            0.0
        } else {
            self.slow_motion.map(|s| s.factor).unwrap_or(1.0)
        }
    }

    /// Start (or restart) a slow-motion window. Ignored once frozen.
    pub fn start_slow_motion(&mut self, factor: f32, duration_real: f32) -> bool {
        if self.frozen {
            return false;
        }
        self.slow_motion = Some(SlowMotion {
            factor: factor.clamp(0.01, 1.0),
            remaining_real: duration_real.max(0.0),
        });
        log::debug!("Slow motion x{factor} for {duration_real}s");
        true
    }

    pub fn slow_motion_active(&self) -> bool {
        self.slow_motion.is_some()
    }

    /// Stop scaled time permanently. Real time keeps running for UI pacing.
    pub fn freeze(&mut self) {
        self.frozen = true;
        self.slow_motion = None;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn real_elapsed(&self) -> f64 {
        self.real_elapsed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
