//! Shroom Sort - a time-pressure sorting arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entity lifecycle, spawning, placement, levels)
//! - `persistence`: Progress store (best score, highest level)
//! - `tuning`: Data-driven game balance
//! - `audio`: One-way sound cues derived from simulation events

pub mod audio;
pub mod highscores;
pub mod persistence;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use highscores::HighScores;
pub use settings::Settings;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz is plenty for wandering mushrooms)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Playfield half extents in world units (16:9 at orthographic size 4.5)
    pub const WORLD_HALF_WIDTH: f32 = 8.0;
    pub const WORLD_HALF_HEIGHT: f32 = 4.5;

    /// Radius used by the fallback pointer hit test
    pub const ENTITY_HIT_RADIUS: f32 = 0.45;
}

/// Clamp to [0, 1]
#[inline]
pub fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Hermite smoothstep between 0 and 1
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    let t = clamp01(t);
    t * t * (3.0 - 2.0 * t)
}
