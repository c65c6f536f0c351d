//! Player preferences
//!
//! Persisted separately from progress records, as a small JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::persistence::{self, PersistenceError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub muted: bool,

    // === Accessibility ===
    /// Reduced motion (no near-expiry flashing, no camera punch on rejects)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Volume a sound effect should play at, 0 when muted
    pub fn effective_sfx_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            crate::clamp01(self.master_volume) * crate::clamp01(self.sfx_volume)
        }
    }

    /// Whether the near-expiry cue should flash (respects reduced_motion)
    pub fn effective_expiry_flash(&self) -> bool {
        !self.reduced_motion
    }

    /// Load from `path`; a missing file gives the defaults
    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        let settings = persistence::read_json::<Settings>(path)?;
        if settings.is_none() {
            log::info!("Using default settings");
        }
        Ok(settings.unwrap_or_default())
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        persistence::write_json(path, self)?;
        log::info!("Settings saved");
        Ok(())
    }
}
