//! Sound cues
//!
//! Fire-and-forget: simulation events map to at most one `SoundEffect`, a
//! manager applies volume and mute, and an `AudioSink` makes the noise.
//! Nothing here feeds back into the simulation.

use crate::settings::Settings;
use crate::sim::{EntityKind, GameEvent};

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEffect {
    /// Entity accepted by an area
    Correct,
    /// Area rejected a release and wiped its occupants
    Wrong,
    /// Evil entity thrown out of play
    FlickEvil,
    /// Sortable entity thrown out of play (worth nothing)
    Flick,
    SlowMotion,
    /// Level barrier passed
    LevelClear,
    GameOver,
    /// Game over with a new best score
    HighScore,
}

/// Procedural tone description: frequencies played in sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub freqs: &'static [f32],
    /// Seconds per note
    pub note_len: f32,
}

impl SoundEffect {
    /// Map an outward event to its cue, if it has one
    pub fn for_event(event: &GameEvent) -> Option<Self> {
        match event {
            GameEvent::CorrectPlacement { .. } => Some(SoundEffect::Correct),
            GameEvent::IncorrectPlacement { .. } => Some(SoundEffect::Wrong),
            GameEvent::Flicked {
                kind: EntityKind::Evil,
                ..
            } => Some(SoundEffect::FlickEvil),
            GameEvent::Flicked { .. } => Some(SoundEffect::Flick),
            GameEvent::SlowMotionStarted => Some(SoundEffect::SlowMotion),
            GameEvent::LevelCleared { .. } => Some(SoundEffect::LevelClear),
            GameEvent::GameOver {
                final_score,
                high_score,
                ..
            } => {
                if *final_score > 0 && final_score >= high_score {
                    Some(SoundEffect::HighScore)
                } else {
                    Some(SoundEffect::GameOver)
                }
            }
            // Expiry is announced by the game-over cue that follows it
            GameEvent::Spawned { .. }
            | GameEvent::SpawnerFinished { .. }
            | GameEvent::Expired { .. }
            | GameEvent::LevelComplete { .. } => None,
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            SoundEffect::Correct => Tone {
                freqs: &[600.0, 800.0],
                note_len: 0.06,
            },
            SoundEffect::Wrong => Tone {
                freqs: &[200.0, 150.0],
                note_len: 0.12,
            },
            SoundEffect::FlickEvil => Tone {
                freqs: &[600.0, 800.0, 1000.0],
                note_len: 0.05,
            },
            SoundEffect::Flick => Tone {
                freqs: &[500.0],
                note_len: 0.08,
            },
            SoundEffect::SlowMotion => Tone {
                freqs: &[800.0, 600.0, 400.0],
                note_len: 0.15,
            },
            SoundEffect::LevelClear => Tone {
                freqs: &[400.0, 500.0, 600.0, 800.0],
                note_len: 0.1,
            },
            SoundEffect::GameOver => Tone {
                freqs: &[400.0, 350.0, 300.0, 200.0],
                note_len: 0.2,
            },
            SoundEffect::HighScore => Tone {
                freqs: &[500.0, 600.0, 700.0, 800.0, 1000.0],
                note_len: 0.1,
            },
        }
    }
}

/// Something that can play a cue at a volume
pub trait AudioSink {
    fn play(&mut self, effect: SoundEffect, volume: f32);
}

/// Headless sink: logs each cue
#[derive(Debug, Default)]
pub struct LogSink;

impl AudioSink for LogSink {
    fn play(&mut self, effect: SoundEffect, volume: f32) {
        let tone = effect.tone();
        log::debug!(
            "Sound {:?} at {:.2} ({} notes x {:.2}s)",
            effect,
            volume,
            tone.freqs.len(),
            tone.note_len
        );
    }
}

/// Audio manager for the game
#[derive(Debug)]
pub struct AudioManager<S: AudioSink> {
    sink: S,
    master_volume: f32,
    sfx_volume: f32,
    muted: bool,
}

impl<S: AudioSink> AudioManager<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
        }
    }

    pub fn from_settings(sink: S, settings: &Settings) -> Self {
        let mut audio = Self::new(sink);
        audio.set_master_volume(settings.master_volume);
        audio.set_sfx_volume(settings.sfx_volume);
        audio.set_muted(settings.muted);
        audio
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    /// Play a sound effect (silently dropped at zero volume)
    pub fn play(&mut self, effect: SoundEffect) {
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return;
        }
        self.sink.play(effect, vol);
    }

    /// Play the cue for every event that has one, in order
    pub fn handle_events(&mut self, events: &[GameEvent]) {
        for effect in events.iter().filter_map(SoundEffect::for_event) {
            self.play(effect);
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
