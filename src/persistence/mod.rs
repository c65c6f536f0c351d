//! Progress persistence
//!
//! Features:
//! - `ProgressStore` seam so the simulation never touches the filesystem
//! - Atomic JSON writes (tmp file, then rename over the old save)
//! - In-memory store for tests and headless runs
//!
//! Failures surface as `PersistenceError`; callers log them and keep playing.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::highscores::HighScores;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Where best score, highest level and per-level bests live between runs
pub trait ProgressStore: fmt::Debug {
    fn load(&self) -> Result<HighScores, PersistenceError>;
    fn save(&mut self, records: &HighScores) -> Result<(), PersistenceError>;
}

/// Keeps records in memory only
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: Option<HighScores>,
    saves: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded with earlier records
    pub fn with_records(records: HighScores) -> Self {
        Self {
            records: Some(records),
            saves: 0,
        }
    }

    /// Number of successful saves
    pub fn saves(&self) -> u32 {
        self.saves
    }
}

impl ProgressStore for MemoryStore {
    fn load(&self) -> Result<HighScores, PersistenceError> {
        Ok(self.records.clone().unwrap_or_default())
    }

    fn save(&mut self, records: &HighScores) -> Result<(), PersistenceError> {
        self.records = Some(records.clone());
        self.saves += 1;
        Ok(())
    }
}

/// Records stored as a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressStore for JsonFileStore {
    fn load(&self) -> Result<HighScores, PersistenceError> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    fn save(&mut self, records: &HighScores) -> Result<(), PersistenceError> {
        write_json(&self.path, records)?;
        log::info!("High scores saved to {}", self.path.display());
        Ok(())
    }
}

/// Read a JSON document. A missing file is `Ok(None)`, not an error.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistenceError> {
    match fs::read_to_string(path) {
        Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write a JSON document atomically (tmp + rename)
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let json = serde_json::to_string_pretty(value)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Wall-clock milliseconds for leaderboard timestamps
pub fn now_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as f64)
        .unwrap_or(0.0)
}
