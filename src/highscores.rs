//! Persistent progress records
//!
//! Best score, highest level reached, per-level bests and a top 10
//! leaderboard. Stored through a `ProgressStore`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Maximum number of leaderboard entries to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// A single leaderboard entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub score: u64,
    /// Level the run ended on
    pub level: u32,
    /// Unix timestamp (ms) when achieved
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
    best_score: u64,
    highest_level: u32,
    /// Best run score at the moment each level was cleared
    level_scores: BTreeMap<u32, u64>,
}

impl HighScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn high_score(&self) -> u64 {
        self.best_score
    }

    pub fn highest_level(&self) -> u32 {
        self.highest_level
    }

    pub fn level_score(&self, level: u32) -> u64 {
        self.level_scores.get(&level).copied().unwrap_or(0)
    }

    /// Returns true if `score` became the new best
    pub fn submit_high_score(&mut self, score: u64) -> bool {
        if score > self.best_score {
            self.best_score = score;
            return true;
        }
        false
    }

    pub fn submit_highest_level(&mut self, level: u32) -> bool {
        if level > self.highest_level {
            self.highest_level = level;
            return true;
        }
        false
    }

    pub fn submit_level_score(&mut self, level: u32, score: u64) -> bool {
        let best = self.level_scores.entry(level).or_insert(0);
        if score > *best {
            *best = score;
            return true;
        }
        false
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Rank a score would achieve (1-indexed, None if it doesn't qualify)
    pub fn potential_rank(&self, score: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Insert a finished run. Returns the rank achieved, if any.
    pub fn add_score(&mut self, score: u64, level: u32, timestamp: f64) -> Option<usize> {
        let rank = self.potential_rank(score)?;
        self.entries.insert(
            rank - 1,
            HighScoreEntry {
                score,
                level,
                timestamp,
            },
        );
        self.entries.truncate(MAX_HIGH_SCORES);
        Some(rank)
    }

    /// Nothing recorded yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
            && self.best_score == 0
            && self.highest_level == 0
            && self.level_scores.is_empty()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }
}
