//! Score accumulator
//!
//! Pure bookkeeping: knows nothing about entities or areas, only about the
//! accept / reject / flick events reported to it.

use serde::{Deserialize, Serialize};

use super::entity::EntityKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreKeeper {
    total: u64,
    /// Correct placements per kind (indexed by `EntityKind::index`)
    placed: [u32; 3],
    flicked: [u32; 3],
    mis_sorted: u32,
}

impl ScoreKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn placed(&self, kind: EntityKind) -> u32 {
        self.placed[kind.index()]
    }

    pub fn flicked(&self, kind: EntityKind) -> u32 {
        self.flicked[kind.index()]
    }

    /// Entities lost to rejections over the whole run
    pub fn mis_sorted(&self) -> u32 {
        self.mis_sorted
    }

    pub fn award_correct(&mut self, kind: EntityKind, points: u64) {
        self.total = self.total.saturating_add(points);
        self.placed[kind.index()] += 1;
    }

    /// Deduct `destroyed * points_per_entity`, never going below zero.
    /// Returns the amount actually deducted.
    pub fn penalize(&mut self, destroyed: u32, points_per_entity: u64) -> u64 {
        let penalty = (destroyed as u64).saturating_mul(points_per_entity);
        let deducted = penalty.min(self.total);
        self.total -= deducted;
        self.mis_sorted += destroyed;
        deducted
    }

    pub fn award_flick(&mut self, kind: EntityKind, points: u64) {
        self.total = self.total.saturating_add(points);
        self.flicked[kind.index()] += 1;
    }
}
