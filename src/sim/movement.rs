//! Wandering movement helpers
//!
//! Axis-aligned regions, safe heading selection that avoids leaving the
//! playfield or walking into sorting areas, zig-zag modulation for erratic
//! entities, and the confined wander used after an entity is placed.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::smoothstep;

/// Axis-aligned rectangle in world units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(center - half_extents.abs(), center + half_extents.abs())
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Whether a circle touches this rectangle
    pub fn intersects_circle(&self, center: Vec2, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        closest.distance_squared(center) <= radius * radius
    }

    pub fn clamp_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }

    /// Shrink every side by `pad`, collapsing to the center if too small
    pub fn shrink(&self, pad: f32) -> Rect {
        let half = (self.size() * 0.5 - Vec2::splat(pad)).max(Vec2::ZERO);
        Rect::from_center(self.center(), half)
    }

    /// Keep `fx` of the width and `fy` of the height, centered
    pub fn inset_fraction(&self, fx: f32, fy: f32) -> Rect {
        let keep = Vec2::new(fx.clamp(0.0, 1.0), fy.clamp(0.0, 1.0));
        Rect::from_center(self.center(), self.size() * 0.5 * keep)
    }

    /// Uniform random point inside
    pub fn random_point<R: Rng>(&self, rng: &mut R) -> Vec2 {
        Vec2::new(
            lerp(self.min.x, self.max.x, rng.random::<f32>()),
            lerp(self.min.y, self.max.y, rng.random::<f32>()),
        )
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Uniformly distributed unit vector
pub fn random_unit<R: Rng>(rng: &mut R) -> Vec2 {
    Vec2::from_angle(rng.random_range(0.0..TAU))
}

/// Parameters for safe heading selection
#[derive(Debug, Clone, Copy)]
pub struct Avoidance {
    /// How far ahead a candidate heading is probed
    pub look_ahead: f32,
    /// Radius of the probe circle tested against exclusion regions
    pub probe_radius: f32,
    pub max_attempts: u32,
}

/// Pick a heading that keeps the entity inside `bounds` and out of `exclusions`.
///
/// Random candidates are tried up to `max_attempts` times. If none is safe the
/// entity steers toward the center of `bounds`, and if it already sits on the
/// center a uniform random heading is returned.
pub fn pick_safe_direction<R: Rng>(
    pos: Vec2,
    bounds: &Rect,
    exclusions: &[Rect],
    avoidance: &Avoidance,
    rng: &mut R,
) -> Vec2 {
    for _ in 0..avoidance.max_attempts.max(1) {
        let candidate = random_unit(rng);
        let probe = pos + candidate * avoidance.look_ahead;
        if !bounds.contains(probe) {
            continue;
        }
        if exclusions
            .iter()
            .any(|r| r.intersects_circle(probe, avoidance.probe_radius))
        {
            continue;
        }
        return candidate;
    }

    let to_center = bounds.center() - pos;
    if to_center.length_squared() > 1e-6 {
        return to_center.normalize();
    }
    random_unit(rng)
}

/// Clamp `pos` into `bounds`, turning `dir` back inward on each violated axis.
/// Returns true if a correction was applied.
pub fn keep_inside(pos: &mut Vec2, dir: &mut Vec2, bounds: &Rect) -> bool {
    let mut corrected = false;

    if pos.x < bounds.min.x {
        pos.x = bounds.min.x;
        dir.x = dir.x.abs();
        corrected = true;
    } else if pos.x > bounds.max.x {
        pos.x = bounds.max.x;
        dir.x = -dir.x.abs();
        corrected = true;
    }

    if pos.y < bounds.min.y {
        pos.y = bounds.min.y;
        dir.y = dir.y.abs();
        corrected = true;
    } else if pos.y > bounds.max.y {
        pos.y = bounds.max.y;
        dir.y = -dir.y.abs();
        corrected = true;
    }

    corrected
}

/// Zig-zag parameters for erratic entities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zigzag {
    pub speed_multiplier: f32,
    pub frequency: f32,
    pub amplitude: f32,
}

impl Zigzag {
    /// Heading after applying the sideways oscillation at time `t`
    pub fn heading(&self, dir: Vec2, t: f32) -> Vec2 {
        let offset = (t * self.frequency).sin() * self.amplitude;
        (dir + dir.perp() * offset).normalize_or_zero()
    }
}

/// Confined wander inside a sorting area after placement (cosmetic)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AreaWander {
    Travel {
        start: Vec2,
        target: Vec2,
        elapsed: f32,
        duration: f32,
    },
    Rest {
        remaining: f32,
    },
}

/// Drives an `AreaWander` inside a fixed region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaWanderer {
    region: Rect,
    speed: f32,
    pause: (f32, f32),
    phase: AreaWander,
}

impl AreaWanderer {
    pub fn new<R: Rng>(
        region: Rect,
        from: Vec2,
        speed: f32,
        pause: (f32, f32),
        rng: &mut R,
    ) -> Self {
        let speed = speed.max(0.01);
        let phase = Self::travel_from(&region, from, speed, rng);
        Self {
            region,
            speed,
            pause,
            phase,
        }
    }

    fn travel_from<R: Rng>(region: &Rect, from: Vec2, speed: f32, rng: &mut R) -> AreaWander {
        let target = region.random_point(rng);
        let duration = (from.distance(target) / speed).max(0.1);
        AreaWander::Travel {
            start: from,
            target,
            elapsed: 0.0,
            duration,
        }
    }

    pub fn region(&self) -> &Rect {
        &self.region
    }

    pub fn phase(&self) -> &AreaWander {
        &self.phase
    }

    /// Advance by `dt`, moving `pos` along the current leg
    pub fn update<R: Rng>(&mut self, pos: &mut Vec2, dt: f32, rng: &mut R) {
        match &mut self.phase {
            AreaWander::Travel {
                start,
                target,
                elapsed,
                duration,
            } => {
                *elapsed += dt;
                let t = smoothstep(*elapsed / *duration);
                *pos = start.lerp(*target, t);
                if *elapsed >= *duration {
                    let (lo, hi) = self.pause;
                    let remaining = if hi > lo { rng.random_range(lo..hi) } else { lo };
                    self.phase = AreaWander::Rest { remaining };
                }
            }
            AreaWander::Rest { remaining } => {
                *remaining -= dt;
                if *remaining <= 0.0 {
                    self.phase = Self::travel_from(&self.region, *pos, self.speed, rng);
                }
            }
        }
    }
}
