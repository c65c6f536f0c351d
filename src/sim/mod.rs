//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, audio or platform dependencies

pub mod area;
pub mod clock;
pub mod coordinator;
pub mod entity;
pub mod movement;
pub mod registry;
pub mod score;
pub mod spawner;
pub mod state;
pub mod tick;

pub use area::{PlacementOutcome, SortingArea};
pub use clock::{Clock, Step};
pub use coordinator::LevelCoordinator;
pub use entity::{Entity, EntityId, EntityKind, EntityState, KindTraits};
pub use movement::Rect;
pub use registry::LifecycleRegistry;
pub use score::ScoreKeeper;
pub use spawner::{SpawnScheduler, SpawnerConfig, SpawnerId};
pub use state::{AreaSpec, GameEvent, GamePhase, GameState, Layout, LayoutError};
pub use tick::{PointerEvent, PointerId, TickInput, tick};
