//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - One logical tick per frame, all timers counted in ticks
//! - Seeded RNG only
//! - Fixed phase order: spawn, update, collide, progress
//! - No rendering or platform dependencies

pub mod behavior;
pub mod collision;
pub mod events;
pub mod physics;
pub mod progression;
pub mod spawner;
pub mod state;
pub mod tick;

pub use behavior::{Disguise, Motion};
pub use collision::{Rect, resolve_collisions};
pub use events::{Event, EventKind, EventLog};
pub use progression::{level_for_score, speed_for_level};
pub use state::{
    Collectible, CollectibleKind, GamePhase, GameState, HazardClass, JumpState, Obstacle,
    ObstacleKind, Player, Projectile,
};
pub use tick::{TickInput, tick};
