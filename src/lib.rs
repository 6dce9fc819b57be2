//! Donut Runner - an arcade runner with a replay-validated leaderboard
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, spawning, collisions, progression)
//! - `validator`: Server-side replay validator for submitted runs
//! - `leaderboard`: Best-score upsert policy, storage port, read cache
//! - `persistence`: File-backed score store with integrity verification
//! - `settings`: Server configuration

pub mod leaderboard;
pub mod persistence;
pub mod settings;
pub mod sim;
pub mod validator;

pub use leaderboard::LeaderboardService;
pub use settings::{Settings, SettingsError, StorageBackend};
pub use validator::{Rejection, RunSummary, validate};

/// Game configuration constants
pub mod consts {
    /// Simulation rate; one tick per rendered frame
    pub const TICKS_PER_SECOND: u64 = 60;

    /// Play field dimensions
    pub const FIELD_WIDTH: f32 = 1200.0;
    pub const FIELD_HEIGHT: f32 = 600.0;
    /// Player top edge when standing on the ground
    pub const GROUND_Y: f32 = 520.0;
    /// Hard ceiling for vertically moving hazards
    pub const CEILING_Y: f32 = 50.0;

    /// Player defaults
    pub const PLAYER_X: f32 = 150.0;
    pub const PLAYER_SIZE: f32 = 70.0;
    pub const GRAVITY: f32 = 0.5;
    pub const JUMP_IMPULSE: f32 = -16.0;
    /// Second jump is weaker than the first
    pub const DOUBLE_JUMP_FACTOR: f32 = 0.8;
    pub const BOUNCE_IMPULSE: f32 = -30.0;

    /// Jam pad slows the player to half speed for one second
    pub const DEBUFF_MULTIPLIER: f32 = 0.5;
    pub const DEBUFF_TICKS: u32 = 60;

    /// Speed boost pad lasts five seconds
    pub const BOOST_TICKS: u32 = 300;
    /// Boost multipliers differ per entity class so hazards stay dodgeable
    pub const OBSTACLE_BOOST_MULTIPLIER: f32 = 1.3;
    pub const COLLECTIBLE_BOOST_MULTIPLIER: f32 = 1.5;
    pub const BACKGROUND_BOOST_MULTIPLIER: f32 = 2.0;

    /// Level speed curve
    pub const BASE_SPEED: f32 = 5.0;
    pub const LEVEL_TWO_SPEED_FACTOR: f32 = 1.05;
    pub const SPEED_GROWTH_PER_LEVEL: f32 = 1.25;

    /// Projectile defaults
    pub const PROJECTILE_SPEED: f32 = 8.0;
    pub const PROJECTILE_WIDTH: f32 = 20.0;
    pub const PROJECTILE_HEIGHT: f32 = 10.0;

    /// Scoring
    pub const XP_ORB_POINTS: u32 = 1;
    pub const TEACUP_POINTS: u32 = 5;
    pub const TEACUP_XP: u32 = 5;
    /// Extra horizontal reach when a projectile meets a bonus item
    pub const TEACUP_HIT_MARGIN: f32 = 100.0;
}
