//! Game state and core simulation types
//!
//! `GameState` is the whole of a run. It is created at game start, owned by
//! the frame loop, handed by reference to each phase, and dropped at game over.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::behavior::{Disguise, Motion};
use super::collision::Rect;
use super::events::EventLog;
use crate::consts::*;
use crate::validator::RunSummary;

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Ticks are advancing
    Playing,
    /// Run ended; clock and entities are frozen
    GameOver,
}

/// Airborne state machine for the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JumpState {
    /// On the ground, a jump starts an ascent
    #[default]
    Grounded,
    /// Airborne with the double jump still available
    Jumping,
    /// Airborne with the double jump spent
    DoubleJumped,
}

/// The runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Top-left corner
    pub pos: Vec2,
    pub size: Vec2,
    pub vel_y: f32,
    pub jump: JumpState,
    /// Multiplier on world scroll (1.0 normally, halved while slowed)
    pub speed_debuff: f32,
    /// Ticks left before the debuff wears off
    pub debuff_ticks: u32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            pos: Vec2::new(PLAYER_X, GROUND_Y),
            size: Vec2::splat(PLAYER_SIZE),
            vel_y: 0.0,
            jump: JumpState::Grounded,
            speed_debuff: 1.0,
            debuff_ticks: 0,
        }
    }
}

impl Player {
    pub fn bounds(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }
}

/// What touching an obstacle does to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardClass {
    /// Ends the run
    Lethal,
    /// Slows the player for a while, consumed on touch
    Debuff,
    /// Launches the player upward, reusable
    Bounce,
    /// Grants a timed world speed boost, consumed on touch
    Boost,
}

/// Obstacle types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    Fork,
    Knife,
    Pan,
    Jam,
    Spoon,
    BounceBox,
    WoodLog,
    Barrel,
    Crate,
    SpeedBoost,
}

impl ObstacleKind {
    /// Spawn table order
    pub const ALL: [ObstacleKind; 10] = [
        ObstacleKind::Fork,
        ObstacleKind::Knife,
        ObstacleKind::Pan,
        ObstacleKind::Jam,
        ObstacleKind::Spoon,
        ObstacleKind::BounceBox,
        ObstacleKind::WoodLog,
        ObstacleKind::Barrel,
        ObstacleKind::Crate,
        ObstacleKind::SpeedBoost,
    ];

    pub fn size(&self) -> Vec2 {
        match self {
            ObstacleKind::Fork | ObstacleKind::Knife | ObstacleKind::WoodLog => {
                Vec2::new(90.0, 100.0)
            }
            ObstacleKind::Pan => Vec2::new(100.0, 110.0),
            ObstacleKind::Jam | ObstacleKind::SpeedBoost => Vec2::new(100.0, 30.0),
            ObstacleKind::Spoon => Vec2::new(50.0, 80.0),
            ObstacleKind::BounceBox => Vec2::new(80.0, 60.0),
            ObstacleKind::Barrel => Vec2::new(60.0, 80.0),
            ObstacleKind::Crate => Vec2::new(70.0, 70.0),
        }
    }

    pub fn class(&self) -> HazardClass {
        match self {
            ObstacleKind::Jam => HazardClass::Debuff,
            ObstacleKind::BounceBox => HazardClass::Bounce,
            ObstacleKind::SpeedBoost => HazardClass::Boost,
            _ => HazardClass::Lethal,
        }
    }

    /// Base (points, xp) for a projectile kill, `None` if shots pass through
    pub fn shot_reward(&self) -> Option<(u32, u32)> {
        match self {
            ObstacleKind::WoodLog => Some((2, 2)),
            ObstacleKind::Barrel | ObstacleKind::Crate => Some((3, 0)),
            _ => None,
        }
    }

    pub fn destructible(&self) -> bool {
        self.shot_reward().is_some()
    }

    /// Probability of spawning disguised at ground level
    pub fn disguise_chance(&self) -> f64 {
        match self {
            ObstacleKind::Fork | ObstacleKind::Knife => 0.3,
            ObstacleKind::Pan => 0.4,
            _ => 0.0,
        }
    }

    /// Spawn height; disguised obstacles sit on the ground line
    fn spawn_y<R: Rng>(&self, rng: &mut R, disguised: bool) -> f32 {
        let h = self.size().y;
        match self {
            ObstacleKind::Fork | ObstacleKind::Knife | ObstacleKind::Pan => {
                if disguised {
                    GROUND_Y
                } else {
                    GROUND_Y - h
                }
            }
            ObstacleKind::Jam => GROUND_Y,
            ObstacleKind::BounceBox | ObstacleKind::SpeedBoost => GROUND_Y - h,
            ObstacleKind::Spoon | ObstacleKind::Crate => GROUND_Y - 200.0 + rng.random::<f32>() * 100.0,
            ObstacleKind::WoodLog => GROUND_Y - 250.0 + rng.random::<f32>() * 200.0,
            ObstacleKind::Barrel => GROUND_Y - 300.0 + rng.random::<f32>() * 150.0,
        }
    }
}

/// An obstacle entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    pub kind: ObstacleKind,
    pub pos: Vec2,
    pub size: Vec2,
    pub motion: Motion,
    /// Present when posing as a ground-level hazard
    pub disguise: Option<Disguise>,
    pub active: bool,
    /// Shot down by a projectile
    pub destroyed: bool,
}

impl Obstacle {
    /// Build an obstacle of `kind` entering at horizontal position `x`
    pub fn spawn<R: Rng>(id: u32, kind: ObstacleKind, x: f32, rng: &mut R) -> Self {
        let size = kind.size();
        let chance = kind.disguise_chance();
        let disguised = chance > 0.0 && rng.random_bool(chance);
        let pos = Vec2::new(x, kind.spawn_y(rng, disguised));
        let motion = Motion::for_kind(kind, pos, size, rng);
        Self {
            id,
            kind,
            pos,
            size,
            motion,
            disguise: disguised.then(Disguise::default),
            active: true,
            destroyed: false,
        }
    }

    /// Nominal bounds
    pub fn bounds(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }

    /// Bounds used against the player
    pub fn hitbox(&self) -> Rect {
        match &self.disguise {
            Some(disguise) => disguise.hitbox(self.pos, self.size),
            None => self.bounds(),
        }
    }

    /// Still in play and not shot down
    pub fn is_live(&self) -> bool {
        self.active && !self.destroyed
    }

    /// Scroll left by `scroll`, then run the kind's own motion
    pub fn update(&mut self, scroll: f32) {
        self.pos.x -= scroll;
        if let Some(disguise) = &mut self.disguise {
            disguise.step();
        }
        self.motion.step(&mut self.pos);
        // Some slack so drifting hazards can wander back on screen
        if self.pos.x + self.size.x < -100.0 {
            self.active = false;
        }
    }
}

/// Collectible types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectibleKind {
    /// Picked up by running through it
    XpOrb,
    /// Bonus item, only collected by shooting it
    Teacup,
}

impl CollectibleKind {
    pub fn size(&self) -> Vec2 {
        match self {
            CollectibleKind::XpOrb => Vec2::splat(74.0),
            CollectibleKind::Teacup => Vec2::splat(60.0),
        }
    }
}

/// A collectible entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collectible {
    pub id: u32,
    pub kind: CollectibleKind,
    pub pos: Vec2,
    pub size: Vec2,
    /// Bounce animation phase (cosmetic)
    pub bounce: f32,
    pub active: bool,
}

impl Collectible {
    pub fn new(id: u32, kind: CollectibleKind, pos: Vec2) -> Self {
        Self {
            id,
            kind,
            pos,
            size: kind.size(),
            bounce: 0.0,
            active: true,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }

    pub fn update(&mut self, scroll: f32) {
        self.pos.x -= scroll;
        self.bounce += 0.08;
        if self.pos.x + self.size.x < 0.0 {
            self.active = false;
        }
    }
}

/// Maximum number of trail points to store
pub const TRAIL_LENGTH: usize = 10;

/// A projectile fired by the player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub pos: Vec2,
    pub size: Vec2,
    pub speed: f32,
    pub active: bool,
    /// Trail history for rendering (oldest first)
    #[serde(skip)]
    pub trail: Vec<Vec2>,
}

impl Projectile {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            size: Vec2::new(PROJECTILE_WIDTH, PROJECTILE_HEIGHT),
            speed: PROJECTILE_SPEED,
            active: true,
            trail: Vec::with_capacity(TRAIL_LENGTH + 1),
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }

    pub fn update(&mut self) {
        self.pos.x += self.speed;
        self.trail.push(self.pos);
        if self.trail.len() > TRAIL_LENGTH {
            self.trail.remove(0);
        }
        if self.pos.x > FIELD_WIDTH {
            self.active = false;
        }
    }
}

/// Complete state of one run
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// Spawner randomness
    pub rng: Pcg32,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub phase: GamePhase,
    pub score: u32,
    pub xp: u32,
    pub level: u32,
    /// Level speed, before boost and debuff
    pub speed: f32,
    pub boost_active: bool,
    pub boost_ticks: u32,
    /// Highest speed tier announced so far this run
    pub speed_tier: u32,
    pub player: Player,
    /// Active obstacles, in spawn order
    pub obstacles: Vec<Obstacle>,
    pub collectibles: Vec<Collectible>,
    pub projectiles: Vec<Projectile>,
    pub events: EventLog,
    /// Tick of the last obstacle spawn attempt
    pub last_obstacle_spawn: u64,
    /// Tick of the last collectible spawn attempt
    pub last_collectible_spawn: u64,
    /// Autopilot fire cooldown
    pub autopilot_cooldown: u32,
    next_id: u32,
}

impl GameState {
    /// Create a new run with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            time_ticks: 0,
            phase: GamePhase::Playing,
            score: 0,
            xp: 0,
            level: 1,
            speed: BASE_SPEED,
            boost_active: false,
            boost_ticks: 0,
            speed_tier: 1,
            player: Player::default(),
            obstacles: Vec::new(),
            collectibles: Vec::new(),
            projectiles: Vec::new(),
            events: EventLog::new(),
            last_obstacle_spawn: 0,
            last_collectible_spawn: 0,
            autopilot_cooldown: 0,
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn is_running(&self) -> bool {
        self.phase == GamePhase::Playing
    }

    /// End the run; later ticks are no-ops
    pub fn stop(&mut self) {
        if self.is_running() {
            log::info!(
                "Run over at tick {}: score={} xp={} level={}",
                self.time_ticks,
                self.score,
                self.xp,
                self.level
            );
        }
        self.phase = GamePhase::GameOver;
    }

    /// Per-tick obstacle scroll distance
    pub fn obstacle_scroll(&self) -> f32 {
        let boost = if self.boost_active {
            OBSTACLE_BOOST_MULTIPLIER
        } else {
            1.0
        };
        self.speed * boost * self.player.speed_debuff
    }

    /// Per-tick collectible scroll distance
    pub fn collectible_scroll(&self) -> f32 {
        let boost = if self.boost_active {
            COLLECTIBLE_BOOST_MULTIPLIER
        } else {
            1.0
        };
        self.speed * boost * self.player.speed_debuff
    }

    /// Background scroll speed, for the renderer
    pub fn background_speed(&self) -> f32 {
        super::progression::world_speed(self.level, self.boost_active)
    }

    /// Package the finished run for submission
    pub fn summary(&self, nickname: &str, timestamp: u64) -> RunSummary {
        RunSummary {
            nickname: nickname.to_string(),
            score: i64::from(self.score),
            xp: i64::from(self.xp),
            level: i64::from(self.level),
            game_time: self.time_ticks,
            events: self.events.clone(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state() {
        let state = GameState::new(7);
        assert_eq!(state.time_ticks, 0);
        assert_eq!(state.level, 1);
        assert_eq!(state.speed, BASE_SPEED);
        assert!(state.is_running());
        assert_eq!(state.player.pos.y, GROUND_Y);
        assert!(state.events.is_empty());
    }

    #[test]
    fn test_scroll_multipliers_stay_distinct() {
        let mut state = GameState::new(1);
        assert_eq!(state.obstacle_scroll(), BASE_SPEED);
        assert_eq!(state.collectible_scroll(), BASE_SPEED);

        state.boost_active = true;
        assert!((state.obstacle_scroll() - BASE_SPEED * 1.3).abs() < 1e-5);
        assert!((state.collectible_scroll() - BASE_SPEED * 1.5).abs() < 1e-5);
        assert!((state.background_speed() - BASE_SPEED * 2.0).abs() < 1e-5);

        state.player.speed_debuff = DEBUFF_MULTIPLIER;
        assert!((state.obstacle_scroll() - BASE_SPEED * 1.3 * 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_disguised_spawns_use_fixed_hitbox() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut seen = false;
        for id in 0..200 {
            let obstacle = Obstacle::spawn(id, ObstacleKind::Pan, 1200.0, &mut rng);
            if obstacle.disguise.is_some() {
                seen = true;
                assert_eq!(obstacle.pos.y, GROUND_Y);
                assert_eq!(obstacle.hitbox().size, Vec2::splat(80.0));
                assert_ne!(obstacle.hitbox(), obstacle.bounds());
            } else {
                assert_eq!(obstacle.hitbox(), obstacle.bounds());
            }
        }
        assert!(seen);
    }

    #[test]
    fn test_only_ground_kinds_disguise() {
        let mut rng = Pcg32::seed_from_u64(11);
        for id in 0..100 {
            let obstacle = Obstacle::spawn(id, ObstacleKind::WoodLog, 1200.0, &mut rng);
            assert!(obstacle.disguise.is_none());
            assert!(obstacle.kind.destructible());
        }
    }

    #[test]
    fn test_obstacle_retires_off_trailing_edge() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut obstacle = Obstacle::spawn(1, ObstacleKind::Jam, 0.0, &mut rng);
        obstacle.update(250.0);
        assert!(!obstacle.active);
    }

    #[test]
    fn test_projectile_trail_capped() {
        let mut projectile = Projectile::new(Vec2::new(0.0, 100.0));
        for _ in 0..50 {
            projectile.update();
        }
        assert_eq!(projectile.trail.len(), TRAIL_LENGTH);
        assert!(projectile.active);

        for _ in 0..200 {
            projectile.update();
        }
        assert!(!projectile.active);
    }
}
