//! Per-kind entity motion rules
//!
//! Each obstacle carries a `Motion` chosen at spawn time. The variant holds
//! all of that kind's kinematic parameters, and `Motion::step` is the single
//! dispatch point. Scrolling is applied separately by the frame loop, so
//! these rules only describe the entity's own movement.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use super::state::ObstacleKind;
use crate::consts::*;

/// Spoon float center and travel
const FLOAT_CENTER_Y: f32 = GROUND_Y - 180.0;
const FLOAT_RANGE: f32 = 150.0;
const FLOAT_STEP: f32 = 2.0;
const SPOON_SPIN: f32 = 0.02;

/// Disguised obstacles use a fixed 80x80 hitbox sitting on the ground
pub const DISGUISE_SIZE: f32 = 80.0;
/// Disguise animation flips every half second
pub const DISGUISE_FRAME_TICKS: u32 = 30;

/// Horizontal back-and-forth drift, tracked as an offset from spawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Drift {
    pub speed: f32,
    pub range: f32,
    pub offset: f32,
}

impl Drift {
    fn new(speed: f32, range: f32) -> Self {
        Self {
            speed,
            range,
            offset: 0.0,
        }
    }

    fn step(&mut self, pos: &mut Vec2) {
        pos.x += self.speed;
        self.offset += self.speed;
        if self.offset.abs() > self.range {
            self.speed = -self.speed;
        }
    }
}

/// Vertical bob around a spawn height with hard clamps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bob {
    pub origin_y: f32,
    pub speed: f32,
    pub range: f32,
    /// Lowest allowed top edge
    pub floor: f32,
}

impl Bob {
    fn step(&mut self, pos: &mut Vec2) {
        pos.y += self.speed;
        if (pos.y - self.origin_y).abs() > self.range {
            self.speed = -self.speed;
        }
        if pos.y < CEILING_Y {
            pos.y = CEILING_Y;
            self.speed = self.speed.abs();
        }
        if pos.y > self.floor {
            pos.y = self.floor;
            self.speed = -self.speed.abs();
        }
    }
}

/// Motion rule with its spawn-time parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Motion {
    /// Only scrolls
    Fixed,
    /// Fork: vertical bob
    Bob(Bob),
    /// Knife: horizontal drift
    Drift(Drift),
    /// Spoon: steady float with spin, sometimes drifting
    Float {
        direction: f32,
        rotation: f32,
        drift: Option<Drift>,
    },
    /// Wood log: bobbing while spinning
    Tumble { bob: Bob, rotation: f32, spin: f32 },
    /// Barrel: drift with a rolling bounce phase
    Roll { drift: Drift, phase: f32 },
    /// Crate: sinusoidal lateral sway
    Sway { phase: f32, rate: f32, amount: f32 },
    /// Speed boost pad: glow ping-pong in [0, 1]
    Glow { level: f32, direction: f32 },
}

fn random_sign<R: Rng>(rng: &mut R) -> f32 {
    if rng.random_bool(0.5) { 1.0 } else { -1.0 }
}

/// Uniform value in [base, base + span)
fn spread<R: Rng>(rng: &mut R, base: f32, span: f32) -> f32 {
    base + rng.random::<f32>() * span
}

impl Motion {
    /// Roll the kinematic parameters for a freshly spawned obstacle
    pub fn for_kind<R: Rng>(kind: ObstacleKind, pos: Vec2, size: Vec2, rng: &mut R) -> Self {
        match kind {
            ObstacleKind::Fork => {
                if rng.random_bool(0.5) {
                    Motion::Bob(Bob {
                        origin_y: pos.y,
                        speed: spread(rng, 1.0, 2.0) * random_sign(rng),
                        range: 100.0,
                        floor: GROUND_Y,
                    })
                } else {
                    Motion::Fixed
                }
            }
            ObstacleKind::Knife => {
                if rng.random_bool(0.4) {
                    let speed = spread(rng, 0.5, 1.0) * random_sign(rng);
                    Motion::Drift(Drift::new(speed, 80.0))
                } else {
                    Motion::Fixed
                }
            }
            ObstacleKind::Spoon => {
                let drift = if rng.random_bool(0.6) {
                    let speed = spread(rng, 0.5, 1.5) * random_sign(rng);
                    Some(Drift::new(speed, 100.0))
                } else {
                    None
                };
                Motion::Float {
                    direction: 1.0,
                    rotation: 0.0,
                    drift,
                }
            }
            ObstacleKind::WoodLog => {
                let spin = (rng.random::<f32>() - 0.5) * 0.1;
                Motion::Tumble {
                    bob: Bob {
                        origin_y: pos.y,
                        speed: spread(rng, 0.5, 1.5) * random_sign(rng),
                        range: 120.0,
                        floor: GROUND_Y - size.y,
                    },
                    rotation: 0.0,
                    spin,
                }
            }
            ObstacleKind::Barrel => {
                let speed = spread(rng, 1.0, 2.0) * random_sign(rng);
                Motion::Roll {
                    drift: Drift::new(speed, 150.0),
                    phase: 0.0,
                }
            }
            ObstacleKind::Crate => Motion::Sway {
                phase: 0.0,
                rate: spread(rng, 0.02, 0.05),
                amount: spread(rng, 10.0, 20.0),
            },
            ObstacleKind::SpeedBoost => Motion::Glow {
                level: 0.0,
                direction: 1.0,
            },
            ObstacleKind::Pan | ObstacleKind::Jam | ObstacleKind::BounceBox => Motion::Fixed,
        }
    }

    /// Advance one tick of the entity's own movement
    pub fn step(&mut self, pos: &mut Vec2) {
        match self {
            Motion::Fixed => {}
            Motion::Bob(bob) => bob.step(pos),
            Motion::Drift(drift) => drift.step(pos),
            Motion::Float {
                direction,
                rotation,
                drift,
            } => {
                if let Some(drift) = drift {
                    drift.step(pos);
                }
                pos.y += *direction * FLOAT_STEP;
                let half = FLOAT_RANGE / 2.0;
                if pos.y > FLOAT_CENTER_Y + half || pos.y < FLOAT_CENTER_Y - half {
                    *direction = -*direction;
                }
                *rotation = wrap_turn(*rotation + SPOON_SPIN);
            }
            Motion::Tumble {
                bob,
                rotation,
                spin,
            } => {
                *rotation += *spin;
                bob.step(pos);
            }
            Motion::Roll { drift, phase } => {
                *phase += 0.1;
                drift.step(pos);
            }
            Motion::Sway {
                phase,
                rate,
                amount,
            } => {
                *phase += *rate;
                pos.x += phase.sin() * *amount * 0.1;
            }
            Motion::Glow { level, direction } => {
                *level += *direction * 0.05;
                if *level > 1.0 {
                    *level = 1.0;
                    *direction = -1.0;
                } else if *level < 0.0 {
                    *level = 0.0;
                    *direction = 1.0;
                }
            }
        }
    }

    /// Current rotation for rendering (radians)
    pub fn rotation(&self) -> f32 {
        match self {
            Motion::Float { rotation, .. } | Motion::Tumble { rotation, .. } => *rotation,
            _ => 0.0,
        }
    }

    /// Current glow intensity for effect pads
    pub fn glow(&self) -> f32 {
        match self {
            Motion::Glow { level, .. } => *level,
            _ => 0.0,
        }
    }
}

fn wrap_turn(angle: f32) -> f32 {
    if angle > std::f32::consts::TAU {
        angle - std::f32::consts::TAU
    } else {
        angle
    }
}

/// Ground-level disguise: swaps hitbox and look, never the motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Disguise {
    /// 0 = closed mouth, 1 = open mouth
    pub frame: u8,
    timer: u32,
}

impl Disguise {
    pub fn step(&mut self) {
        self.timer += 1;
        if self.timer >= DISGUISE_FRAME_TICKS {
            self.frame = (self.frame + 1) % 2;
            self.timer = 0;
        }
    }

    /// Fixed-size box centered under the obstacle, sitting on the ground
    pub fn hitbox(&self, pos: Vec2, size: Vec2) -> Rect {
        Rect::new(
            pos.x + (size.x - DISGUISE_SIZE) / 2.0,
            GROUND_Y - DISGUISE_SIZE + 10.0,
            DISGUISE_SIZE,
            DISGUISE_SIZE,
        )
    }
}
