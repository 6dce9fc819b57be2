//! Collision detection and resolution
//!
//! Everything in the runner is an axis-aligned box. Detection is plain AABB
//! overlap; the interesting part is resolution, which turns each overlap
//! into score, xp, player state changes and logged events.

use glam::Vec2;

use super::events::EventKind;
use super::state::{CollectibleKind, GameState, HazardClass};
use crate::consts::*;

/// Axis-aligned box in screen space (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Top-left corner
    pub min: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    pub fn from_pos_size(pos: Vec2, size: Vec2) -> Self {
        Self { min: pos, size }
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    /// Strict overlap; touching edges do not count
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        let a_max = self.max();
        let b_max = other.max();
        self.min.x < b_max.x && a_max.x > other.min.x && self.min.y < b_max.y && a_max.y > other.min.y
    }

    /// Grow by `margin` on every side
    pub fn expand(&self, margin: f32) -> Rect {
        Rect {
            min: self.min - Vec2::splat(margin),
            size: self.size + Vec2::splat(margin * 2.0),
        }
    }

    /// Grow by `margin` on the left and right only
    pub fn expand_x(&self, margin: f32) -> Rect {
        Rect {
            min: self.min - Vec2::new(margin, 0.0),
            size: self.size + Vec2::new(margin * 2.0, 0.0),
        }
    }
}

/// Resolve all overlaps for this tick, in a fixed order
///
/// A lethal hit ends the run immediately; nothing after it is resolved.
pub fn resolve_collisions(state: &mut GameState) {
    if player_vs_obstacles(state) {
        state.stop();
        return;
    }
    player_vs_collectibles(state);
    projectiles_vs_targets(state);
}

/// Returns true if the player touched a lethal obstacle
fn player_vs_obstacles(state: &mut GameState) -> bool {
    let now = state.time_ticks;
    let player_box = state.player.bounds();

    for i in 0..state.obstacles.len() {
        let obstacle = &state.obstacles[i];
        if !obstacle.is_live() || !obstacle.hitbox().intersects(&player_box) {
            continue;
        }
        let kind = obstacle.kind;

        match kind.class() {
            HazardClass::Lethal => {
                log::info!("Player hit {:?} at tick {}", kind, now);
                return true;
            }
            HazardClass::Debuff => {
                state.player.apply_debuff();
                state.obstacles[i].active = false;
            }
            HazardClass::Bounce => {
                // Pad stays so it can be reused
                state.player.bounce();
            }
            HazardClass::Boost => {
                state.boost_active = true;
                state.boost_ticks = BOOST_TICKS;
                state.obstacles[i].active = false;
                state.events.push(EventKind::SpeedboostCollected, now);
                log::info!(
                    "Speed boost at tick {}: world x{}, obstacles x{}, collectibles x{}",
                    now,
                    BACKGROUND_BOOST_MULTIPLIER,
                    OBSTACLE_BOOST_MULTIPLIER,
                    COLLECTIBLE_BOOST_MULTIPLIER
                );
            }
        }
    }
    false
}

fn player_vs_collectibles(state: &mut GameState) {
    let now = state.time_ticks;
    let player_box = state.player.bounds();

    for collectible in &mut state.collectibles {
        // Bonus items only fall to projectiles
        if !collectible.active || collectible.kind != CollectibleKind::XpOrb {
            continue;
        }
        if collectible.bounds().intersects(&player_box) {
            collectible.active = false;
            state.score += XP_ORB_POINTS;
            state.xp += XP_ORB_POINTS;
            state.events.push(EventKind::CollectXp, now);
            log::debug!("Collected xp orb: score={} xp={}", state.score, state.xp);
        }
    }
}

fn projectiles_vs_targets(state: &mut GameState) {
    let now = state.time_ticks;
    let boost_factor = if state.boost_active { 2 } else { 1 };

    for projectile in &mut state.projectiles {
        if !projectile.active {
            continue;
        }
        let shot = projectile.bounds();

        if let Some(obstacle) = state
            .obstacles
            .iter_mut()
            .find(|o| o.is_live() && o.kind.destructible() && o.bounds().intersects(&shot))
        {
            let Some((points, xp)) = obstacle.kind.shot_reward() else {
                continue;
            };
            obstacle.destroyed = true;
            obstacle.active = false;
            projectile.active = false;
            state.score += points * boost_factor;
            state.xp += xp;
            log::debug!(
                "Shot {:?}: +{} points, +{} xp, score={}",
                obstacle.kind,
                points * boost_factor,
                xp,
                state.score
            );
            continue;
        }

        // Both sides scroll fast, so the bonus item gets a wider window
        if let Some(teacup) = state.collectibles.iter_mut().find(|c| {
            c.active
                && c.kind == CollectibleKind::Teacup
                && c.bounds().expand_x(TEACUP_HIT_MARGIN).intersects(&shot)
        }) {
            teacup.active = false;
            projectile.active = false;
            state.score += TEACUP_POINTS * boost_factor;
            state.xp += TEACUP_XP * boost_factor;
            state.events.push(EventKind::HitTeacup, now);
            log::debug!("Hit teacup: score={} xp={}", state.score, state.xp);
        }
    }
}
