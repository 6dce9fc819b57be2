//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use glam::Vec2;

use super::collision::resolve_collisions;
use super::events::EventKind;
use super::state::{CollectibleKind, GameState, HazardClass, Projectile};
use super::{progression, spawner};
use crate::consts::*;

/// Minimum ticks between autopilot shots
const AUTOPILOT_FIRE_COOLDOWN: u32 = 30;
/// How far ahead the autopilot looks for something to shoot
const AUTOPILOT_FIRE_RANGE: f32 = 600.0;
/// Ticks of warning the autopilot wants before a ground hazard arrives
const AUTOPILOT_JUMP_LEAD: f32 = 12.0;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Jump, or double jump while airborne
    pub jump: bool,
    /// Fire a projectile
    pub shoot: bool,
    /// Idle/demo mode - AI plays the game
    pub autopilot: bool,
}

/// Advance the game state by one tick
pub fn tick(state: &mut GameState, input: &TickInput) {
    if !state.is_running() {
        return;
    }

    state.time_ticks += 1;
    let now = state.time_ticks;

    let mut input = input.clone();
    if input.autopilot {
        autopilot(state, &mut input);
    }

    if input.jump {
        if let Some(kind) = state.player.jump() {
            state.events.push(kind, now);
        }
    }

    if input.shoot {
        let player = &state.player;
        let muzzle = Vec2::new(player.pos.x + player.size.x, player.pos.y + player.size.y / 2.0);
        state.projectiles.push(Projectile::new(muzzle));
        state.events.push(EventKind::Shoot, now);
    }

    spawner::update(state);

    state.player.update();
    for projectile in &mut state.projectiles {
        projectile.update();
    }
    let obstacle_scroll = state.obstacle_scroll();
    for obstacle in &mut state.obstacles {
        obstacle.update(obstacle_scroll);
    }
    let collectible_scroll = state.collectible_scroll();
    for collectible in &mut state.collectibles {
        collectible.update(collectible_scroll);
    }

    state.projectiles.retain(|p| p.active);
    state.obstacles.retain(|o| o.active);
    state.collectibles.retain(|c| c.active);

    resolve_collisions(state);
    if !state.is_running() {
        return;
    }

    progression::update(state);
}

/// Fill in jump/shoot decisions for demo play
///
/// Jumps over ground-lane hazards shortly before they arrive and shoots at
/// targets crossing the muzzle line. Shots are rate limited so a demo run
/// stays within what a human could do.
fn autopilot(state: &mut GameState, input: &mut TickInput) {
    state.autopilot_cooldown = state.autopilot_cooldown.saturating_sub(1);

    let player = &state.player;
    let front = player.pos.x + player.size.x;
    let lane_top = GROUND_Y;
    let lane_bottom = GROUND_Y + player.size.y;
    let lookahead = state.obstacle_scroll() * AUTOPILOT_JUMP_LEAD;

    let threat = state.obstacles.iter().any(|o| {
        if !o.is_live() || !matches!(o.kind.class(), HazardClass::Lethal | HazardClass::Debuff) {
            return false;
        }
        let hitbox = o.hitbox();
        let gap = hitbox.min.x - front;
        hitbox.max().y > lane_top && hitbox.min.y < lane_bottom && (0.0..=lookahead).contains(&gap)
    });

    if threat && player.is_grounded() {
        input.jump = true;
    } else if threat && player.vel_y > 0.0 {
        // Falling back into the hazard: spend the double jump
        input.jump = true;
    }

    if state.autopilot_cooldown > 0 {
        return;
    }

    let shot_top = player.pos.y + player.size.y / 2.0;
    let shot_bottom = shot_top + PROJECTILE_HEIGHT;
    let in_line = |min_x: f32, min_y: f32, max_y: f32| {
        min_x > front && min_x - front < AUTOPILOT_FIRE_RANGE && min_y < shot_bottom && max_y > shot_top
    };

    let obstacle_target = state.obstacles.iter().any(|o| {
        let b = o.bounds();
        o.is_live() && o.kind.destructible() && in_line(b.min.x, b.min.y, b.max().y)
    });
    let teacup_target = state.collectibles.iter().any(|c| {
        let b = c.bounds();
        c.active && c.kind == CollectibleKind::Teacup && in_line(b.min.x, b.min.y, b.max().y)
    });

    if obstacle_target || teacup_target {
        input.shoot = true;
        state.autopilot_cooldown = AUTOPILOT_FIRE_COOLDOWN;
    }
}
