//! Timed entity spawning
//!
//! Two independent timers gate obstacle and collectible spawn attempts. The
//! timer restarts on every attempt, so a skipped attempt (cap reached, too
//! close, no safe spot) waits a full delay before the next try.

use glam::Vec2;
use rand::Rng;

use super::collision::Rect;
use super::state::{Collectible, CollectibleKind, GameState, Obstacle, ObstacleKind};
use crate::consts::*;

/// Base obstacle delay before level reduction
const OBSTACLE_BASE_DELAY: u64 = 120;
const OBSTACLE_DELAY_STEP: u64 = 15;
const OBSTACLE_MIN_DELAY: u64 = 60;
pub const MAX_OBSTACLES: usize = 3;
/// The newest obstacle must have scrolled this far in before another enters
const OBSTACLE_SPACING: f32 = 400.0;
/// Random extra offset past the right edge for new entities
const SPAWN_JITTER: f32 = 200.0;

const COLLECTIBLE_BASE_DELAY: u64 = 60;
const COLLECTIBLE_DELAY_STEP: u64 = 10;
const COLLECTIBLE_MIN_DELAY: u64 = 50;
pub const MAX_COLLECTIBLES: usize = 6;
const XP_ORB_CHANCE: f64 = 0.55;

/// Collectible placement is checked with this box against padded obstacles
const SAFETY_BOX: f32 = 60.0;
const SAFETY_MARGIN: f32 = 30.0;
pub const PLACEMENT_ATTEMPTS: u32 = 10;

/// Obstacle weights, in `ObstacleKind::ALL` order
const OBSTACLE_WEIGHTS: [u32; 10] = [15, 15, 12, 8, 8, 12, 10, 7, 5, 10];
/// Late-game weights favour pans and the ground rollers
const OBSTACLE_WEIGHTS_LATE: [u32; 10] = [12, 12, 15, 8, 8, 12, 12, 9, 7, 12];
const LATE_GAME_LEVEL: u32 = 4;

pub fn obstacle_delay(level: u32) -> u64 {
    OBSTACLE_BASE_DELAY
        .saturating_sub(u64::from(level) * OBSTACLE_DELAY_STEP)
        .max(OBSTACLE_MIN_DELAY)
}

pub fn collectible_delay(level: u32) -> u64 {
    COLLECTIBLE_BASE_DELAY
        .saturating_sub(u64::from(level) * COLLECTIBLE_DELAY_STEP)
        .max(COLLECTIBLE_MIN_DELAY)
}

pub fn obstacle_weights(level: u32) -> &'static [u32; 10] {
    if level >= LATE_GAME_LEVEL {
        &OBSTACLE_WEIGHTS_LATE
    } else {
        &OBSTACLE_WEIGHTS
    }
}

/// Weighted draw; falls back to the first entry if rounding runs past the end
pub fn weighted_pick<T: Copy, R: Rng>(items: &[T], weights: &[u32], rng: &mut R) -> T {
    let total: u32 = weights.iter().sum();
    let mut roll = rng.random::<f32>() * total as f32;
    for (item, &weight) in items.iter().zip(weights) {
        roll -= weight as f32;
        if roll <= 0.0 {
            return *item;
        }
    }
    items[0]
}

/// Run both spawn timers for this tick
pub fn update(state: &mut GameState) {
    let now = state.time_ticks;

    if now - state.last_obstacle_spawn > obstacle_delay(state.level) {
        try_spawn_obstacle(state);
        state.last_obstacle_spawn = now;
    }

    if now - state.last_collectible_spawn > collectible_delay(state.level) {
        try_spawn_collectible(state);
        state.last_collectible_spawn = now;
    }
}

fn try_spawn_obstacle(state: &mut GameState) {
    // Obstacles consumed or shot this tick are not retired until after the spawner
    if state.obstacles.iter().filter(|o| o.is_live()).count() >= MAX_OBSTACLES {
        return;
    }
    if let Some(last) = state.obstacles.iter().rev().find(|o| o.is_live()) {
        if last.pos.x > FIELD_WIDTH - OBSTACLE_SPACING {
            return;
        }
    }

    let kind = weighted_pick(&ObstacleKind::ALL, obstacle_weights(state.level), &mut state.rng);
    let x = FIELD_WIDTH + state.rng.random::<f32>() * SPAWN_JITTER;
    let id = state.next_entity_id();
    let obstacle = Obstacle::spawn(id, kind, x, &mut state.rng);
    log::debug!(
        "Spawned {:?} #{} at ({:.0}, {:.0}){}",
        kind,
        id,
        obstacle.pos.x,
        obstacle.pos.y,
        if obstacle.disguise.is_some() { " disguised" } else { "" }
    );
    state.obstacles.push(obstacle);
}

fn try_spawn_collectible(state: &mut GameState) {
    if state.collectibles.len() >= MAX_COLLECTIBLES {
        return;
    }

    let kind = if state.rng.random_bool(XP_ORB_CHANCE) {
        CollectibleKind::XpOrb
    } else {
        CollectibleKind::Teacup
    };

    match place_collectible(&mut state.rng, kind, &state.obstacles) {
        Some(pos) => {
            let id = state.next_entity_id();
            state.collectibles.push(Collectible::new(id, kind, pos));
        }
        None => log::debug!("No safe spot for {:?} at tick {}", kind, state.time_ticks),
    }
}

fn candidate<R: Rng>(rng: &mut R, kind: CollectibleKind) -> Vec2 {
    let x = FIELD_WIDTH + rng.random::<f32>() * SPAWN_JITTER;
    let y = match kind {
        CollectibleKind::XpOrb => {
            // Mostly on the running line, sometimes a short hop up
            if rng.random_bool(0.8) {
                GROUND_Y - 35.0
            } else {
                GROUND_Y - 90.0
            }
        }
        CollectibleKind::Teacup => 150.0 + rng.random::<f32>() * 200.0,
    };
    Vec2::new(x, y)
}

fn is_safe(pos: Vec2, obstacles: &[Obstacle]) -> bool {
    let probe = Rect::from_pos_size(pos, Vec2::splat(SAFETY_BOX));
    obstacles
        .iter()
        .filter(|o| o.is_live())
        .all(|o| !o.bounds().expand(SAFETY_MARGIN).intersects(&probe))
}

/// Find a spot clear of every live obstacle, or `None` after the attempt budget
pub fn place_collectible<R: Rng>(
    rng: &mut R,
    kind: CollectibleKind,
    obstacles: &[Obstacle],
) -> Option<Vec2> {
    (0..PLACEMENT_ATTEMPTS)
        .map(|_| candidate(rng, kind))
        .find(|&pos| is_safe(pos, obstacles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::behavior::Motion;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn fixed_obstacle(id: u32, kind: ObstacleKind, pos: Vec2, size: Vec2) -> Obstacle {
        Obstacle {
            id,
            kind,
            pos,
            size,
            motion: Motion::Fixed,
            disguise: None,
            active: true,
            destroyed: false,
        }
    }

    #[test]
    fn test_delays_shrink_with_level_to_a_floor() {
        assert_eq!(obstacle_delay(1), 105);
        assert_eq!(obstacle_delay(4), 60);
        assert_eq!(obstacle_delay(9), 60);
        assert_eq!(collectible_delay(1), 50);
        assert_eq!(collectible_delay(4), 50);
    }

    #[test]
    fn test_weight_tables() {
        assert_eq!(obstacle_weights(3)[ObstacleKind::ALL.len() - 1], 10);
        assert_eq!(obstacle_weights(4)[2], 15);
        assert_eq!(obstacle_weights(3).len(), ObstacleKind::ALL.len());
    }

    #[test]
    fn test_weighted_pick_respects_zero_weights() {
        let mut rng = Pcg32::seed_from_u64(9);
        let items = ['a', 'b', 'c'];
        for _ in 0..500 {
            assert_eq!(weighted_pick(&items, &[0, 5, 0], &mut rng), 'b');
        }
    }

    #[test]
    fn test_first_obstacle_after_delay() {
        let mut state = GameState::new(42);
        let delay = obstacle_delay(state.level);
        for t in 1..=delay {
            state.time_ticks = t;
            update(&mut state);
        }
        assert!(state.obstacles.is_empty());

        state.time_ticks = delay + 1;
        update(&mut state);
        assert_eq!(state.obstacles.len(), 1);
        assert!(state.obstacles[0].pos.x >= FIELD_WIDTH);
        assert_eq!(state.last_obstacle_spawn, delay + 1);
    }

    #[test]
    fn test_obstacle_cap_and_spacing() {
        let mut state = GameState::new(1);
        let size = Vec2::splat(50.0);
        state
            .obstacles
            .push(fixed_obstacle(1, ObstacleKind::Pan, Vec2::new(FIELD_WIDTH - 100.0, GROUND_Y), size));

        // Newest obstacle still too close to the right edge
        try_spawn_obstacle(&mut state);
        assert_eq!(state.obstacles.len(), 1);

        state.obstacles[0].pos.x = 100.0;
        try_spawn_obstacle(&mut state);
        assert_eq!(state.obstacles.len(), 2);

        state.obstacles.truncate(1);
        for id in 2..=3 {
            state
                .obstacles
                .push(fixed_obstacle(id, ObstacleKind::Pan, Vec2::new(100.0, GROUND_Y), size));
        }
        try_spawn_obstacle(&mut state);
        assert_eq!(state.obstacles.len(), MAX_OBSTACLES);
    }

    #[test]
    fn test_spent_obstacles_do_not_hold_spawn_slots() {
        let mut state = GameState::new(3);
        let size = Vec2::splat(50.0);
        for id in 0..MAX_OBSTACLES as u32 {
            state
                .obstacles
                .push(fixed_obstacle(id, ObstacleKind::Pan, Vec2::new(100.0, GROUND_Y), size));
        }
        // Newest one was shot down right at the spawn edge
        let last = MAX_OBSTACLES - 1;
        state.obstacles[last].pos.x = FIELD_WIDTH - 50.0;
        state.obstacles[last].destroyed = true;

        try_spawn_obstacle(&mut state);
        assert_eq!(state.obstacles.len(), MAX_OBSTACLES + 1);
        assert!(state.obstacles.last().is_some_and(|o| o.is_live()));

        // Three live obstacles fill the cap again
        state.obstacles[MAX_OBSTACLES].pos.x = 100.0;
        try_spawn_obstacle(&mut state);
        assert_eq!(state.obstacles.len(), MAX_OBSTACLES + 1);
    }

    #[test]
    fn test_timer_restarts_on_skipped_attempt() {
        let mut state = GameState::new(1);
        for id in 0..MAX_OBSTACLES as u32 {
            state.obstacles.push(fixed_obstacle(
                id,
                ObstacleKind::Pan,
                Vec2::new(100.0, GROUND_Y),
                Vec2::splat(50.0),
            ));
        }
        state.time_ticks = 500;
        update(&mut state);
        assert_eq!(state.obstacles.len(), MAX_OBSTACLES);
        assert_eq!(state.last_obstacle_spawn, 500);
    }

    #[test]
    fn test_blocked_field_skips_collectible_cycle() {
        // One huge obstacle covering every candidate position
        let wall = fixed_obstacle(
            1,
            ObstacleKind::Crate,
            Vec2::new(FIELD_WIDTH - 100.0, 0.0),
            Vec2::new(600.0, FIELD_HEIGHT),
        );
        let mut rng = Pcg32::seed_from_u64(4);
        for kind in [CollectibleKind::XpOrb, CollectibleKind::Teacup] {
            assert_eq!(place_collectible(&mut rng, kind, std::slice::from_ref(&wall)), None);
        }

        let mut state = GameState::new(4);
        state.obstacles.push(wall);
        try_spawn_collectible(&mut state);
        assert!(state.collectibles.is_empty());
    }

    #[test]
    fn test_destroyed_obstacles_do_not_block() {
        let mut wall = fixed_obstacle(
            1,
            ObstacleKind::Crate,
            Vec2::new(FIELD_WIDTH - 100.0, 0.0),
            Vec2::new(600.0, FIELD_HEIGHT),
        );
        wall.destroyed = true;
        let mut rng = Pcg32::seed_from_u64(4);
        assert!(place_collectible(&mut rng, CollectibleKind::XpOrb, &[wall]).is_some());
    }

    #[test]
    fn test_collectible_cap() {
        let mut state = GameState::new(8);
        for id in 0..MAX_COLLECTIBLES as u32 {
            state.collectibles.push(Collectible::new(
                id,
                CollectibleKind::XpOrb,
                Vec2::new(600.0, GROUND_Y - 35.0),
            ));
        }
        try_spawn_collectible(&mut state);
        assert_eq!(state.collectibles.len(), MAX_COLLECTIBLES);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn placed_collectibles_clear_all_obstacles(
                seed in any::<u64>(),
                spots in proptest::collection::vec((1000.0f32..1500.0, 100.0f32..560.0), 0..3),
            ) {
                let obstacles: Vec<Obstacle> = spots
                    .iter()
                    .enumerate()
                    .map(|(i, &(x, y))| {
                        fixed_obstacle(i as u32, ObstacleKind::Crate, Vec2::new(x, y), Vec2::splat(70.0))
                    })
                    .collect();
                let mut rng = Pcg32::seed_from_u64(seed);
                for kind in [CollectibleKind::XpOrb, CollectibleKind::Teacup] {
                    if let Some(pos) = place_collectible(&mut rng, kind, &obstacles) {
                        let probe = Rect::from_pos_size(pos, Vec2::splat(SAFETY_BOX));
                        for o in &obstacles {
                            prop_assert!(!o.bounds().expand(SAFETY_MARGIN).intersects(&probe));
                        }
                    }
                }
            }

            #[test]
            fn spawner_never_exceeds_caps(seed in any::<u64>(), ticks in 1u64..3000) {
                let mut state = GameState::new(seed);
                for t in 1..=ticks {
                    state.time_ticks = t;
                    update(&mut state);
                    prop_assert!(state.obstacles.len() <= MAX_OBSTACLES);
                    prop_assert!(state.collectibles.len() <= MAX_COLLECTIBLES);
                }
            }
        }
    }
}
