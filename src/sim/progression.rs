//! Score → level → speed progression
//!
//! The level table here is shared with the replay validator; both sides must
//! agree on every boundary.

use super::events::EventKind;
use super::state::GameState;
use crate::consts::*;

/// Minimum score for each level, ascending; the last tier is open-ended
pub const LEVEL_THRESHOLDS: [u64; 4] = [0, 100, 200, 300];
/// Highest level the table can produce
pub const MAX_LEVEL: u32 = LEVEL_THRESHOLDS.len() as u32;

/// Level for a cumulative score (1-based)
pub fn level_for_score(score: u64) -> u32 {
    LEVEL_THRESHOLDS.iter().filter(|&&t| score >= t).count() as u32
}

/// Level speed: base at level 1, then a fixed step and compounding growth
pub fn speed_for_level(level: u32) -> f32 {
    if level <= 1 {
        BASE_SPEED
    } else {
        BASE_SPEED * LEVEL_TWO_SPEED_FACTOR * SPEED_GROWTH_PER_LEVEL.powi(level as i32 - 2)
    }
}

/// Background scroll speed with the boost applied
pub fn world_speed(level: u32, boost_active: bool) -> f32 {
    let boost = if boost_active {
        BACKGROUND_BOOST_MULTIPLIER
    } else {
        1.0
    };
    speed_for_level(level) * boost
}

/// Per-tick progression: boost countdown, then level and speed from score
pub fn update(state: &mut GameState) {
    let now = state.time_ticks;

    if state.boost_active {
        state.boost_ticks = state.boost_ticks.saturating_sub(1);
        if state.boost_ticks == 0 {
            state.boost_active = false;
            log::info!("Speed boost ended at tick {}", now);
        }
    }

    let old_level = state.level;
    state.level = level_for_score(u64::from(state.score));
    state.speed = speed_for_level(state.level);

    if state.level > state.speed_tier && state.score > 0 {
        state.events.push_level(EventKind::SpeedUp, now, state.level);
        state.speed_tier = state.level;
        log::info!("Speed up: level {} runs at {:.2}", state.level, state.speed);
    }

    if state.level != old_level {
        state.events.push_level(EventKind::LevelUp, now, state.level);
        log::info!("Level up: {} -> {} (score {})", old_level, state.level, state.score);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries() {
        assert_eq!(level_for_score(0), 1);
        assert_eq!(level_for_score(99), 1);
        assert_eq!(level_for_score(100), 2);
        assert_eq!(level_for_score(199), 2);
        assert_eq!(level_for_score(200), 3);
        assert_eq!(level_for_score(299), 3);
        assert_eq!(level_for_score(300), 4);
        assert_eq!(level_for_score(1_000_000), MAX_LEVEL);
    }

    #[test]
    fn test_speed_curve() {
        assert_eq!(speed_for_level(1), 5.0);
        assert!((speed_for_level(2) - 5.25).abs() < 1e-5);
        assert!((speed_for_level(3) - 6.5625).abs() < 1e-5);
        assert!((speed_for_level(4) - 8.203125).abs() < 1e-5);
        assert!((world_speed(2, true) - 10.5).abs() < 1e-5);
    }

    #[test]
    fn test_tier_events() {
        let mut state = GameState::new(1);
        state.time_ticks = 10;
        state.score = 150;
        update(&mut state);

        assert_eq!(state.level, 2);
        let kinds: Vec<_> = state.events.iter().map(|e| (e.kind, e.level)).collect();
        assert_eq!(
            kinds,
            vec![(EventKind::SpeedUp, Some(2)), (EventKind::LevelUp, Some(2))]
        );

        // Same level next tick: nothing new
        state.time_ticks = 11;
        update(&mut state);
        assert_eq!(state.events.len(), 2);
    }

    #[test]
    fn test_level_jump_skipping_tiers() {
        let mut state = GameState::new(1);
        state.score = 320;
        update(&mut state);
        assert_eq!(state.level, 4);
        assert_eq!(state.speed_tier, 4);
        assert_eq!(state.events.count(EventKind::LevelUp), 1);
        assert_eq!(state.events.count(EventKind::SpeedUp), 1);
    }

    #[test]
    fn test_boost_countdown_clears() {
        let mut state = GameState::new(1);
        state.boost_active = true;
        state.boost_ticks = 2;
        update(&mut state);
        assert!(state.boost_active);
        update(&mut state);
        assert!(!state.boost_active);
        assert_eq!(state.boost_ticks, 0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn level_is_monotone_in_score(mut scores in proptest::collection::vec(0u64..2000, 1..100)) {
                scores.sort_unstable();
                let levels: Vec<u32> = scores.iter().map(|&s| level_for_score(s)).collect();
                prop_assert!(levels.windows(2).all(|w| w[0] <= w[1]));
                let again: Vec<u32> = scores.iter().map(|&s| level_for_score(s)).collect();
                prop_assert_eq!(levels, again);
            }

            #[test]
            fn speed_depends_only_on_level_and_boost(level in 1u32..8, boost in any::<bool>()) {
                prop_assert_eq!(world_speed(level, boost), world_speed(level, boost));
                prop_assert!(world_speed(level, boost) >= BASE_SPEED);
            }
        }
    }
}
