//! Donut Runner - headless entry point
//!
//! Plays a handful of autopilot runs, sends each one through the same
//! submit path a client would use, and prints the resulting leaderboard.
//!
//! Usage: `donut-runner [runs] [first-seed]`

use std::time::{SystemTime, UNIX_EPOCH};

use donut_runner::consts::TICKS_PER_SECOND;
use donut_runner::sim::{GameState, TickInput, tick};
use donut_runner::{LeaderboardService, Settings};

/// Demo runs are cut off after five minutes of play
const MAX_RUN_TICKS: u64 = 5 * 60 * TICKS_PER_SECOND;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Play one autopilot run to game over (or the time cap)
fn play(seed: u64) -> GameState {
    let mut state = GameState::new(seed);
    let input = TickInput {
        autopilot: true,
        ..Default::default()
    };
    while state.is_running() && state.time_ticks < MAX_RUN_TICKS {
        tick(&mut state, &input);
    }
    state.stop();
    state
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let runs: u64 = args.next().and_then(|a| a.parse().ok()).unwrap_or(5);
    let first_seed: u64 = args.next().and_then(|a| a.parse().ok()).unwrap_or(1);

    let settings = Settings::load();
    let service = LeaderboardService::from_settings(&settings);
    log::info!("Donut Runner (headless) playing {} runs from seed {}", runs, first_seed);

    for seed in first_seed..first_seed + runs {
        let state = play(seed);
        let summary = state.summary(&format!("bot-{seed}"), now_ms());

        // Go through the wire format like a real client
        let body = match serde_json::to_string(&summary) {
            Ok(body) => body,
            Err(err) => {
                log::error!("Could not encode run {}: {}", seed, err);
                continue;
            }
        };
        match service.submit_json(&body) {
            Ok(response) => println!(
                "seed {seed}: score {} level {} in {:.1}s, {} events -> {}",
                state.score,
                state.level,
                summary.seconds(),
                summary.events.len(),
                response.message
            ),
            Err(err) => println!("seed {seed}: {} {:?}", err.status(), err.body()),
        }
    }

    match service.leaderboard(None) {
        Ok(rows) => match serde_json::to_string_pretty(&rows) {
            Ok(json) => println!("{json}"),
            Err(err) => log::error!("Could not encode leaderboard: {}", err),
        },
        Err(err) => log::error!("Leaderboard read failed: {}", err),
    }
    service.log_stats();
}
