//! Server-side replay validator
//!
//! A stateless bound/consistency checker over a submitted run summary and its
//! event log. It never replays physics; it re-derives the limits the
//! simulation enforces and rejects anything outside them. Checks run in a
//! fixed order and the first failure wins.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::TICKS_PER_SECOND;
use crate::sim::events::{Event, EventKind, EventLog};
use crate::sim::progression::{MAX_LEVEL, level_for_score};

/// Fastest plausible scoring: one point per tenth of a second
const MAX_POINTS_PER_SECOND: i64 = 10;
const MAX_XP_PER_SECOND: i64 = 10;
/// Sustained input ceilings, per minute
const MAX_JUMPS_PER_MINUTE: u64 = 120;
const MAX_SHOTS_PER_MINUTE: u64 = 180;
const TICKS_PER_MINUTE: u64 = TICKS_PER_SECOND * 60;

/// Why a submission was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Rejection {
    #[error("Invalid game values")]
    InvalidValues,
    #[error("Level mismatch")]
    LevelMismatch,
    #[error("Score too high for game duration")]
    ScoreTooHigh,
    #[error("Invalid events data")]
    InvalidEvents,
    #[error("Invalid event sequence")]
    InvalidEventSequence,
    #[error("Score calculation mismatch")]
    ScoreCalculationMismatch,
    #[error("XP out of reasonable range")]
    XpOutOfRange,
    #[error("Superhuman play detected")]
    JumpRate,
    #[error("Superhuman play detected")]
    ShotRate,
}

impl Rejection {
    /// Client-facing reason string
    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// Stable machine-readable code for logs
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::InvalidValues => "invalid_values",
            Rejection::LevelMismatch => "level_mismatch",
            Rejection::ScoreTooHigh => "score_too_high",
            Rejection::InvalidEvents => "invalid_events",
            Rejection::InvalidEventSequence => "invalid_event_sequence",
            Rejection::ScoreCalculationMismatch => "score_calculation_mismatch",
            Rejection::XpOutOfRange => "xp_out_of_range",
            Rejection::JumpRate => "jump_rate",
            Rejection::ShotRate => "shot_rate",
        }
    }
}

/// Submitted end-of-run summary (wire format of the score submission)
///
/// Numbers are signed so out-of-range submissions can be represented and
/// rejected by the validator rather than failing to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    #[serde(default)]
    pub nickname: String,
    pub score: i64,
    pub xp: i64,
    pub level: i64,
    /// Run length in ticks
    pub game_time: u64,
    pub events: EventLog,
    #[serde(default)]
    pub timestamp: u64,
}

/// Everything but the event log, parsed separately so header checks can run
/// before the log shape is judged
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    #[serde(default)]
    nickname: String,
    score: i64,
    xp: i64,
    level: i64,
    game_time: u64,
    #[serde(default)]
    timestamp: u64,
}

impl RunSummary {
    /// Parse a submission body, mapping malformed input to a rejection
    ///
    /// A body that is not an object or whose numeric fields are missing or
    /// mistyped is `InvalidValues`. An `events` value that is not an array
    /// of known events is `InvalidEvents`, reported only after the header
    /// passes the checks that precede the log shape check.
    pub fn from_json(body: &str) -> Result<Self, Rejection> {
        let mut value: serde_json::Value =
            serde_json::from_str(body).map_err(|_| Rejection::InvalidValues)?;
        let events = value
            .as_object_mut()
            .ok_or(Rejection::InvalidValues)?
            .remove("events")
            .unwrap_or(serde_json::Value::Null);
        let header: Header = serde_json::from_value(value).map_err(|_| Rejection::InvalidValues)?;

        let Some(raw) = events.as_array() else {
            check_header(header.score, header.xp, header.level, header.game_time)?;
            return Err(Rejection::InvalidEvents);
        };
        let events: Vec<Event> = match raw
            .iter()
            .map(|e| serde_json::from_value(e.clone()))
            .collect::<Result<_, _>>()
        {
            Ok(events) => events,
            Err(_) => {
                check_header(header.score, header.xp, header.level, header.game_time)?;
                return Err(Rejection::InvalidEvents);
            }
        };

        Ok(RunSummary {
            nickname: header.nickname,
            score: header.score,
            xp: header.xp,
            level: header.level,
            game_time: header.game_time,
            events: EventLog::from(events),
            timestamp: header.timestamp,
        })
    }

    pub fn seconds(&self) -> f64 {
        self.game_time as f64 / TICKS_PER_SECOND as f64
    }
}

/// Range, level and duration checks; everything that needs no event log
fn check_header(score: i64, xp: i64, level: i64, game_time: u64) -> Result<(), Rejection> {
    if score < 0 || xp < 0 || level < 1 || level > i64::from(MAX_LEVEL) {
        return Err(Rejection::InvalidValues);
    }

    if level != i64::from(level_for_score(score as u64)) {
        return Err(Rejection::LevelMismatch);
    }

    // score > seconds * rate, kept in integers: score * tps > ticks * rate
    let capacity = i128::from(game_time) * i128::from(MAX_POINTS_PER_SECOND);
    if i128::from(score) * i128::from(TICKS_PER_SECOND) > capacity {
        return Err(Rejection::ScoreTooHigh);
    }

    Ok(())
}

/// `count` events over `ticks` exceeds `per_minute` sustained
fn exceeds_rate(count: usize, ticks: u64, per_minute: u64) -> bool {
    (count as u128) * u128::from(TICKS_PER_MINUTE) > u128::from(per_minute) * u128::from(ticks)
}

/// Accept or reject a run summary
pub fn validate(summary: &RunSummary) -> Result<(), Rejection> {
    check_header(summary.score, summary.xp, summary.level, summary.game_time)?;

    if !summary.events.is_monotone() {
        return Err(Rejection::InvalidEventSequence);
    }

    let teacup_hits = summary.events.count(EventKind::HitTeacup) as i64;
    let floor = teacup_hits * i64::from(crate::consts::TEACUP_POINTS);
    if summary.score < floor {
        return Err(Rejection::ScoreCalculationMismatch);
    }

    let xp_cap = i128::from(summary.game_time) * i128::from(MAX_XP_PER_SECOND);
    if i128::from(summary.xp) * i128::from(TICKS_PER_SECOND) > xp_cap {
        return Err(Rejection::XpOutOfRange);
    }

    let jumps = summary.events.count(EventKind::Jump);
    if exceeds_rate(jumps, summary.game_time, MAX_JUMPS_PER_MINUTE) {
        return Err(Rejection::JumpRate);
    }

    let shots = summary.events.count(EventKind::Shoot);
    if exceeds_rate(shots, summary.game_time, MAX_SHOTS_PER_MINUTE) {
        return Err(Rejection::ShotRate);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(score: i64, xp: i64, level: i64, game_time: u64) -> RunSummary {
        RunSummary {
            nickname: "tester".to_string(),
            score,
            xp,
            level,
            game_time,
            events: EventLog::new(),
            timestamp: 1_700_000_000_000,
        }
    }

    fn log_of(kinds: &[(EventKind, u64)]) -> EventLog {
        let mut log = EventLog::new();
        for &(kind, time) in kinds {
            log.push(kind, time);
        }
        log
    }

    #[test]
    fn test_level_mismatch() {
        assert_eq!(validate(&summary(150, 0, 1, 6000)), Err(Rejection::LevelMismatch));
    }

    #[test]
    fn test_teacup_floor() {
        let mut s = summary(150, 40, 2, 6000);
        s.events = log_of(&(0..40).map(|i| (EventKind::HitTeacup, 100 + i * 10)).collect::<Vec<_>>());
        assert_eq!(validate(&s), Err(Rejection::ScoreCalculationMismatch));
    }

    #[test]
    fn test_plausible_run_accepted() {
        let mut s = summary(120, 40, 2, 7200);
        let mut kinds: Vec<(EventKind, u64)> = (0..5).map(|i| (EventKind::Jump, 600 + i * 300)).collect();
        kinds.extend((0..3).map(|i| (EventKind::Shoot, 3000 + i * 200)));
        s.events = log_of(&kinds);
        assert_eq!(validate(&s), Ok(()));
    }

    #[test]
    fn test_range_checks() {
        assert_eq!(validate(&summary(-1, 0, 1, 600)), Err(Rejection::InvalidValues));
        assert_eq!(validate(&summary(0, -5, 1, 600)), Err(Rejection::InvalidValues));
        assert_eq!(validate(&summary(0, 0, 0, 600)), Err(Rejection::InvalidValues));
        assert_eq!(validate(&summary(500, 0, 5, 60_000)), Err(Rejection::InvalidValues));
    }

    #[test]
    fn test_level_table_edges() {
        assert_eq!(validate(&summary(99, 0, 1, 60_000)), Ok(()));
        assert_eq!(validate(&summary(100, 0, 1, 60_000)), Err(Rejection::LevelMismatch));
        assert_eq!(validate(&summary(100, 0, 2, 60_000)), Ok(()));
        assert_eq!(validate(&summary(299, 0, 4, 60_000)), Err(Rejection::LevelMismatch));
        // Top tier is open-ended
        assert_eq!(validate(&summary(5000, 0, 4, 60_000)), Ok(()));
    }

    #[test]
    fn test_duration_capacity_boundary() {
        // 60 s allows exactly 600 points
        assert_eq!(validate(&summary(600, 0, 4, 3600)), Ok(()));
        assert_eq!(validate(&summary(601, 0, 4, 3600)), Err(Rejection::ScoreTooHigh));
        assert_eq!(validate(&summary(1, 0, 1, 0)), Err(Rejection::ScoreTooHigh));
    }

    #[test]
    fn test_out_of_order_events() {
        let mut s = summary(10, 10, 1, 600);
        s.events = log_of(&[(EventKind::Jump, 50), (EventKind::Shoot, 40)]);
        assert_eq!(validate(&s), Err(Rejection::InvalidEventSequence));
    }

    #[test]
    fn test_xp_cap() {
        assert_eq!(validate(&summary(10, 600, 1, 3600)), Ok(()));
        assert_eq!(validate(&summary(10, 601, 1, 3600)), Err(Rejection::XpOutOfRange));
    }

    #[test]
    fn test_rate_ceilings() {
        // One minute: 120 jumps is the limit
        let mut s = summary(0, 0, 1, 3600);
        s.events = log_of(&(0..120).map(|i| (EventKind::Jump, i * 30)).collect::<Vec<_>>());
        assert_eq!(validate(&s), Ok(()));

        s.events.push(EventKind::Jump, 3599);
        assert_eq!(validate(&s), Err(Rejection::JumpRate));

        let mut s = summary(0, 0, 1, 3600);
        s.events = log_of(&(0..181).map(|i| (EventKind::Shoot, i * 19)).collect::<Vec<_>>());
        assert_eq!(validate(&s), Err(Rejection::ShotRate));
        assert_eq!(Rejection::ShotRate.reason(), "Superhuman play detected");
    }

    #[test]
    fn test_double_jumps_do_not_count_toward_jump_rate() {
        // 100 jump + double jump pairs in one minute
        let mut s = summary(0, 0, 1, 3600);
        let mut kinds: Vec<(EventKind, u64)> = (0..100).map(|i| (EventKind::Jump, i * 36)).collect();
        kinds.extend((0..100).map(|i| (EventKind::DoubleJump, i * 36 + 10)));
        kinds.sort_by_key(|&(_, t)| t);
        s.events = log_of(&kinds);
        assert_eq!(validate(&s), Ok(()));
    }

    #[test]
    fn test_from_json_wire_format() {
        let body = r#"{
            "nickname": "Glaze",
            "score": 120,
            "xp": 40,
            "level": 2,
            "gameTime": 7200,
            "events": [
                {"type": "jump", "time": 10},
                {"type": "level_up", "time": 20, "level": 2}
            ],
            "timestamp": 1700000000000
        }"#;
        let s = RunSummary::from_json(body).unwrap();
        assert_eq!(s.nickname, "Glaze");
        assert_eq!(s.game_time, 7200);
        assert_eq!(s.events.len(), 2);
        assert_eq!(s.events.as_slice()[1].level, Some(2));
        assert_eq!(validate(&s), Ok(()));
    }

    #[test]
    fn test_from_json_rejections() {
        assert_eq!(RunSummary::from_json("[]"), Err(Rejection::InvalidValues));
        assert_eq!(
            RunSummary::from_json(r#"{"score": "lots", "xp": 0, "level": 1, "gameTime": 60, "events": []}"#),
            Err(Rejection::InvalidValues)
        );
        assert_eq!(
            RunSummary::from_json(r#"{"score": 0, "xp": 0, "level": 1, "gameTime": 60, "events": "none"}"#),
            Err(Rejection::InvalidEvents)
        );
        assert_eq!(
            RunSummary::from_json(
                r#"{"score": 0, "xp": 0, "level": 1, "gameTime": 60, "events": [{"type": "teleport", "time": 1}]}"#
            ),
            Err(Rejection::InvalidEvents)
        );
        // Header checks still come first
        assert_eq!(
            RunSummary::from_json(r#"{"score": 150, "xp": 0, "level": 1, "gameTime": 6000}"#),
            Err(Rejection::LevelMismatch)
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn validation_is_pure(score in 0i64..2000, xp in 0i64..2000, ticks in 0u64..100_000) {
                let s = summary(score, xp, i64::from(level_for_score(score as u64)), ticks);
                prop_assert_eq!(validate(&s), validate(&s));
            }

            #[test]
            fn consistent_quiet_runs_pass(ticks in 600u64..100_000, frac in 0.0f64..1.0) {
                let max_score = (ticks * 10 / 60) as i64;
                let score = (max_score as f64 * frac) as i64;
                let s = summary(score, score, i64::from(level_for_score(score as u64)), ticks);
                prop_assert_eq!(validate(&s), Ok(()));
            }
        }
    }
}
