//! Append-only event log
//!
//! Every semantic action of a run is recorded here at the tick it resolved.
//! The log is the only evidence the server sees, so order is ground truth.

use serde::{Deserialize, Serialize};

/// Closed set of loggable actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Jump,
    DoubleJump,
    Shoot,
    CollectXp,
    HitTeacup,
    SpeedboostCollected,
    LevelUp,
    SpeedUp,
}

impl EventKind {
    /// Wire name, as used in submitted JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Jump => "jump",
            EventKind::DoubleJump => "double_jump",
            EventKind::Shoot => "shoot",
            EventKind::CollectXp => "collect_xp",
            EventKind::HitTeacup => "hit_teacup",
            EventKind::SpeedboostCollected => "speedboost_collected",
            EventKind::LevelUp => "level_up",
            EventKind::SpeedUp => "speed_up",
        }
    }
}

/// A single logged action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Tick at which the action resolved
    pub time: u64,
    /// New level, only for `level_up` and `speed_up`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
}

impl Event {
    pub fn new(kind: EventKind, time: u64) -> Self {
        Self {
            kind,
            time,
            level: None,
        }
    }
}

/// Ordered record of a run; serialized as a plain JSON array
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event stamped with `time`
    pub fn push(&mut self, kind: EventKind, time: u64) {
        self.events.push(Event::new(kind, time));
    }

    /// Append a tier-change event carrying the new level
    pub fn push_level(&mut self, kind: EventKind, time: u64, level: u32) {
        self.events.push(Event {
            kind,
            time,
            level: Some(level),
        });
    }

    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    /// Number of events of the given kind
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// True when times never decrease along the log
    pub fn is_monotone(&self) -> bool {
        self.events.windows(2).all(|w| w[0].time <= w[1].time)
    }
}

impl From<Vec<Event>> for EventLog {
    fn from(events: Vec<Event>) -> Self {
        Self { events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let mut log = EventLog::new();
        log.push(EventKind::Jump, 12);
        log.push_level(EventKind::LevelUp, 40, 2);

        let json = serde_json::to_string(&log).unwrap();
        assert_eq!(
            json,
            r#"[{"type":"jump","time":12},{"type":"level_up","time":40,"level":2}]"#
        );

        let parsed: EventLog = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, log);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result: Result<EventLog, _> = serde_json::from_str(r#"[{"type":"teleport","time":1}]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_monotone_and_count() {
        let mut log = EventLog::new();
        log.push(EventKind::Shoot, 5);
        log.push(EventKind::HitTeacup, 5);
        log.push(EventKind::Shoot, 9);
        assert!(log.is_monotone());
        assert_eq!(log.count(EventKind::Shoot), 2);
        assert_eq!(log.count(EventKind::Jump), 0);

        log.push(EventKind::Jump, 3);
        assert!(!log.is_monotone());
    }

    #[test]
    fn test_wire_names_match_serde() {
        for kind in [
            EventKind::Jump,
            EventKind::DoubleJump,
            EventKind::Shoot,
            EventKind::CollectXp,
            EventKind::HitTeacup,
            EventKind::SpeedboostCollected,
            EventKind::LevelUp,
            EventKind::SpeedUp,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
