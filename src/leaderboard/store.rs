//! Score storage port and the in-memory backend
//!
//! The upsert policy lives in the service and is written once against
//! `ScoreStore`; backends only store, fetch and rank records.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("store data is corrupt: {0}")]
    Corrupt(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Best run for one nickname
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRecord {
    pub nickname: String,
    pub score: u64,
    pub xp: u64,
    pub level: u32,
    /// Run length in ticks
    pub game_time: u64,
    /// Client submission timestamp (ms since epoch)
    pub timestamp: u64,
    pub is_valid: bool,
    pub validation_hash: String,
}

/// Public leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub nickname: String,
    pub score: u64,
    pub level: u32,
    pub timestamp: u64,
}

impl From<&LeaderboardRecord> for LeaderboardRow {
    fn from(record: &LeaderboardRecord) -> Self {
        Self {
            nickname: record.nickname.clone(),
            score: record.score,
            level: record.level,
            timestamp: record.timestamp,
        }
    }
}

/// Storage port shared by all backends
pub trait ScoreStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    fn get(&self, nickname: &str) -> Result<Option<LeaderboardRecord>, StoreError>;

    fn insert(&self, record: LeaderboardRecord) -> Result<(), StoreError>;

    /// Replace the record with the same nickname
    fn update(&self, record: LeaderboardRecord) -> Result<(), StoreError>;

    /// Valid records, best score first, at most `limit`
    fn top(&self, limit: usize) -> Result<Vec<LeaderboardRow>, StoreError>;

    /// Move a record to a new nickname; false if `old` had no record
    fn rename(&self, old: &str, new: &str) -> Result<bool, StoreError>;

    /// Delete everything, returning how many records were removed
    fn clear(&self) -> Result<usize, StoreError>;

    fn all(&self) -> Result<Vec<LeaderboardRecord>, StoreError>;
}

/// Rank valid records: score descending, earlier run first on ties
pub fn rank<'a>(records: impl Iterator<Item = &'a LeaderboardRecord>, limit: usize) -> Vec<LeaderboardRow> {
    let mut ranked: Vec<&LeaderboardRecord> = records.filter(|r| r.is_valid).collect();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.timestamp.cmp(&b.timestamp))
            .then_with(|| a.nickname.cmp(&b.nickname))
    });
    ranked.into_iter().take(limit).map(LeaderboardRow::from).collect()
}

/// Keyed map of records; the map key is the nickname
pub type RecordMap = BTreeMap<String, LeaderboardRecord>;

/// Process-local store, the default and the fallback backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<RecordMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, nickname: &str) -> Result<Option<LeaderboardRecord>, StoreError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(nickname).cloned())
    }

    fn insert(&self, record: LeaderboardRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.insert(record.nickname.clone(), record);
        Ok(())
    }

    fn update(&self, record: LeaderboardRecord) -> Result<(), StoreError> {
        self.insert(record)
    }

    fn top(&self, limit: usize) -> Result<Vec<LeaderboardRow>, StoreError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(rank(records.values(), limit))
    }

    fn rename(&self, old: &str, new: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        Ok(rename_in(&mut records, old, new))
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let removed = records.len();
        records.clear();
        Ok(removed)
    }

    fn all(&self) -> Result<Vec<LeaderboardRecord>, StoreError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.values().cloned().collect())
    }
}

/// Re-key a record in place
pub fn rename_in(records: &mut RecordMap, old: &str, new: &str) -> bool {
    match records.remove(old) {
        Some(mut record) => {
            record.nickname = new.to_string();
            records.insert(new.to_string(), record);
            true
        }
        None => false,
    }
}
