//! Best-score leaderboard service
//!
//! Sits between a submission and the store: validates the run, sanitizes
//! the nickname, and applies the keep-max upsert. The read-compare-write for
//! one nickname runs under that nickname's lock, so two concurrent
//! submissions can never both believe they are the new best. Reads go
//! through a short TTL cache that every successful write invalidates.

pub mod cache;
pub mod store;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::Settings;
use crate::validator::{Rejection, RunSummary, validate};
pub use cache::LeaderboardCache;
pub use store::{LeaderboardRecord, LeaderboardRow, MemoryStore, ScoreStore, StoreError};

/// Key-derivation context for the validation hash
const HASH_CONTEXT: &str = "donut-runner 2024-06 leaderboard validation hash";
/// Renamed nicknames must be at least this long
const MIN_RENAME_LEN: usize = 2;
/// Rows returned by the suspicious-score report
const SUSPICIOUS_LIMIT: usize = 50;
/// Scores above this are flagged for review
const SUSPICIOUS_SCORE: u64 = 1000;
/// A run shorter than this many ticks per point is flagged
const SUSPICIOUS_TICKS_PER_POINT: u64 = 10;

/// Keep letters, digits, space, hyphen and underscore, then trim
pub fn sanitize_nickname(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// How a submission changed the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// First record for this nickname
    Inserted,
    /// Beat the stored best
    Improved,
    /// Stored best kept
    NotImproved,
}

/// Body returned for an accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    #[serde(skip)]
    pub outcome: Option<Outcome>,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_best: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_best: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_score: Option<u64>,
}

impl SubmitResponse {
    fn inserted() -> Self {
        Self {
            outcome: Some(Outcome::Inserted),
            success: true,
            message: "Score submitted successfully".to_string(),
            previous_best: None,
            new_best: None,
            current_score: None,
        }
    }

    fn improved(previous: u64, new: u64) -> Self {
        Self {
            outcome: Some(Outcome::Improved),
            success: true,
            message: "New high score updated!".to_string(),
            previous_best: Some(previous),
            new_best: Some(new),
            current_score: None,
        }
    }

    fn not_improved(previous: u64, current: u64) -> Self {
        Self {
            outcome: Some(Outcome::NotImproved),
            success: true,
            message: "Score not updated - previous best is higher".to_string(),
            previous_best: Some(previous),
            new_best: None,
            current_score: Some(current),
        }
    }
}

/// JSON error body paired with an HTTP-style status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            reason: None,
            message: None,
        }
    }
}

/// Submission failures
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Invalid game data: {0}")]
    Rejected(Rejection),
    #[error("Invalid nickname")]
    InvalidNickname,
    #[error("Server error: {0}")]
    Storage(#[from] StoreError),
}

impl SubmitError {
    pub fn status(&self) -> u16 {
        match self {
            SubmitError::Rejected(_) | SubmitError::InvalidNickname => 400,
            SubmitError::Storage(_) => 500,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            SubmitError::Rejected(rejection) => ErrorBody {
                reason: Some(rejection.reason()),
                ..ErrorBody::new("Invalid game data")
            },
            SubmitError::InvalidNickname => ErrorBody::new("Invalid nickname"),
            SubmitError::Storage(_) => ErrorBody::new("Server error"),
        }
    }
}

/// Failures of the read and admin operations
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Both old and new nicknames are required")]
    MissingNickname,
    #[error("Invalid nickname format")]
    InvalidNickname,
    #[error("Nickname already taken")]
    NicknameTaken,
    #[error("Nickname not found")]
    NotFound,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Server error: {0}")]
    Storage(#[from] StoreError),
}

impl ServiceError {
    pub fn status(&self) -> u16 {
        match self {
            ServiceError::MissingNickname
            | ServiceError::InvalidNickname
            | ServiceError::NicknameTaken => 400,
            ServiceError::NotFound => 404,
            ServiceError::Unauthorized | ServiceError::Forbidden => 403,
            ServiceError::Storage(_) => 500,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ServiceError::Unauthorized => ErrorBody {
                message: Some("Invalid or missing authentication token".to_string()),
                ..ErrorBody::new("Unauthorized")
            },
            ServiceError::Storage(_) => ErrorBody::new("Server error"),
            other => ErrorBody::new(other.to_string()),
        }
    }
}

/// Result of an admin wipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: String,
    pub remaining_records: usize,
}

/// Full dump of the store, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    /// Export time (ms since epoch)
    pub exported_at: u64,
    pub total_scores: usize,
    pub scores: Vec<LeaderboardRecord>,
}

/// Request counters since startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStats {
    pub submit_count: u64,
    pub leaderboard_count: u64,
    pub error_count: u64,
    pub cache_warm: bool,
}

#[derive(Debug, Default)]
struct Counters {
    submits: AtomicU64,
    reads: AtomicU64,
    errors: AtomicU64,
}

/// Leaderboard front end shared by all request handlers
pub struct LeaderboardService {
    store: Box<dyn ScoreStore>,
    cache: Mutex<LeaderboardCache>,
    /// One lock per nickname seen; guards read-compare-write
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    counters: Counters,
    hash_key: [u8; 32],
    default_limit: usize,
    max_limit: usize,
    cache_rows: usize,
    max_nickname_len: usize,
    admin_token: Option<String>,
    production: bool,
}

impl LeaderboardService {
    /// Build the service over the store selected by `settings`
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.open_store(), settings)
    }

    pub fn new(store: Box<dyn ScoreStore>, settings: &Settings) -> Self {
        log::info!(
            "Leaderboard service on {} store ({} environment)",
            store.name(),
            settings.environment.as_str()
        );
        Self {
            store,
            cache: Mutex::new(LeaderboardCache::new(Duration::from_secs(settings.cache_ttl_secs))),
            locks: Mutex::new(HashMap::new()),
            counters: Counters::default(),
            hash_key: blake3::derive_key(HASH_CONTEXT, settings.secret_key.as_bytes()),
            default_limit: settings.default_limit,
            max_limit: settings.max_limit,
            cache_rows: settings.cache_rows.max(settings.max_limit),
            max_nickname_len: settings.max_nickname_len,
            admin_token: settings.admin_token.clone().filter(|t| !t.is_empty()),
            production: settings.environment.is_production(),
        }
    }

    /// Keyed BLAKE3 digest binding a submission to this server's secret
    pub fn validation_hash(&self, summary: &RunSummary) -> String {
        let data = format!(
            "{}-{}-{}-{}-{}",
            summary.nickname, summary.score, summary.xp, summary.level, summary.timestamp
        );
        blake3::keyed_hash(&self.hash_key, data.as_bytes()).to_hex().to_string()
    }

    fn key_lock(&self, nickname: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(nickname.to_string()).or_default().clone()
    }

    fn invalidate_cache(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .invalidate();
    }

    fn count_error<E>(&self, err: E) -> E {
        self.counters.errors.fetch_add(1, Ordering::Relaxed);
        err
    }

    /// Submit a raw JSON body as sent by a client
    pub fn submit_json(&self, body: &str) -> Result<SubmitResponse, SubmitError> {
        match RunSummary::from_json(body) {
            Ok(summary) => self.submit(&summary),
            Err(rejection) => {
                self.counters.submits.fetch_add(1, Ordering::Relaxed);
                log::warn!("Rejected malformed submission: {} ({})", rejection.reason(), rejection.code());
                Err(SubmitError::Rejected(rejection))
            }
        }
    }

    /// Validate a run and apply the keep-max upsert
    pub fn submit(&self, summary: &RunSummary) -> Result<SubmitResponse, SubmitError> {
        self.counters.submits.fetch_add(1, Ordering::Relaxed);

        if let Err(rejection) = validate(summary) {
            log::warn!(
                "Rejected run from {:?}: {} ({})",
                summary.nickname,
                rejection.reason(),
                rejection.code()
            );
            return Err(SubmitError::Rejected(rejection));
        }

        if summary.nickname.is_empty() || summary.nickname.chars().count() > self.max_nickname_len {
            return Err(SubmitError::InvalidNickname);
        }
        let nickname = sanitize_nickname(&summary.nickname);
        if nickname.is_empty() {
            return Err(SubmitError::InvalidNickname);
        }

        // Non-negative and level-consistent after validation
        let score = summary.score as u64;
        let record = LeaderboardRecord {
            nickname: nickname.clone(),
            score,
            xp: summary.xp as u64,
            level: summary.level as u32,
            game_time: summary.game_time,
            timestamp: summary.timestamp,
            is_valid: true,
            validation_hash: self.validation_hash(summary),
        };

        let lock = self.key_lock(&nickname);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let existing = self
            .store
            .get(&nickname)
            .map_err(|e| self.count_error(SubmitError::from(e)))?;

        let response = match existing {
            None => {
                self.store
                    .insert(record)
                    .map_err(|e| self.count_error(SubmitError::from(e)))?;
                log::info!("New player {:?} scored {}", nickname, score);
                SubmitResponse::inserted()
            }
            Some(best) if score > best.score => {
                self.store
                    .update(record)
                    .map_err(|e| self.count_error(SubmitError::from(e)))?;
                log::info!("New best for {:?}: {} -> {}", nickname, best.score, score);
                SubmitResponse::improved(best.score, score)
            }
            Some(best) => return Ok(SubmitResponse::not_improved(best.score, score)),
        };

        self.invalidate_cache();
        Ok(response)
    }

    /// Public board, best first, one row per nickname
    ///
    /// `limit` defaults when absent or zero and is capped at the maximum.
    pub fn leaderboard(&self, limit: Option<usize>) -> Result<Vec<LeaderboardRow>, ServiceError> {
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        let limit = limit
            .filter(|&l| l > 0)
            .unwrap_or(self.default_limit)
            .min(self.max_limit);
        let now = Instant::now();

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(rows) = cache.get(limit, now) {
            return Ok(rows);
        }

        let rows = self
            .store
            .top(self.cache_rows)
            .map_err(|e| self.count_error(ServiceError::from(e)))?;
        let served = rows.iter().take(limit).cloned().collect();
        cache.put(rows, now);
        Ok(served)
    }

    /// Move a record to a new nickname
    pub fn rename(&self, old: &str, new: &str) -> Result<(), ServiceError> {
        if old.is_empty() || new.is_empty() {
            return Err(ServiceError::MissingNickname);
        }
        let old = sanitize_nickname(old);
        let new = sanitize_nickname(new);
        if old.is_empty() || new.chars().count() < MIN_RENAME_LEN {
            return Err(ServiceError::InvalidNickname);
        }
        if old == new {
            return Ok(());
        }

        // Fixed lock order so two crossing renames cannot deadlock
        let (first, second) = if old < new { (&old, &new) } else { (&new, &old) };
        let first_lock = self.key_lock(first);
        let second_lock = self.key_lock(second);
        let _first = first_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _second = second_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if self.store.get(&new)?.is_some() {
            return Err(ServiceError::NicknameTaken);
        }
        if !self.store.rename(&old, &new)? {
            return Err(ServiceError::NotFound);
        }
        self.invalidate_cache();
        log::info!("Renamed {:?} to {:?}", old, new);
        Ok(())
    }

    /// Wipe the board; requires the configured admin token
    pub fn clear(&self, token: &str) -> Result<ClearResponse, ServiceError> {
        let authorized = self
            .admin_token
            .as_deref()
            .is_some_and(|expected| blake3::hash(token.as_bytes()) == blake3::hash(expected.as_bytes()));
        if !authorized {
            log::warn!("Unauthorized leaderboard clear attempt");
            return Err(ServiceError::Unauthorized);
        }

        let removed = self.store.clear()?;
        self.invalidate_cache();
        let remaining = self.store.all()?.len();
        log::info!("Cleared {} scores from leaderboard", removed);
        Ok(ClearResponse {
            success: true,
            message: format!("Successfully cleared {removed} scores from leaderboard"),
            remaining_records: remaining,
        })
    }

    /// Records worth a manual look, newest first; unavailable in production
    pub fn suspicious(&self) -> Result<Vec<LeaderboardRecord>, ServiceError> {
        if self.production {
            return Err(ServiceError::Forbidden);
        }
        let mut flagged: Vec<LeaderboardRecord> = self
            .store
            .all()?
            .into_iter()
            .filter(|r| {
                !r.is_valid
                    || r.score > SUSPICIOUS_SCORE
                    || r.game_time < r.score.saturating_mul(SUSPICIOUS_TICKS_PER_POINT)
            })
            .collect();
        flagged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        flagged.truncate(SUSPICIOUS_LIMIT);
        Ok(flagged)
    }

    /// Dump every record, newest first; unavailable in production
    pub fn backup(&self) -> Result<Backup, ServiceError> {
        if self.production {
            return Err(ServiceError::Forbidden);
        }
        let mut scores = self.store.all()?;
        scores.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let exported_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Ok(Backup {
            exported_at,
            total_scores: scores.len(),
            scores,
        })
    }

    pub fn stats(&self) -> RequestStats {
        let cache_warm = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_warm(Instant::now());
        RequestStats {
            submit_count: self.counters.submits.load(Ordering::Relaxed),
            leaderboard_count: self.counters.reads.load(Ordering::Relaxed),
            error_count: self.counters.errors.load(Ordering::Relaxed),
            cache_warm,
        }
    }

    /// Log request rates; meant to be called periodically by the host
    pub fn log_stats(&self) {
        let stats = self.stats();
        log::info!(
            "Requests: {} submits, {} leaderboard reads, {} errors, cache {}",
            stats.submit_count,
            stats.leaderboard_count,
            stats.error_count,
            if stats.cache_warm { "warm" } else { "cold" }
        );
    }
}
