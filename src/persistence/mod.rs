//! File-backed score store with integrity verification
//!
//! Features:
//! - Versioned JSON envelope
//! - BLAKE3 integrity digest over the record list
//! - Backup rotation (old save copied to backup, tmp renamed over save)
//! - Corruption detection with fallback to the backup copy
//!
//! Every write persists the whole board before it becomes visible, so a
//! failed write leaves both the file and the in-memory view unchanged.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::leaderboard::store::{
    LeaderboardRecord, LeaderboardRow, RecordMap, ScoreStore, StoreError, rank, rename_in,
};

/// Current envelope format
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    /// Hex BLAKE3 digest of the serialized `records`
    digest: String,
    records: Vec<LeaderboardRecord>,
}

fn digest(records: &[LeaderboardRecord]) -> Result<String, StoreError> {
    let bytes = serde_json::to_vec(records)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

fn encode(records: &RecordMap) -> Result<Vec<u8>, StoreError> {
    let records: Vec<LeaderboardRecord> = records.values().cloned().collect();
    let envelope = Envelope {
        version: FORMAT_VERSION,
        digest: digest(&records)?,
        records,
    };
    Ok(serde_json::to_vec_pretty(&envelope)?)
}

fn decode(bytes: &[u8]) -> Result<RecordMap, StoreError> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;
    if envelope.version != FORMAT_VERSION {
        return Err(StoreError::Corrupt(format!(
            "unsupported format version {}",
            envelope.version
        )));
    }
    if digest(&envelope.records)? != envelope.digest {
        return Err(StoreError::Corrupt("digest mismatch".to_string()));
    }

    let mut records = RecordMap::new();
    for record in envelope.records {
        if records.contains_key(&record.nickname) {
            return Err(StoreError::Corrupt(format!(
                "duplicate nickname {:?}",
                record.nickname
            )));
        }
        records.insert(record.nickname.clone(), record);
    }
    Ok(records)
}

/// Score store persisted as a single JSON file
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: RwLock<RecordMap>,
}

impl JsonFileStore {
    /// Open or create the store at `path`
    ///
    /// A corrupt main file falls back to the backup; if both are unreadable
    /// the error is returned and nothing is overwritten.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let backup = Self::backup_path(&path);
        let records = if path.exists() {
            match fs::read(&path).map_err(StoreError::from).and_then(|b| decode(&b)) {
                Ok(records) => records,
                Err(err) => {
                    log::warn!("Score file {} unreadable: {}", path.display(), err);
                    Self::recover(&backup)?
                }
            }
        } else if backup.exists() {
            log::warn!("Score file {} missing", path.display());
            Self::recover(&backup)?
        } else {
            RecordMap::new()
        };

        log::info!("Opened score file {} ({} records)", path.display(), records.len());
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn recover(backup: &Path) -> Result<RecordMap, StoreError> {
        let records = decode(&fs::read(backup)?)?;
        log::warn!("Recovered {} scores from {}", records.len(), backup.display());
        Ok(records)
    }

    fn backup_path(path: &Path) -> PathBuf {
        path.with_extension("bak")
    }

    fn tmp_path(path: &Path) -> PathBuf {
        path.with_extension("tmp")
    }

    /// Write tmp, copy the current save to backup, then move tmp into place
    ///
    /// The main file is replaced by a single rename and never goes missing.
    fn persist(&self, records: &RecordMap) -> Result<(), StoreError> {
        let bytes = encode(records)?;
        let tmp = Self::tmp_path(&self.path);
        fs::write(&tmp, bytes)?;
        if self.path.exists() {
            fs::copy(&self.path, Self::backup_path(&self.path))?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Apply `change` to a copy, persist it, and only then publish it
    fn mutate<T>(&self, change: impl FnOnce(&mut RecordMap) -> T) -> Result<T, StoreError> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = records.clone();
        let out = change(&mut next);
        self.persist(&next).inspect_err(|err| {
            log::error!("Failed to save scores to {}: {}", self.path.display(), err);
        })?;
        *records = next;
        Ok(out)
    }
}

impl ScoreStore for JsonFileStore {
    fn name(&self) -> &'static str {
        "json-file"
    }

    fn get(&self, nickname: &str) -> Result<Option<LeaderboardRecord>, StoreError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(nickname).cloned())
    }

    fn insert(&self, record: LeaderboardRecord) -> Result<(), StoreError> {
        self.mutate(|records| {
            records.insert(record.nickname.clone(), record);
        })
    }

    fn update(&self, record: LeaderboardRecord) -> Result<(), StoreError> {
        self.insert(record)
    }

    fn top(&self, limit: usize) -> Result<Vec<LeaderboardRow>, StoreError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(rank(records.values(), limit))
    }

    fn rename(&self, old: &str, new: &str) -> Result<bool, StoreError> {
        if !self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(old)
        {
            return Ok(false);
        }
        self.mutate(|records| rename_in(records, old, new))
    }

    fn clear(&self) -> Result<usize, StoreError> {
        self.mutate(|records| {
            let removed = records.len();
            records.clear();
            removed
        })
    }

    fn all(&self) -> Result<Vec<LeaderboardRecord>, StoreError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.values().cloned().collect())
    }
}
