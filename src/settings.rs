//! Server settings
//!
//! Loaded from an optional JSON file, then overridden by environment
//! variables. Missing fields take their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::leaderboard::{MemoryStore, ScoreStore};
use crate::persistence::JsonFileStore;

/// Path of the JSON settings file
pub const CONFIG_ENV: &str = "DONUT_RUNNER_CONFIG";
pub const STORAGE_ENV: &str = "DONUT_RUNNER_STORAGE";
pub const DATA_ENV: &str = "DONUT_RUNNER_DATA";
pub const SECRET_ENV: &str = "DONUT_RUNNER_SECRET";
pub const ADMIN_TOKEN_ENV: &str = "DONUT_RUNNER_ADMIN_TOKEN";
pub const ENVIRONMENT_ENV: &str = "DONUT_RUNNER_ENV";

/// Settings file failures
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings: {0}")]
    Format(#[from] serde_json::Error),
}

/// Storage backend choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StorageBackend {
    #[default]
    Memory,
    JsonFile,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "Memory",
            StorageBackend::JsonFile => "JsonFile",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => Some(StorageBackend::Memory),
            "jsonfile" | "json-file" | "json" | "file" => Some(StorageBackend::JsonFile),
            _ => None,
        }
    }
}

/// Deployment environment; admin reports are disabled in production
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }
}

/// Leaderboard server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Which score store to open at startup
    pub storage: StorageBackend,
    /// Score file for the `JsonFile` backend
    pub data_path: PathBuf,
    pub environment: Environment,

    // === Read path ===
    /// Leaderboard cache lifetime
    pub cache_ttl_secs: u64,
    /// Rows returned when the caller gives no limit
    pub default_limit: usize,
    /// Hard cap on rows per read
    pub max_limit: usize,
    /// Rows fetched into the cache on a miss
    pub cache_rows: usize,

    // === Submissions ===
    /// Raw nickname length limit, checked before sanitizing
    pub max_nickname_len: usize,
    /// Secret the validation hash key is derived from
    pub secret_key: String,
    /// Token for the clear operation; clearing is disabled when unset
    pub admin_token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage: StorageBackend::Memory,
            data_path: PathBuf::from("leaderboard.json"),
            environment: Environment::Development,

            cache_ttl_secs: 30,
            default_limit: 50,
            max_limit: 100,
            cache_rows: 100,

            max_nickname_len: 20,
            secret_key: "donut-runner-secret-2024".to_string(),
            admin_token: None,
        }
    }
}

impl Settings {
    /// Read settings from a JSON file
    pub fn load_file(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Settings file (if any) plus environment overrides
    ///
    /// An unreadable settings file is logged and replaced by defaults.
    pub fn load() -> Self {
        let mut settings = match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                match Self::load_file(&path) {
                    Ok(settings) => {
                        log::info!("Loaded settings from {}", path.display());
                        settings
                    }
                    Err(err) => {
                        log::warn!("Ignoring settings file {}: {}", path.display(), err);
                        Self::default()
                    }
                }
            }
            None => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings
    }

    /// Apply overrides from a key lookup (the process environment in `load`)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(STORAGE_ENV) {
            match StorageBackend::from_str(&value) {
                Some(storage) => self.storage = storage,
                None => log::warn!("Unknown storage backend {:?}, keeping {}", value, self.storage.as_str()),
            }
        }
        if let Some(value) = lookup(DATA_ENV) {
            self.data_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(SECRET_ENV) {
            self.secret_key = value;
        }
        if let Some(value) = lookup(ADMIN_TOKEN_ENV) {
            self.admin_token = Some(value);
        }
        if let Some(value) = lookup(ENVIRONMENT_ENV) {
            match Environment::from_str(&value) {
                Some(environment) => self.environment = environment,
                None => log::warn!("Unknown environment {:?}, keeping {}", value, self.environment.as_str()),
            }
        }
    }

    /// Write settings as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Open the configured store, falling back to memory if it fails
    pub fn open_store(&self) -> Box<dyn ScoreStore> {
        match self.storage {
            StorageBackend::Memory => Box::new(MemoryStore::new()),
            StorageBackend::JsonFile => match JsonFileStore::open(&self.data_path) {
                Ok(store) => Box::new(store),
                Err(err) => {
                    log::warn!(
                        "Could not open {} ({}), using in-memory scores",
                        self.data_path.display(),
                        err
                    );
                    Box::new(MemoryStore::new())
                }
            },
        }
    }
}
