//! # Store Configuration
//!
//! Configuration for the synced store: database location, session file,
//! and the retry policy knobs.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CAJA_DB_PATH=/var/lib/caja/caja.db                                 │
//! │     CAJA_SESSION_PATH=/var/lib/caja/session.json                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/caja-pos/store.toml (Linux)                              │
//! │     ~/Library/Application Support/com.caja.caja-pos/store.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     platform data dir + caja.db / caja-pos-session.json                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # store.toml
//! database_path = "/var/lib/caja/caja.db"
//! session_path = "/var/lib/caja/session.json"
//!
//! [retry]
//! max_attempts = 3
//! timeout_ms = 10000
//! initial_backoff_ms = 200
//! max_backoff_secs = 5
//! ```

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// =============================================================================
// Retry Knobs
// =============================================================================

/// Retry policy knobs (see `retry::RetryPolicy`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per operation, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Per-attempt timeout (milliseconds).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Initial backoff between attempts (milliseconds).
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Backoff ceiling (seconds).
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: default_max_attempts(),
            timeout_ms: default_timeout_ms(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_secs: default_max_backoff_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_initial_backoff_ms() -> u64 {
    200
}
fn default_max_backoff_secs() -> u64 {
    5
}

// =============================================================================
// Store Config
// =============================================================================

/// Top-level configuration for the synced store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite file backing the document store.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// File the current session persists to across restarts.
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            database_path: default_database_path(),
            session_path: default_session_path(),
            retry: RetryConfig::default(),
        }
    }
}

fn data_dir() -> PathBuf {
    ProjectDirs::from("com", "caja", "caja-pos")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_database_path() -> PathBuf {
    data_dir().join("caja.db")
}

fn default_session_path() -> PathBuf {
    data_dir().join("caja-pos-session.json")
}

impl StoreConfig {
    /// Loads configuration: TOML file (if present) with env overrides.
    ///
    /// A missing file is not an error - defaults apply. A malformed file is
    /// reported and replaced by defaults rather than aborting startup.
    pub fn load() -> Self {
        let path = Self::config_file_path();
        let mut config = match std::fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded store config");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Malformed store config, using defaults");
                    StoreConfig::default()
                }
            },
            Err(_) => StoreConfig::default(),
        };

        if let Ok(db_path) = std::env::var("CAJA_DB_PATH") {
            config.database_path = PathBuf::from(db_path);
        }
        if let Ok(session_path) = std::env::var("CAJA_SESSION_PATH") {
            config.session_path = PathBuf::from(session_path);
        }

        config
    }

    /// Platform path of the TOML config file.
    pub fn config_file_path() -> PathBuf {
        ProjectDirs::from("com", "caja", "caja-pos")
            .map(|dirs| dirs.config_dir().join("store.toml"))
            .unwrap_or_else(|| PathBuf::from("store.toml"))
    }
}
