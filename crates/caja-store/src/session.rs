//! # Session Persistence
//!
//! Persists the resolved current user across restarts, under a single
//! namespaced storage key. The collection snapshots themselves are NOT
//! persisted - they rehydrate from the document store on the first
//! subscription load, which is always fresher than anything on disk.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use caja_core::User;

/// Namespaced storage key for the persisted session.
pub const SESSION_STORAGE_KEY: &str = "caja-pos-session";

/// Errors from the session persistence layer.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The on-disk session shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSession {
    /// Storage key, written for forward compatibility with a multi-key file.
    key: String,
    current_user: Option<User>,
}

/// File-backed session store.
///
/// The file holds one JSON object keyed by [`SESSION_STORAGE_KEY`]; a
/// missing file simply means "nobody is logged in".
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SessionStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted current user, if any.
    ///
    /// A missing file is a clean "no session"; a malformed file is treated
    /// the same way (stale formats must never block startup).
    pub fn load(&self) -> Option<User> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<PersistedSession>(&raw) {
            Ok(session) if session.key == SESSION_STORAGE_KEY => session.current_user,
            Ok(_) | Err(_) => {
                debug!(path = %self.path.display(), "Discarding unreadable session file");
                None
            }
        }
    }

    /// Persists the current user.
    pub fn save(&self, user: &User) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let session = PersistedSession {
            key: SESSION_STORAGE_KEY.to_string(),
            current_user: Some(user.clone()),
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&session)?)?;
        debug!(path = %self.path.display(), user = %user.username, "Session saved");
        Ok(())
    }

    /// Clears the persisted session (logout).
    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
