//! Local cache tier.
//!
//! State lives in a single `state.json` next to a `schema-version` tag file.
//! The tag is compared against [`crate::APP_VERSION`] on every load; any
//! mismatch (older build, newer build, missing tag) purges the cache and
//! starts from the bootstrap state rather than risking a half-compatible
//! snapshot. Corrupt JSON gets the same treatment. Neither recovery is an
//! error — the caller always gets a usable state back.

use std::fs;
use std::path::{Path, PathBuf};

use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::sanitize::sanitize_state;
use crate::types::{default_state, AppState};
use crate::util::{atomic_write_str, now_ms};

const STATE_FILE: &str = "state.json";
const VERSION_FILE: &str = "schema-version";

/// Where state is cached when the caller does not specify a directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("teamsync")
}

/// On-disk state cache. Cloning is cheap and all clones share the same
/// change-notification channel.
#[derive(Clone)]
pub struct LocalStore {
    dir: PathBuf,
    changes: broadcast::Sender<AppState>,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(StoreError::from_io)?;
        let (changes, _) = broadcast::channel(16);
        Ok(LocalStore { dir, changes })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    fn version_path(&self) -> PathBuf {
        self.dir.join(VERSION_FILE)
    }

    /// Receiver for every state committed through this store (saves, updates,
    /// sync refreshes). Slow consumers miss intermediate states, never the
    /// latest one.
    pub fn subscribe(&self) -> broadcast::Receiver<AppState> {
        self.changes.subscribe()
    }

    /// Load the cached state, recovering to the bootstrap state on schema
    /// drift, a missing cache, or corruption.
    pub fn load(&self) -> AppState {
        let tag = fs::read_to_string(self.version_path()).unwrap_or_default();
        if tag.trim() != crate::APP_VERSION {
            if self.state_path().exists() {
                log::info!(
                    "Schema version changed ({} -> {}), purging local cache",
                    if tag.trim().is_empty() { "none" } else { tag.trim() },
                    crate::APP_VERSION
                );
                let _ = fs::remove_file(self.state_path());
            }
            let _ = atomic_write_str(&self.version_path(), crate::APP_VERSION);
            return default_state();
        }

        let raw = match fs::read_to_string(self.state_path()) {
            Ok(raw) => raw,
            Err(_) => return default_state(),
        };
        let value = match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Local cache is corrupt: {}", e);
                None
            }
        };
        match value.and_then(sanitize_state) {
            // Unparseable JSON and a snapshot the typed model refuses are
            // the same kind of broken: wipe and start over.
            Some(state) => state,
            None => {
                log::warn!("Resetting local cache");
                let _ = fs::remove_file(self.state_path());
                default_state()
            }
        }
    }

    /// Persist `state`, stamping `lastUpdated` with the current time. The
    /// stamped state is broadcast to subscribers and returned.
    pub fn save(&self, mut state: AppState) -> Result<AppState, StoreError> {
        state.last_updated = now_ms();
        self.commit(state)
    }

    /// Persist `state` exactly as given, keeping its `lastUpdated`. Used when
    /// adopting a server snapshot, whose stamp must stay authoritative.
    pub fn commit(&self, state: AppState) -> Result<AppState, StoreError> {
        let json = serde_json::to_string_pretty(&state)?;
        atomic_write_str(&self.state_path(), &json).map_err(StoreError::from_io)?;
        atomic_write_str(&self.version_path(), crate::APP_VERSION).map_err(StoreError::from_io)?;
        let _ = self.changes.send(state.clone());
        Ok(state)
    }

    /// Read-modify-write against the current cached state.
    pub fn update<F>(&self, f: F) -> Result<AppState, StoreError>
    where
        F: FnOnce(&mut AppState),
    {
        let mut state = self.load();
        f(&mut state);
        self.save(state)
    }

    /// Drop the cached state but keep the schema tag, so the next load starts
    /// from the bootstrap state without re-triggering the purge path.
    pub fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(self.state_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::from_io(e)),
        }
    }
}
