//! Client-side app store
//!
//! One handle is created at startup and passed to every component that needs
//! shared client state. Clones share the same state. When a file path is
//! configured, every write is persisted as JSON.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ApiError, Result};

/// Persisted client state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub last_resync_time_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Shared store handle
#[derive(Debug, Clone, Default)]
pub struct AppStore {
    state: Arc<RwLock<StoreState>>,
    path: Option<PathBuf>,
}

impl AppStore {
    /// In-memory store, nothing is persisted
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the store from `path`; a missing file starts empty
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| ApiError::Store(format!("failed to read {:?}: {}", path, e)))?;
            serde_json::from_str(&content)?
        } else {
            StoreState::default()
        };

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> StoreState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn last_resync_time(&self) -> Option<DateTime<Utc>> {
        self.snapshot().last_resync_time_utc
    }

    pub fn set_last_resync_time(&self, at: DateTime<Utc>) {
        self.update(|s| s.last_resync_time_utc = Some(at));
    }

    pub fn timezone(&self) -> Option<String> {
        self.snapshot().timezone
    }

    pub fn set_timezone(&self, timezone: impl Into<String>) {
        let timezone = timezone.into();
        self.update(|s| s.timezone = Some(timezone));
    }

    pub fn language(&self) -> Option<String> {
        self.snapshot().language
    }

    pub fn set_language(&self, language: impl Into<String>) {
        let language = language.into();
        self.update(|s| s.language = Some(language));
    }

    fn update(&self, apply: impl FnOnce(&mut StoreState)) {
        let snapshot = {
            let mut state = self
                .state
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            apply(&mut state);
            state.clone()
        };

        if let Err(e) = self.persist(&snapshot) {
            warn!(error = %e, path = ?self.path, "Failed to persist app store");
        }
    }

    fn persist(&self, state: &StoreState) -> std::io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(state)?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_in_memory_store_shares_state_between_clones() {
        let store = AppStore::in_memory();
        let reader = store.clone();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert!(reader.last_resync_time().is_none());
        store.set_last_resync_time(at);
        assert_eq!(reader.last_resync_time(), Some(at));
        assert!(store.path().is_none());
    }

    #[test]
    fn test_store_persists_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("state.json");
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap();

        {
            let store = AppStore::open(&path).unwrap();
            store.set_last_resync_time(at);
            store.set_timezone("Europe/Berlin");
            store.set_language("de");
        }

        let reopened = AppStore::open(&path).unwrap();
        assert_eq!(reopened.last_resync_time(), Some(at));
        assert_eq!(reopened.timezone().as_deref(), Some("Europe/Berlin"));
        assert_eq!(reopened.language().as_deref(), Some("de"));
    }

    #[test]
    fn test_open_rejects_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(AppStore::open(&path), Err(ApiError::Decode(_))));
    }
}
