//! StateStore - asn_state.json persistence

use crate::models::AllocationState;
use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the watermark map inside the state directory
pub const STATE_FILE: &str = "asn_state.json";

/// Errors raised while persisting state
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to create state directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write state file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to replace {path}: {source}")]
    Persist {
        path: PathBuf,
        source: tempfile::PersistError,
    },
}

/// How the state returned by [`StateStore::load`] was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No state file yet
    Absent,
    /// State file read and parsed
    Loaded,
    /// State file exists but could not be read
    Unreadable { reason: String },
    /// State file could not be parsed; it is left untouched
    Malformed { reason: String },
}

/// State snapshot plus how it was obtained
#[derive(Debug, Clone)]
pub struct LoadedState {
    pub state: AllocationState,
    pub outcome: LoadOutcome,
}

/// Durable watermark storage in a dedicated directory
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    /// Read the persisted watermarks.
    ///
    /// Never fails and never writes: a missing, unreadable or malformed file
    /// yields an empty state, and the outcome says which of those happened.
    pub fn load(&self) -> LoadedState {
        let path = self.path();
        if !path.exists() {
            return LoadedState {
                state: AllocationState::new(),
                outcome: LoadOutcome::Absent,
            };
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                return LoadedState {
                    state: AllocationState::new(),
                    outcome: LoadOutcome::Unreadable {
                        reason: e.to_string(),
                    },
                };
            }
        };

        match serde_json::from_str::<AllocationState>(&content) {
            Ok(state) => LoadedState {
                state,
                outcome: LoadOutcome::Loaded,
            },
            Err(e) => LoadedState {
                state: AllocationState::new(),
                outcome: LoadOutcome::Malformed {
                    reason: e.to_string(),
                },
            },
        }
    }

    /// Persist the full watermark map, replacing the file atomically
    pub fn save(&self, state: &AllocationState) -> Result<(), StateError> {
        fs::create_dir_all(&self.dir).map_err(|source| StateError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let content = serde_json::to_string_pretty(state)?;

        // Temp file in the same directory so the rename stays on one filesystem
        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)?;
        temp.write_all(content.as_bytes())?;
        temp.write_all(b"\n")?;
        temp.as_file().sync_all()?;

        let path = self.path();
        temp.persist(&path)
            .map_err(|source| StateError::Persist { path, source })?;

        Ok(())
    }

    /// Copy the current state file to `asn_state.json.corrupt-<timestamp>`.
    ///
    /// Called before [`StateStore::save`] overwrites a file that failed to
    /// parse. Returns `None` when there is no file to keep.
    pub fn preserve_corrupt(&self) -> Result<Option<PathBuf>, StateError> {
        let path = self.path();
        if !path.is_file() {
            return Ok(None);
        }
        let backup = self.dir.join(format!(
            "{}.corrupt-{}",
            STATE_FILE,
            Utc::now().format("%Y%m%dT%H%M%S")
        ));
        fs::copy(&path, &backup)?;
        Ok(Some(backup))
    }
}
