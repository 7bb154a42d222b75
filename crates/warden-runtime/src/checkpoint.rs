//! File-backed checkpoint store.
//!
//! Persists a command's marked fields as UTF-8 JSON at
//! `<system_work_dir>/checkpoint.json`. Every operation is best-effort:
//! persistence faults are logged and swallowed, never surfaced. A broken
//! checkpoint must not prevent a command from starting or a shutdown from
//! completing.
//!
//! # Lifecycle
//!
//! | Operation | When | On failure |
//! |-----------|------|------------|
//! | [`save`](CheckpointStore::save) | Cleanup path, before hooks | logged, ignored |
//! | [`load`](CheckpointStore::load) | Startup, before `run` | `None`, file untouched |
//! | [`clear`](CheckpointStore::clear) | Clean completion | logged, ignored |
//!
//! A successfully parsed checkpoint is deleted as part of `load`: it is
//! consumed, so a crash loop cannot replay stale state forever. A file that
//! fails to parse is left in place for inspection and ignored.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use warden_command::CheckpointState;

/// File name of a checkpoint inside a command's system work directory.
pub const CHECKPOINT_FILE: &str = "checkpoint.json";

/// Best-effort persistence of a command's marked fields.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Creates a store rooted at a command's system work directory.
    #[must_use]
    pub fn new(system_work_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: system_work_dir.into().join(CHECKPOINT_FILE),
        }
    }

    /// Returns the checkpoint file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `state` to the checkpoint file, creating the directory on
    /// demand. Failures are logged and swallowed.
    pub fn save(&self, state: &CheckpointState) {
        if let Some(parent) = self.path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                debug!(path = %self.path.display(), "checkpoint dir creation failed: {err}");
                return;
            }
        }

        match serde_json::to_string_pretty(state) {
            Ok(json) => {
                if let Err(err) = fs::write(&self.path, json) {
                    debug!(path = %self.path.display(), "checkpoint write failed: {err}");
                }
            }
            Err(err) => {
                debug!(path = %self.path.display(), "checkpoint serialization failed: {err}");
            }
        }
    }

    /// Reads and consumes the checkpoint file.
    ///
    /// On a successful parse the file is deleted and the state returned.
    /// A missing file, unreadable file, or parse failure yields `None`; a
    /// file that fails to parse is left in place.
    pub fn load(&self) -> Option<CheckpointState> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) => {
                debug!(path = %self.path.display(), "no checkpoint available: {err}");
                return None;
            }
        };

        match serde_json::from_str::<CheckpointState>(&raw) {
            Ok(state) => {
                if let Err(err) = fs::remove_file(&self.path) {
                    debug!(path = %self.path.display(), "consumed checkpoint not deleted: {err}");
                }
                Some(state)
            }
            Err(err) => {
                debug!(path = %self.path.display(), "checkpoint parse failed, ignoring: {err}");
                None
            }
        }
    }

    /// Deletes the checkpoint file. Absence is not an error.
    pub fn clear(&self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                debug!(path = %self.path.display(), "checkpoint delete failed: {err}");
            }
        }
    }

    /// Returns `true` if a checkpoint file currently exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}
