//! Lifecycle-managed state directory.
//!
//! [`StateDir`] owns the root under which per-command state lives and
//! guarantees its existence for the value's lifetime. Commands get two
//! private directories beneath it:
//!
//! ```text
//! <root>/system/<command>   checkpoints and other host-managed state
//! <root>/user/<command>     command-visible scratch space
//! ```
//!
//! | Variant | Created by | Drop behaviour |
//! |---------|-----------|----------------|
//! | [`Persistent`](StateDir::Persistent) | User-specified path | Kept |
//! | [`Temporary`](StateDir::Temporary) | Auto-generated | Deleted |
//!
//! The temporary variant backs test isolation and sandboxed runs; callers
//! never touch `std::env::temp_dir()` or `tempfile` directly.

use std::path::{Path, PathBuf};

/// Root of the host's per-command state, guaranteed to exist while alive.
#[derive(Debug)]
pub enum StateDir {
    /// User-specified root. Not deleted on drop.
    Persistent(PathBuf),
    /// Auto-generated temporary root. Deleted on drop via [`tempfile::TempDir`].
    Temporary(tempfile::TempDir),
}

impl StateDir {
    /// Creates a `StateDir` at a user-specified path, creating it (and
    /// parents) if absent.
    ///
    /// # Errors
    ///
    /// Returns [`std::io::Error`] if directory creation fails.
    pub fn persistent(path: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&path)?;
        Ok(Self::Persistent(path))
    }

    /// Creates a `StateDir` backed by a randomly named temporary directory,
    /// removed when the value is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`std::io::Error`] if temporary directory creation fails.
    pub fn temporary() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        Ok(Self::Temporary(dir))
    }

    /// Returns the root path. Valid while this value is alive.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Persistent(path) => path,
            Self::Temporary(dir) => dir.path(),
        }
    }

    /// Returns `true` if this root is removed on drop.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    /// Resolves and creates the `(system, user)` directory pair for a
    /// command.
    ///
    /// # Errors
    ///
    /// Returns [`std::io::Error`] if either directory cannot be created.
    pub fn command_dirs(&self, command_name: &str) -> std::io::Result<(PathBuf, PathBuf)> {
        let system = self.path().join("system").join(command_name);
        let user = self.path().join("user").join(command_name);
        std::fs::create_dir_all(&system)?;
        std::fs::create_dir_all(&user)?;
        Ok((system, user))
    }
}
