//! Runtime layer errors.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`RuntimeError::SignalInstall`] | `RUNTIME_SIGNAL_INSTALL` | No |
//! | [`RuntimeError::AlreadySubscribed`] | `RUNTIME_ALREADY_SUBSCRIBED` | No |
//! | [`RuntimeError::CommandFailed`] | `RUNTIME_COMMAND_FAILED` | Yes |
//! | [`RuntimeError::Io`] | `RUNTIME_IO` | Yes |

use thiserror::Error;
use warden_types::ErrorCode;

/// Runtime layer error.
///
/// Failures within the signal router, lifecycle runner, and state
/// directories. Checkpoint I/O never surfaces here; persistence faults are
/// contained inside [`CheckpointStore`](crate::CheckpointStore).
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Installing an OS signal handler failed.
    #[error("failed to install signal handler for {signal}: {source}")]
    SignalInstall {
        /// The signal that could not be installed.
        signal: &'static str,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The router is already subscribed.
    #[error("signal router already subscribed")]
    AlreadySubscribed,

    /// The selected command's `run` failed; cleanup has already completed.
    #[error("command failed: {0}")]
    CommandFailed(String),

    /// A state directory could not be created.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorCode for RuntimeError {
    fn code(&self) -> &'static str {
        match self {
            Self::SignalInstall { .. } => "RUNTIME_SIGNAL_INSTALL",
            Self::AlreadySubscribed => "RUNTIME_ALREADY_SUBSCRIBED",
            Self::CommandFailed(_) => "RUNTIME_COMMAND_FAILED",
            Self::Io(_) => "RUNTIME_IO",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::CommandFailed(_) | Self::Io(_))
    }
}
