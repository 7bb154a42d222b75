//! Command layer errors.
//!
//! Errors produced by a command's `run` and hooks. All variants implement
//! [`ErrorCode`] for unified handling.
//!
//! # Error Codes
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`Failed`](CommandError::Failed) | `COMMAND_FAILED` | Yes |
//! | [`InvalidOptions`](CommandError::InvalidOptions) | `COMMAND_INVALID_OPTIONS` | No |
//! | [`State`](CommandError::State) | `COMMAND_STATE` | No |
//! | [`Aborted`](CommandError::Aborted) | `COMMAND_ABORTED` | No |

use serde::{Deserialize, Serialize};
use thiserror::Error;
use warden_types::ErrorCode;

/// Command layer error.
///
/// A `run` failure is routed by the lifecycle runner into the fault event;
/// hook failures are contained per cleanup step.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
pub enum CommandError {
    /// Execution failed.
    ///
    /// Transient causes (resource unavailable, external service down);
    /// **recoverable** - rerunning the command may succeed.
    #[error("command failed: {0}")]
    Failed(String),

    /// The supplied options don't make sense to this command.
    ///
    /// **Not recoverable** - fix the invocation.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Snapshot or restore could not serialize a field.
    ///
    /// **Not recoverable** - the field type is wrong.
    #[error("state error: {0}")]
    State(String),

    /// The command stopped itself in response to a termination event.
    ///
    /// Intentional stop, **not recoverable**.
    #[error("command aborted")]
    Aborted,
}

impl ErrorCode for CommandError {
    fn code(&self) -> &'static str {
        match self {
            Self::Failed(_) => "COMMAND_FAILED",
            Self::InvalidOptions(_) => "COMMAND_INVALID_OPTIONS",
            Self::State(_) => "COMMAND_STATE",
            Self::Aborted => "COMMAND_ABORTED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}
