//! Event layer errors.
//!
//! A listener's failure is represented as an [`EventError`]. The serializer
//! contains these at the single-listener call site: the fault is logged and
//! the drain loop proceeds to the next listener, then the next queued
//! invocation. No listener error ever blocks termination.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`EventError::HandlerFailed`] | `EVENT_HANDLER_FAILED` | No |
//! | [`EventError::InvalidPayload`] | `EVENT_INVALID_PAYLOAD` | No |

use serde::{Deserialize, Serialize};
use thiserror::Error;
use warden_types::ErrorCode;

/// Event layer error.
///
/// Returned by listener futures; the serializer logs and swallows these
/// rather than propagating them.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
pub enum EventError {
    /// A registered listener failed while handling a delivery.
    ///
    /// **Not recoverable** - the delivery is not retried; the drain loop
    /// moves on.
    #[error("handler failed: {0}")]
    HandlerFailed(String),

    /// A listener could not interpret the delivery payload.
    ///
    /// **Not recoverable** - the payload is fixed at fire time.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl ErrorCode for EventError {
    fn code(&self) -> &'static str {
        match self {
            Self::HandlerFailed(_) => "EVENT_HANDLER_FAILED",
            Self::InvalidPayload(_) => "EVENT_INVALID_PAYLOAD",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
