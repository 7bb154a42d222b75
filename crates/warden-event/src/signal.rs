//! Shutdown event names and the delivery record.
//!
//! A [`ShutdownEvent`] identifies one class of termination-related
//! notification. Four of them map onto OS signals; [`Fault`] is raised by
//! the lifecycle controller when a command's `run` fails; [`Success`] is the
//! synthetic terminal delivered to `finalize` on the clean-completion path
//! and is never routed through the serializer.
//!
//! # Delivery
//!
//! Listeners receive an [`Event`]: the event name plus a JSON payload. OS
//! signals carry a null payload; a `Fault` carries the failure message.
//!
//! [`Fault`]: ShutdownEvent::Fault
//! [`Success`]: ShutdownEvent::Success

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Names one class of termination-related notification.
///
/// | Variant | Source | Routed through serializer |
/// |---------|--------|---------------------------|
/// | `Interrupt` | SIGINT | Yes |
/// | `Terminate` | SIGTERM | Yes |
/// | `Quit` | SIGQUIT | Yes |
/// | `Hangup` | SIGHUP (opt-in) | Yes |
/// | `Fault` | command `run` failure | Yes |
/// | `Success` | clean completion | No (terminal value only) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShutdownEvent {
    /// Interactive interrupt (SIGINT, Ctrl-C).
    Interrupt,

    /// Termination request (SIGTERM).
    Terminate,

    /// Quit request (SIGQUIT).
    Quit,

    /// Terminal hang-up (SIGHUP). Disabled by default in the router.
    Hangup,

    /// Uncaught command failure, routed through the same cleanup path
    /// as an external signal.
    Fault,

    /// Synthetic terminal for the clean-completion path. Passed to a
    /// command's `finalize` hook; never fired as a signal.
    Success,
}

impl ShutdownEvent {
    /// The events the signal router can subscribe to on the host.
    pub const OS_SIGNALS: [ShutdownEvent; 4] = [
        ShutdownEvent::Interrupt,
        ShutdownEvent::Terminate,
        ShutdownEvent::Quit,
        ShutdownEvent::Hangup,
    ];

    /// Every event that can trigger the cleanup sequence: the OS signals
    /// plus [`Fault`](ShutdownEvent::Fault).
    pub const INTERRUPTING: [ShutdownEvent; 5] = [
        ShutdownEvent::Interrupt,
        ShutdownEvent::Terminate,
        ShutdownEvent::Quit,
        ShutdownEvent::Hangup,
        ShutdownEvent::Fault,
    ];

    /// Returns the stable lowercase name of this event.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interrupt => "interrupt",
            Self::Terminate => "terminate",
            Self::Quit => "quit",
            Self::Hangup => "hangup",
            Self::Fault => "fault",
            Self::Success => "success",
        }
    }

    /// Returns `true` if this event maps onto an OS signal.
    #[must_use]
    pub fn is_os_signal(&self) -> bool {
        matches!(
            self,
            Self::Interrupt | Self::Terminate | Self::Quit | Self::Hangup
        )
    }

    /// Returns `true` if this is the uncaught-fault channel.
    #[must_use]
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault)
    }

    /// Returns `true` if this is the clean-completion terminal.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for ShutdownEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The record a listener receives for one delivery.
///
/// Captures the arguments of a single `fire` call: the event name and an
/// arbitrary JSON payload. Queued invocations carry their `Event` with them
/// until the drain loop processes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Which event fired.
    pub name: ShutdownEvent,

    /// Caller-supplied payload. `Value::Null` for plain OS signals; the
    /// failure message for a fault.
    pub payload: Value,
}

impl Event {
    /// Creates a new delivery record.
    #[must_use]
    pub fn new(name: ShutdownEvent, payload: Value) -> Self {
        Self { name, payload }
    }

    /// Creates a delivery record with no payload.
    #[must_use]
    pub fn bare(name: ShutdownEvent) -> Self {
        Self {
            name,
            payload: Value::Null,
        }
    }
}
