//! Shutdown event types for warden.
//!
//! This crate defines the vocabulary shared by the signal router, the event
//! serializer, and the command lifecycle:
//!
//! ```text
//! OS signal / exit request
//!     │
//!     ▼
//! SignalRouter ──► EventSerializer ──► registered listeners
//!     (ShutdownEvent)    (Event, FIFO per name)
//! ```
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`ShutdownEvent`] | Names one class of termination notification |
//! | [`Event`] | The record a listener receives (name + payload) |
//! | [`EventError`] | Listener-level fault, contained by the serializer |

pub mod error;
pub mod signal;

pub use error::EventError;
pub use signal::{Event, ShutdownEvent};
