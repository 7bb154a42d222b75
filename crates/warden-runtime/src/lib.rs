//! Shutdown-safe event serialization and command lifecycle engine.
//!
//! This crate is the core of warden: it reconciles asynchronous,
//! suspend-at-await signal handlers with a host environment that can demand
//! immediate termination at any point, without duplicate invocations,
//! without deadlock, and without ever exiting while cleanup is outstanding.
//!
//! # Architecture
//!
//! ```text
//! OS signals ──► SignalRouter ──► EventSerializer ──► cleanup handler
//!                                      │                   │
//!                                      │ in-flight count   │ persist / hooks
//!                                      ▼                   ▼
//!                                   ExitGate ◄──── request_exit(code)
//!                                      │
//!                                      ▼ (only when no handler in flight)
//!                                 real termination
//! ```
//!
//! | Component | Guarantee |
//! |-----------|-----------|
//! | [`EventSerializer`] | Per-event FIFO delivery; one drain loop per name |
//! | [`ExitGate`] | First exit request wins; exit deferred until drained |
//! | [`SignalRouter`] | Explicit subscribe/unsubscribe for OS signals |
//! | [`CommandRunner`] | run → interrupt → cleanup → persist, exactly once |
//! | [`CheckpointStore`] | Best-effort field persistence across restarts |

pub mod checkpoint;
pub mod error;
pub mod gate;
pub mod router;
pub mod runner;
pub mod serializer;
pub mod state_dir;

pub use checkpoint::CheckpointStore;
pub use error::RuntimeError;
pub use gate::{ExitGate, Terminator};
pub use router::{RouterConfig, RouterGuard, SignalRouter};
pub use runner::{CommandLifecycleState, CommandRunner};
pub use serializer::{EventSerializer, ListenerId};
pub use state_dir::StateDir;
