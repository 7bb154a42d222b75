//! Shared primitives for the warden workspace.
//!
//! This crate sits at the bottom of the dependency graph:
//!
//! ```text
//! warden-types    : ErrorCode contract          ◄── HERE
//! warden-event    : ShutdownEvent, Event
//! warden-command  : Command trait, registry, checkpoint state
//! warden-runtime  : serializer, exit gate, router, lifecycle runner
//! warden-cli      : the warden binary
//! ```
//!
//! Upper layers may depend on lower ones, never the reverse.

pub mod error;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
