//! Command capability surface for warden.
//!
//! A command is a pluggable unit of work the host selects once per process
//! invocation and drives through a well-defined lifecycle:
//!
//! ```text
//! restore ──► run ──┬──► finalize(success)           (clean path)
//!                   │
//!                   └──► persist ──► on_interrupt ──► finalize(signal)
//!                        (signal or fault path, exactly once)
//! ```
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Command`] | The capability trait implemented by each command |
//! | [`CommandRegistry`] | Explicit registration + one-shot selection |
//! | [`CommandMetadata`] | Name and persisted-field list, fixed at registration |
//! | [`CommandEnvironment`] | Resolved work-dir paths handed to `run` |
//! | [`CheckpointState`] | Flat field-name → value map persisted across restarts |
//!
//! Discovery, argument parsing, and schema validation are the front-end's
//! concern; this crate only defines what a resolved command looks like.

pub mod command;
pub mod environment;
pub mod error;
pub mod registry;
pub mod state;

pub use command::Command;
pub use environment::{CommandEnvironment, OptionBag, OptionSpec};
pub use error::CommandError;
pub use registry::{CommandMetadata, CommandRegistry};
pub use state::CheckpointState;
