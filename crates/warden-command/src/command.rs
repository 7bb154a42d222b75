//! The command capability trait.
//!
//! Every command the host can run implements [`Command`]. The runtime calls
//! the hooks in a fixed order and contains their failures: a hook returning
//! an error never skips the hooks that follow it.
//!
//! # Hooks
//!
//! | Hook | When | Default |
//! |------|------|---------|
//! | `run` | After selection and checkpoint restore | required |
//! | `on_interrupt` | Once, on the signal/fault path | no-op |
//! | `finalize` | Exactly once on every path | no-op |
//! | `snapshot` / `restore` | Shutdown persist / startup restore | empty |
//!
//! `finalize` receives [`ShutdownEvent::Success`] on the clean path and the
//! triggering event otherwise. It is the one hook guaranteed to run exactly
//! once no matter how the process ends.
//!
//! # State
//!
//! Commands that mutate persisted state during `run` hold it behind interior
//! mutability (`AtomicU64`, `Mutex<T>`): `snapshot` takes `&self` because it
//! is called from the cleanup path while `run` is still suspended.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use warden_command::{
//!     CheckpointState, Command, CommandEnvironment, CommandError, OptionBag,
//! };
//!
//! struct Countdown {
//!     remaining: AtomicU64,
//! }
//!
//! #[async_trait]
//! impl Command for Countdown {
//!     fn description(&self) -> &str {
//!         "Counts down to zero"
//!     }
//!
//!     async fn run(
//!         &self,
//!         _env: &CommandEnvironment,
//!         _options: &OptionBag,
//!     ) -> Result<(), CommandError> {
//!         while self.remaining.load(Ordering::SeqCst) > 0 {
//!             self.remaining.fetch_sub(1, Ordering::SeqCst);
//!         }
//!         Ok(())
//!     }
//!
//!     fn snapshot(&self) -> CheckpointState {
//!         let mut state = CheckpointState::new();
//!         let _ = state.set("remaining", &self.remaining.load(Ordering::SeqCst));
//!         state
//!     }
//!
//!     fn restore(&mut self, state: &CheckpointState) {
//!         if let Some(remaining) = state.get_as::<u64>("remaining") {
//!             self.remaining.store(remaining, Ordering::SeqCst);
//!         }
//!     }
//! }
//! ```

use crate::{CheckpointState, CommandEnvironment, CommandError, OptionBag, OptionSpec};
use async_trait::async_trait;
use std::collections::BTreeMap;
use warden_event::ShutdownEvent;

/// A pluggable unit of work driven by the command lifecycle runner.
///
/// Object-safe: the registry stores commands as `Box<dyn Command>` and the
/// runner shares them as `Arc<dyn Command>` between the running future and
/// the cleanup path.
#[async_trait]
pub trait Command: Send + Sync {
    /// One-line description shown in the command listing.
    fn description(&self) -> &str;

    /// Declared option schema, keyed by option name.
    ///
    /// The front-end uses this for defaults; validation is out of scope.
    fn options(&self) -> BTreeMap<String, OptionSpec> {
        BTreeMap::new()
    }

    /// The command's entry point.
    ///
    /// # Errors
    ///
    /// A returned error is routed into the [`ShutdownEvent::Fault`] path,
    /// which runs the same cleanup sequence as an external signal.
    async fn run(
        &self,
        environment: &CommandEnvironment,
        options: &OptionBag,
    ) -> Result<(), CommandError>;

    /// Called once when a termination event interrupts `run`.
    ///
    /// Runs before `finalize` on the interrupted path only. Failures are
    /// contained by the runner.
    async fn on_interrupt(&self, _event: ShutdownEvent) -> Result<(), CommandError> {
        Ok(())
    }

    /// Called exactly once on every path.
    ///
    /// Receives [`ShutdownEvent::Success`] when `run` completed cleanly,
    /// otherwise the event that triggered cleanup. Failures are contained
    /// by the runner.
    async fn finalize(&self, _event: ShutdownEvent) -> Result<(), CommandError> {
        Ok(())
    }

    /// Captures the fields marked for persistence.
    ///
    /// Called from the cleanup path while `run` may still be suspended;
    /// the runner filters the result through the registered field list.
    fn snapshot(&self) -> CheckpointState {
        CheckpointState::new()
    }

    /// Restores previously persisted fields.
    ///
    /// Called before `run`, with a state already filtered to the registered
    /// field list. Unknown or mistyped fields should be ignored.
    fn restore(&mut self, _state: &CheckpointState) {}
}
