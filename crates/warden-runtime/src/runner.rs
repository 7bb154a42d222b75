//! Command lifecycle controller.
//!
//! [`CommandRunner::execute`] drives one selected command through its whole
//! life:
//!
//! ```text
//! Idle ──► Running ──┬──► Terminated                      (clean completion)
//!                    │
//!                    └──► Interrupted ──► Cleanup ──► Terminating ──► Terminated
//!                         (signal or run fault, exactly once)
//! ```
//!
//! # Exactly-once cleanup
//!
//! The `Interrupted → Cleanup` edge is guarded by a one-shot `dying` latch:
//! however many termination events are delivered, concurrently or
//! repeatedly, only the first runs the cleanup sequence; the rest observe
//! the latch and are absorbed. The same latch protects the clean path, so
//! `finalize` runs exactly once no matter how the race between a late
//! signal and a completing `run` resolves.
//!
//! # Cleanup sequence
//!
//! persist marked fields → `on_interrupt` → `finalize` → unsubscribe router
//! → request exit. Each step is individually contained: a failing step is
//! logged and the next step still runs. The exit request goes through the
//! [`ExitGate`](crate::ExitGate), which waits for every in-flight serialized
//! delivery before actually terminating. The cleanup handler itself is one
//! of those deliveries, so the process can never die under it.
//!
//! # Fault routing
//!
//! A `run` that returns `Err` is fired into the serializer as
//! [`ShutdownEvent::Fault`] with the failure message as payload, taking the
//! same serialized cleanup path as an external signal.

use crate::{CheckpointStore, EventSerializer, ExitGate, RouterConfig, RouterGuard, RuntimeError, SignalRouter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use warden_command::{Command, CommandEnvironment, CommandMetadata, OptionBag};
use warden_event::{Event, EventError, ShutdownEvent};
use warden_types::ErrorCode;

/// Observable lifecycle position of the selected command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandLifecycleState {
    /// No command started yet.
    Idle,
    /// `run` is outstanding.
    Running,
    /// A termination event arrived while `run` was outstanding.
    Interrupted,
    /// The cleanup sequence is executing.
    Cleanup,
    /// Exit has been requested; waiting for deliveries to drain.
    Terminating,
    /// Lifecycle complete.
    Terminated,
}

impl CommandLifecycleState {
    /// Returns the lowercase name of this state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Interrupted => "interrupted",
            Self::Cleanup => "cleanup",
            Self::Terminating => "terminating",
            Self::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for CommandLifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything the cleanup handler needs, shared between the serializer
/// registrations and the runner.
struct CleanupContext {
    command: Arc<dyn Command>,
    store: CheckpointStore,
    persist: Vec<String>,
    /// One-shot latch: false→true exactly once, by whichever path gets
    /// there first.
    dying: AtomicBool,
    guard: Mutex<Option<RouterGuard>>,
    gate: Arc<ExitGate>,
    state: Arc<Mutex<CommandLifecycleState>>,
}

impl CleanupContext {
    fn set_state(&self, state: CommandLifecycleState) {
        *self.state.lock().expect("lock poisoned") = state;
    }

    /// The serialized termination handler. Registered for every
    /// interrupting event name; runs the cleanup sequence exactly once.
    async fn handle(&self, event: Event) -> Result<(), EventError> {
        if self.dying.swap(true, Ordering::SeqCst) {
            debug!(event = %event.name, "termination already handled, absorbing");
            return Ok(());
        }

        info!(event = %event.name, "termination event, starting cleanup");
        self.set_state(CommandLifecycleState::Interrupted);
        self.set_state(CommandLifecycleState::Cleanup);

        if !self.persist.is_empty() {
            let snapshot = self.command.snapshot().retain_fields(&self.persist);
            self.store.save(&snapshot);
        }

        if let Err(err) = self.command.on_interrupt(event.name).await {
            warn!(code = err.code(), "on_interrupt hook failed: {err}");
        }

        if let Err(err) = self.command.finalize(event.name).await {
            warn!(code = err.code(), "finalize hook failed: {err}");
        }

        if let Some(guard) = self.guard.lock().expect("lock poisoned").take() {
            guard.unsubscribe();
        }

        self.set_state(CommandLifecycleState::Terminating);
        let code = if event.name.is_fault() { 1 } else { 0 };
        self.gate.request_exit(code);
        Ok(())
    }
}

/// Drives one command through run → interrupt → cleanup → terminate.
pub struct CommandRunner {
    serializer: EventSerializer,
    router: SignalRouter,
    state: Arc<Mutex<CommandLifecycleState>>,
}

impl CommandRunner {
    /// Creates a runner that terminates via [`std::process::exit`].
    #[must_use]
    pub fn new(config: RouterConfig) -> Self {
        Self::with_gate(config, Arc::new(ExitGate::new()))
    }

    /// Creates a runner over a caller-supplied exit gate (test seam).
    #[must_use]
    pub fn with_gate(config: RouterConfig, gate: Arc<ExitGate>) -> Self {
        Self {
            serializer: EventSerializer::new(gate),
            router: SignalRouter::new(config),
            state: Arc::new(Mutex::new(CommandLifecycleState::Idle)),
        }
    }

    /// Returns the runner's serializer.
    #[must_use]
    pub fn serializer(&self) -> &EventSerializer {
        &self.serializer
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> CommandLifecycleState {
        *self.state.lock().expect("lock poisoned")
    }

    /// Runs `command` to completion under shutdown protection.
    ///
    /// Restores the checkpoint, registers the cleanup handler for every
    /// interrupting event, subscribes the signal router, then awaits `run`.
    /// On clean completion `finalize(Success)` is invoked and the
    /// checkpoint removed; no exit request is made, and the process exits
    /// naturally.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::SignalInstall`] if the router cannot
    /// subscribe, or [`RuntimeError::CommandFailed`] after the fault-path
    /// cleanup has completed. (In production the fault path terminates the
    /// process before this returns; with an injected terminator it is
    /// observable.)
    pub async fn execute(
        &self,
        metadata: CommandMetadata,
        mut command: Box<dyn Command>,
        environment: CommandEnvironment,
        options: OptionBag,
    ) -> Result<(), RuntimeError> {
        let store = CheckpointStore::new(&environment.system_work_dir);

        if !metadata.persist.is_empty() {
            if let Some(state) = store.load() {
                command.restore(&state.retain_fields(&metadata.persist));
                info!(command = %metadata.name, "checkpoint restored");
            }
        }

        let command: Arc<dyn Command> = Arc::from(command);
        let ctx = Arc::new(CleanupContext {
            command: Arc::clone(&command),
            store: store.clone(),
            persist: metadata.persist.clone(),
            dying: AtomicBool::new(false),
            guard: Mutex::new(None),
            gate: Arc::clone(self.serializer.gate()),
            state: Arc::clone(&self.state),
        });

        let mut registrations = Vec::new();
        for event in ShutdownEvent::INTERRUPTING {
            let ctx = Arc::clone(&ctx);
            let id = self.serializer.register(
                event,
                move |delivered| {
                    let ctx = Arc::clone(&ctx);
                    async move { ctx.handle(delivered).await }
                },
                false,
            );
            registrations.push((event, id));
        }

        let guard = self.router.subscribe(&self.serializer)?;
        *ctx.guard.lock().expect("lock poisoned") = Some(guard);

        *self.state.lock().expect("lock poisoned") = CommandLifecycleState::Running;
        info!(command = %metadata.name, "command starting");

        let outcome = match command.run(&environment, &options).await {
            Ok(()) => {
                if !ctx.dying.swap(true, Ordering::SeqCst) {
                    if let Err(err) = command.finalize(ShutdownEvent::Success).await {
                        warn!(code = err.code(), "finalize hook failed: {err}");
                    }
                    store.clear();
                    if let Some(guard) = ctx.guard.lock().expect("lock poisoned").take() {
                        guard.unsubscribe();
                    }
                    info!(command = %metadata.name, "command completed");
                }
                Ok(())
            }
            Err(err) => {
                error!(
                    command = %metadata.name,
                    code = err.code(),
                    "command run failed: {err}"
                );
                // Same serialized cleanup path as an external signal.
                self.serializer
                    .fire(ShutdownEvent::Fault, serde_json::json!(err.to_string()))
                    .await;
                Err(RuntimeError::CommandFailed(err.to_string()))
            }
        };

        for (event, id) in registrations {
            self.serializer.unregister(event, id);
        }
        *self.state.lock().expect("lock poisoned") = CommandLifecycleState::Terminated;

        outcome
    }
}
