//! Signal router: explicit OS-signal subscription.
//!
//! The router owns the host-signal boundary as a normal service with
//! `subscribe`/`unsubscribe`, with no ambient global mutation. Each enabled
//! signal gets one listening task that forwards every receipt into the
//! [`EventSerializer`], where delivery is serialized per event name.
//!
//! ```text
//! SIGINT  ──► task ──► serializer.fire(Interrupt)
//! SIGTERM ──► task ──► serializer.fire(Terminate)
//! SIGQUIT ──► task ──► serializer.fire(Quit)
//! SIGHUP  ──► task ──► serializer.fire(Hangup)      (opt-in)
//! ```
//!
//! The fault channel is not an OS signal; the lifecycle runner fires
//! [`ShutdownEvent::Fault`] directly when a command's `run` fails.

use crate::{EventSerializer, RuntimeError};
use serde_json::Value;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use warden_event::ShutdownEvent;

/// Which OS signals the router subscribes to.
///
/// Defaults match the host's conventional set: interrupt, terminate, and
/// quit enabled; hang-up off unless explicitly requested.
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    /// Subscribe to SIGINT.
    pub interrupt: bool,
    /// Subscribe to SIGTERM.
    pub terminate: bool,
    /// Subscribe to SIGQUIT.
    pub quit: bool,
    /// Subscribe to SIGHUP.
    pub hangup: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            interrupt: true,
            terminate: true,
            quit: true,
            hangup: false,
        }
    }
}

impl RouterConfig {
    /// Returns the `(event, signal kind, name)` triples for enabled signals.
    fn enabled(&self) -> Vec<(ShutdownEvent, SignalKind, &'static str)> {
        let mut enabled = Vec::new();
        if self.interrupt {
            enabled.push((ShutdownEvent::Interrupt, SignalKind::interrupt(), "interrupt"));
        }
        if self.terminate {
            enabled.push((ShutdownEvent::Terminate, SignalKind::terminate(), "terminate"));
        }
        if self.quit {
            enabled.push((ShutdownEvent::Quit, SignalKind::quit(), "quit"));
        }
        if self.hangup {
            enabled.push((ShutdownEvent::Hangup, SignalKind::hangup(), "hangup"));
        }
        enabled
    }
}

/// Routes OS termination signals into the event serializer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalRouter {
    config: RouterConfig,
}

impl SignalRouter {
    /// Creates a router with the given signal set.
    #[must_use]
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    /// Installs handlers for every enabled signal and starts forwarding
    /// receipts into `serializer`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::SignalInstall`] if any handler cannot be
    /// installed; no tasks are left running in that case.
    pub fn subscribe(&self, serializer: &EventSerializer) -> Result<RouterGuard, RuntimeError> {
        let mut tasks: Vec<JoinHandle<()>> = Vec::new();

        for (event, kind, name) in self.config.enabled() {
            let mut stream = match signal(kind) {
                Ok(stream) => stream,
                Err(source) => {
                    for task in &tasks {
                        task.abort();
                    }
                    return Err(RuntimeError::SignalInstall {
                        signal: name,
                        source,
                    });
                }
            };

            let serializer = serializer.clone();
            tasks.push(tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    info!(signal = %event, "termination signal received");
                    serializer.fire(event, Value::Null).await;
                }
            }));
        }

        debug!(signals = tasks.len(), "signal router subscribed");
        Ok(RouterGuard { tasks })
    }
}

/// Handle over the router's listening tasks.
///
/// Dropping the guard unsubscribes; [`unsubscribe`](Self::unsubscribe) does
/// so explicitly and is safe to call once per guard (the cleanup sequence
/// consumes the guard, so repeated signals cannot unsubscribe twice).
#[derive(Debug)]
pub struct RouterGuard {
    tasks: Vec<JoinHandle<()>>,
}

impl RouterGuard {
    /// Stops forwarding signals. Signals received afterwards get the host's
    /// default disposition.
    pub fn unsubscribe(mut self) {
        self.abort_tasks();
    }

    /// Returns the number of live listening tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    fn abort_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for RouterGuard {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}
