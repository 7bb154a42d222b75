//! Per-event serialization of asynchronous listeners.
//!
//! The [`EventSerializer`] guarantees that listeners for the same
//! [`ShutdownEvent`] never interleave: each delivery is captured into a
//! per-event FIFO queue, and a single drain loop per event processes queued
//! deliveries one at a time, awaiting every registered listener in
//! registration order before moving on.
//!
//! # Drain discipline
//!
//! Each event name keeps an `active` counter of captured-but-unprocessed
//! deliveries. Only the delivery that moves `active` from 0 to 1 runs the
//! drain loop; all others enqueue and then await their own completion
//! handle, so a caller that fires while a drain is running is itself
//! serialized behind the deliveries already queued.
//!
//! ```text
//! fire(interrupt) ─┬─ active 0→1 ─► drain: [inv1] [inv2] [inv3] ...
//! fire(interrupt) ─┤  active 1→2 ─► enqueue, await inv2 processed
//! fire(interrupt) ─┘  active 2→3 ─► enqueue, await inv3 processed
//! ```
//!
//! Every counter or queue mutation happens inside one mutex acquisition
//! with no await point, so an increment and its enqueue are atomic with
//! respect to suspension.
//!
//! # Exit coupling
//!
//! The serializer reports each captured delivery to the [`ExitGate`] and
//! each completed one back, so a pending exit request fires exactly when
//! the last in-flight delivery drains.
//!
//! # Listener faults
//!
//! A listener returning `Err` is logged and skipped; it never aborts the
//! drain loop, never prevents the `active` decrement, and never blocks
//! termination.

use crate::gate::ExitGate;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{debug, warn};
use warden_event::{Event, EventError, ShutdownEvent};
use warden_types::ErrorCode;

/// Boxed listener future.
pub type ListenerFuture = Pin<Box<dyn Future<Output = Result<(), EventError>> + Send>>;

/// Type-erased listener callback.
type Listener = Arc<dyn Fn(Event) -> ListenerFuture + Send + Sync>;

/// Token identifying one listener registration.
///
/// Listener identity is by token, not by closure reference: `register`
/// returns the id and `unregister` takes it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registration {
    id: ListenerId,
    fire_once: bool,
    listener: Listener,
}

/// One captured delivery: the event record plus the completion handle of
/// the `fire` caller.
struct Invocation {
    event: Event,
    done: oneshot::Sender<()>,
}

#[derive(Default)]
struct EventEntry {
    /// Registration-ordered listener set.
    listeners: Vec<Registration>,
    /// Captured deliveries awaiting the drain loop, oldest first.
    queue: VecDeque<Invocation>,
    /// Captured-but-unprocessed deliveries. Drain runs iff this moves 0→1.
    active: usize,
}

#[derive(Default)]
struct SerializerState {
    entries: HashMap<ShutdownEvent, EventEntry>,
    next_listener_id: u64,
}

/// Serializes asynchronous listener execution per event name.
///
/// Cheap to clone; clones share the same state and exit gate.
#[derive(Clone)]
pub struct EventSerializer {
    state: Arc<Mutex<SerializerState>>,
    gate: Arc<ExitGate>,
}

impl EventSerializer {
    /// Creates a serializer coupled to `gate`.
    #[must_use]
    pub fn new(gate: Arc<ExitGate>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SerializerState::default())),
            gate,
        }
    }

    /// Returns the coupled exit gate.
    #[must_use]
    pub fn gate(&self) -> &Arc<ExitGate> {
        &self.gate
    }

    /// Registers `listener` for `name`.
    ///
    /// Listeners for the same name run in registration order within one
    /// delivery. A `fire_once` listener is removed right after its first
    /// invocation, successful or failed.
    pub fn register<F, Fut>(&self, name: ShutdownEvent, listener: F, fire_once: bool) -> ListenerId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), EventError>> + Send + 'static,
    {
        let wrapped: Listener =
            Arc::new(move |event| -> ListenerFuture { Box::pin(listener(event)) });

        let mut state = self.state.lock().expect("lock poisoned");
        state.next_listener_id += 1;
        let id = ListenerId(state.next_listener_id);
        state.entries.entry(name).or_default().listeners.push(Registration {
            id,
            fire_once,
            listener: wrapped,
        });
        id
    }

    /// Removes one listener registration. Unknown ids are ignored.
    pub fn unregister(&self, name: ShutdownEvent, id: ListenerId) {
        let mut state = self.state.lock().expect("lock poisoned");
        if let Some(entry) = state.entries.get_mut(&name) {
            entry.listeners.retain(|registration| registration.id != id);
        }
    }

    /// Clears listeners and pending deliveries.
    ///
    /// With `Some(name)`, only that event is cleared; with `None`, every
    /// event is. Dropped deliveries resolve their callers' futures without
    /// having run any listener. Intended for test isolation and the
    /// success-path teardown.
    pub fn unregister_all(&self, name: Option<ShutdownEvent>) {
        let dropped = {
            let mut state = self.state.lock().expect("lock poisoned");
            let mut dropped = 0;
            match name {
                Some(name) => {
                    if let Some(entry) = state.entries.get_mut(&name) {
                        dropped += clear_entry(entry);
                    }
                }
                None => {
                    for entry in state.entries.values_mut() {
                        dropped += clear_entry(entry);
                    }
                }
            }
            dropped
        };

        // Dropped deliveries were counted in-flight at capture time.
        if dropped > 0 {
            self.gate.leave_n(dropped);
        }
    }

    /// Returns the number of listeners registered for `name`.
    #[must_use]
    pub fn listener_count(&self, name: ShutdownEvent) -> usize {
        let state = self.state.lock().expect("lock poisoned");
        state
            .entries
            .get(&name)
            .map(|entry| entry.listeners.len())
            .unwrap_or(0)
    }

    /// Fires `name` with `payload`.
    ///
    /// The delivery is captured before this method returns; the returned
    /// future resolves once this particular delivery has been fully
    /// processed (every listener awaited). It must be awaited: when this
    /// call is the one that moves the event's `active` counter from 0 to 1,
    /// the returned future is the drain loop.
    pub fn fire(
        &self,
        name: ShutdownEvent,
        payload: serde_json::Value,
    ) -> impl Future<Output = ()> + Send + 'static {
        let (done_tx, done_rx) = oneshot::channel();

        let run_drain = {
            let mut state = self.state.lock().expect("lock poisoned");
            let entry = state.entries.entry(name).or_default();
            entry.queue.push_back(Invocation {
                event: Event::new(name, payload),
                done: done_tx,
            });
            entry.active += 1;
            self.gate.enter();
            entry.active == 1
        };

        let this = self.clone();
        async move {
            if run_drain {
                this.drain(name).await;
            }
            // Resolves when our invocation is processed, or immediately if
            // it was dropped by unregister_all.
            let _ = done_rx.await;
        }
    }

    /// Processes every queued delivery for `name`, one at a time.
    async fn drain(&self, name: ShutdownEvent) {
        loop {
            let Some(invocation) = ({
                let mut state = self.state.lock().expect("lock poisoned");
                state
                    .entries
                    .get_mut(&name)
                    .and_then(|entry| entry.queue.pop_front())
            }) else {
                break;
            };

            // Snapshot the live listener set: listeners added or removed
            // mid-drain take effect from the next queued delivery on.
            let listeners: Vec<(ListenerId, bool, Listener)> = {
                let state = self.state.lock().expect("lock poisoned");
                state
                    .entries
                    .get(&name)
                    .map(|entry| {
                        entry
                            .listeners
                            .iter()
                            .map(|r| (r.id, r.fire_once, Arc::clone(&r.listener)))
                            .collect()
                    })
                    .unwrap_or_default()
            };

            for (id, fire_once, listener) in listeners {
                if let Err(err) = listener(invocation.event.clone()).await {
                    warn!(
                        event = %name,
                        code = err.code(),
                        "listener failed during delivery: {err}"
                    );
                }
                if fire_once {
                    self.unregister(name, id);
                }
            }

            {
                let mut state = self.state.lock().expect("lock poisoned");
                if let Some(entry) = state.entries.get_mut(&name) {
                    entry.active = entry.active.saturating_sub(1);
                }
            }

            let _ = invocation.done.send(());
            debug!(event = %name, "delivery processed");

            // Releases a pending exit the moment the last in-flight
            // delivery (across all event names) completes.
            self.gate.leave();
        }
    }
}

/// Clears an entry's listeners and queue, returning the number of dropped
/// queued deliveries.
fn clear_entry(entry: &mut EventEntry) -> usize {
    entry.listeners.clear();
    let dropped = entry.queue.len();
    entry.active = entry.active.saturating_sub(dropped);
    entry.queue.clear();
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::time::Duration;

    fn recording_gate() -> (Arc<ExitGate>, Arc<Mutex<Vec<i32>>>) {
        let exits = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&exits);
        let gate = ExitGate::with_terminator(Box::new(move |code| {
            recorder.lock().expect("lock poisoned").push(code);
        }));
        (Arc::new(gate), exits)
    }

    fn serializer() -> (EventSerializer, Arc<Mutex<Vec<i32>>>) {
        let (gate, exits) = recording_gate();
        (EventSerializer::new(gate), exits)
    }

    /// Shared log listeners append to, for asserting execution order.
    type Log = Arc<Mutex<Vec<String>>>;

    fn log_entries(log: &Log) -> Vec<String> {
        log.lock().expect("lock poisoned").clone()
    }

    fn push(log: &Log, entry: impl Into<String>) {
        log.lock().expect("lock poisoned").push(entry.into());
    }

    #[tokio::test]
    async fn listeners_run_in_registration_order() {
        let (serializer, _) = serializer();
        let log: Log = Arc::default();

        for label in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            serializer.register(
                ShutdownEvent::Interrupt,
                move |_event| {
                    let log = Arc::clone(&log);
                    async move {
                        push(&log, label);
                        Ok(())
                    }
                },
                false,
            );
        }

        serializer.fire(ShutdownEvent::Interrupt, Value::Null).await;

        assert_eq!(log_entries(&log), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn refire_while_draining_is_serialized() {
        let (serializer, _) = serializer();
        let log: Log = Arc::default();

        for label in ["a", "b"] {
            let log = Arc::clone(&log);
            serializer.register(
                ShutdownEvent::Terminate,
                move |_event| {
                    let log = Arc::clone(&log);
                    async move {
                        push(&log, format!("{label}:start"));
                        // Suspend so the second delivery arrives mid-drain.
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        push(&log, format!("{label}:end"));
                        Ok(())
                    }
                },
                false,
            );
        }

        let first = serializer.fire(ShutdownEvent::Terminate, Value::Null);
        let second = serializer.fire(ShutdownEvent::Terminate, Value::Null);
        tokio::join!(first, second);

        // Both deliveries complete the full listener sequence without
        // interleaving: a:start a:end b:start b:end, twice.
        assert_eq!(
            log_entries(&log),
            vec![
                "a:start", "a:end", "b:start", "b:end", // delivery 1
                "a:start", "a:end", "b:start", "b:end", // delivery 2
            ]
        );
    }

    #[tokio::test]
    async fn fire_once_listener_runs_once() {
        let (serializer, _) = serializer();
        let log: Log = Arc::default();

        {
            let log = Arc::clone(&log);
            serializer.register(
                ShutdownEvent::Interrupt,
                move |_event| {
                    let log = Arc::clone(&log);
                    async move {
                        push(&log, "once");
                        Ok(())
                    }
                },
                true,
            );
        }

        serializer.fire(ShutdownEvent::Interrupt, Value::Null).await;
        serializer.fire(ShutdownEvent::Interrupt, Value::Null).await;

        assert_eq!(log_entries(&log), vec!["once"]);
        assert_eq!(serializer.listener_count(ShutdownEvent::Interrupt), 0);
    }

    #[tokio::test]
    async fn listener_error_does_not_abort_drain() {
        let (serializer, _) = serializer();
        let log: Log = Arc::default();

        serializer.register(
            ShutdownEvent::Quit,
            |_event| async { Err(EventError::HandlerFailed("intentional".into())) },
            false,
        );
        {
            let log = Arc::clone(&log);
            serializer.register(
                ShutdownEvent::Quit,
                move |_event| {
                    let log = Arc::clone(&log);
                    async move {
                        push(&log, "survivor");
                        Ok(())
                    }
                },
                false,
            );
        }

        serializer.fire(ShutdownEvent::Quit, Value::Null).await;

        assert_eq!(log_entries(&log), vec!["survivor"]);
    }

    #[tokio::test]
    async fn exit_is_deferred_until_drain_completes() {
        let (serializer, exits) = serializer();

        {
            let gate = Arc::clone(serializer.gate());
            let exits = Arc::clone(&exits);
            serializer.register(
                ShutdownEvent::Interrupt,
                move |_event| {
                    let gate = Arc::clone(&gate);
                    let exits = Arc::clone(&exits);
                    async move {
                        gate.request_exit(5);
                        // The request must not have fired mid-delivery.
                        assert!(exits.lock().expect("lock poisoned").is_empty());
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Ok(())
                    }
                },
                false,
            );
        }

        serializer.fire(ShutdownEvent::Interrupt, Value::Null).await;

        assert_eq!(*exits.lock().expect("lock poisoned"), vec![5]);
    }

    #[tokio::test]
    async fn double_exit_request_uses_first_code() {
        let (serializer, exits) = serializer();

        {
            let gate = Arc::clone(serializer.gate());
            serializer.register(
                ShutdownEvent::Terminate,
                move |_event| {
                    let gate = Arc::clone(&gate);
                    async move {
                        gate.request_exit(3);
                        gate.request_exit(9);
                        Ok(())
                    }
                },
                false,
            );
        }

        serializer.fire(ShutdownEvent::Terminate, Value::Null).await;

        assert_eq!(*exits.lock().expect("lock poisoned"), vec![3]);
    }

    #[tokio::test]
    async fn exit_waits_for_queued_deliveries_across_names() {
        let (serializer, exits) = serializer();

        {
            let gate = Arc::clone(serializer.gate());
            serializer.register(
                ShutdownEvent::Interrupt,
                move |_event| {
                    let gate = Arc::clone(&gate);
                    async move {
                        gate.request_exit(1);
                        Ok(())
                    }
                },
                false,
            );
        }
        serializer.register(
            ShutdownEvent::Terminate,
            |_event| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(())
            },
            false,
        );

        // A slow terminate delivery is in flight while interrupt requests
        // the exit; the exit must wait for both drains.
        let slow = serializer.fire(ShutdownEvent::Terminate, Value::Null);
        let requesting = serializer.fire(ShutdownEvent::Interrupt, Value::Null);
        tokio::join!(slow, requesting);

        assert_eq!(*exits.lock().expect("lock poisoned"), vec![1]);
    }

    #[tokio::test]
    async fn live_listener_set_is_used_per_delivery() {
        let (serializer, _) = serializer();
        let log: Log = Arc::default();

        {
            // The first delivery registers a new listener mid-drain; the
            // second delivery must see it.
            let serializer_inner = serializer.clone();
            let log = Arc::clone(&log);
            serializer.register(
                ShutdownEvent::Hangup,
                move |_event| {
                    let serializer = serializer_inner.clone();
                    let log = Arc::clone(&log);
                    async move {
                        push(&log, "original");
                        if serializer.listener_count(ShutdownEvent::Hangup) == 1 {
                            let log = Arc::clone(&log);
                            serializer.register(
                                ShutdownEvent::Hangup,
                                move |_event| {
                                    let log = Arc::clone(&log);
                                    async move {
                                        push(&log, "added-mid-drain");
                                        Ok(())
                                    }
                                },
                                false,
                            );
                        }
                        Ok(())
                    }
                },
                false,
            );
        }

        let first = serializer.fire(ShutdownEvent::Hangup, Value::Null);
        let second = serializer.fire(ShutdownEvent::Hangup, Value::Null);
        tokio::join!(first, second);

        assert_eq!(
            log_entries(&log),
            vec!["original", "original", "added-mid-drain"]
        );
    }

    #[tokio::test]
    async fn listener_can_refire_without_deadlock() {
        let (serializer, _) = serializer();
        let log: Log = Arc::default();

        {
            let serializer_inner = serializer.clone();
            let log = Arc::clone(&log);
            serializer.register(
                ShutdownEvent::Interrupt,
                move |event| {
                    let serializer = serializer_inner.clone();
                    let log = Arc::clone(&log);
                    async move {
                        push(&log, format!("seen:{}", event.payload));
                        if event.payload == serde_json::json!(1) {
                            // Refire from inside the drain: the new delivery
                            // is queued behind this one. Spawned, because
                            // awaiting our own queued delivery here would
                            // wait on the loop we are running in.
                            tokio::spawn(
                                serializer.fire(ShutdownEvent::Interrupt, serde_json::json!(2)),
                            );
                        }
                        Ok(())
                    }
                },
                false,
            );
        }

        serializer
            .fire(ShutdownEvent::Interrupt, serde_json::json!(1))
            .await;
        // Give the spawned refire a moment to drain.
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(log_entries(&log), vec!["seen:1", "seen:2"]);
    }

    #[tokio::test]
    async fn unregister_removes_listener() {
        let (serializer, _) = serializer();
        let log: Log = Arc::default();

        let id = {
            let log = Arc::clone(&log);
            serializer.register(
                ShutdownEvent::Interrupt,
                move |_event| {
                    let log = Arc::clone(&log);
                    async move {
                        push(&log, "should not run");
                        Ok(())
                    }
                },
                false,
            )
        };

        serializer.unregister(ShutdownEvent::Interrupt, id);
        serializer.fire(ShutdownEvent::Interrupt, Value::Null).await;

        assert!(log_entries(&log).is_empty());
        assert_eq!(serializer.listener_count(ShutdownEvent::Interrupt), 0);
    }

    #[tokio::test]
    async fn unregister_all_clears_every_name() {
        let (serializer, _) = serializer();

        serializer.register(ShutdownEvent::Interrupt, |_e| async { Ok(()) }, false);
        serializer.register(ShutdownEvent::Terminate, |_e| async { Ok(()) }, false);

        serializer.unregister_all(None);

        assert_eq!(serializer.listener_count(ShutdownEvent::Interrupt), 0);
        assert_eq!(serializer.listener_count(ShutdownEvent::Terminate), 0);
    }

    #[tokio::test]
    async fn unregister_all_single_name_keeps_others() {
        let (serializer, _) = serializer();

        serializer.register(ShutdownEvent::Interrupt, |_e| async { Ok(()) }, false);
        serializer.register(ShutdownEvent::Terminate, |_e| async { Ok(()) }, false);

        serializer.unregister_all(Some(ShutdownEvent::Interrupt));

        assert_eq!(serializer.listener_count(ShutdownEvent::Interrupt), 0);
        assert_eq!(serializer.listener_count(ShutdownEvent::Terminate), 1);
    }

    #[tokio::test]
    async fn fire_with_no_listeners_completes() {
        let (serializer, _) = serializer();
        serializer.fire(ShutdownEvent::Quit, Value::Null).await;
        assert_eq!(serializer.gate().in_flight(), 0);
    }

    #[tokio::test]
    async fn payload_reaches_listeners() {
        let (serializer, _) = serializer();
        let log: Log = Arc::default();

        {
            let log = Arc::clone(&log);
            serializer.register(
                ShutdownEvent::Fault,
                move |event| {
                    let log = Arc::clone(&log);
                    async move {
                        push(&log, event.payload.as_str().unwrap_or("?"));
                        Ok(())
                    }
                },
                false,
            );
        }

        serializer
            .fire(ShutdownEvent::Fault, serde_json::json!("disk full"))
            .await;

        assert_eq!(log_entries(&log), vec!["disk full"]);
    }
}
