//! The exit gate: one-shot, drain-aware process termination.
//!
//! Every termination request flows through [`ExitGate::request_exit`]. The
//! first call records the exit code; all later calls are no-ops for the
//! rest of the process lifetime. The recorded exit fires only once the
//! serializer reports zero in-flight handler invocations, checked at
//! request time and again after each invocation the drain loop completes.
//!
//! This closes the race where an asynchronous cleanup handler is still
//! suspended when the host's default termination path would otherwise end
//! the process before the handler's continuation runs.
//!
//! # Terminator
//!
//! The irreversible action is an injectable [`Terminator`], defaulting to
//! [`std::process::exit`]. Tests inject a recording closure and observe the
//! code instead of dying.

use std::sync::Mutex;
use tracing::debug;

/// The irreversible termination action.
pub type Terminator = Box<dyn Fn(i32) + Send + Sync>;

#[derive(Default)]
struct GateState {
    /// Exit code of the first request, if any.
    requested: Option<i32>,
    /// Set once the terminator has been invoked.
    fired: bool,
    /// Serializer invocations currently captured but not fully processed.
    in_flight: usize,
}

/// One-shot gate between exit requests and actual termination.
pub struct ExitGate {
    state: Mutex<GateState>,
    terminator: Terminator,
}

impl ExitGate {
    /// Creates a gate that terminates via [`std::process::exit`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_terminator(Box::new(|code| std::process::exit(code)))
    }

    /// Creates a gate with a custom termination action.
    #[must_use]
    pub fn with_terminator(terminator: Terminator) -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            terminator,
        }
    }

    /// Requests process termination with `code`.
    ///
    /// The first call records the request; every subsequent call is a
    /// no-op. Termination happens immediately if no handler invocation is
    /// in flight, otherwise the moment the last one drains.
    pub fn request_exit(&self, code: i32) {
        let fire = {
            let mut state = self.state.lock().expect("lock poisoned");
            if state.requested.is_some() {
                debug!(code, "exit already requested, ignoring");
                return;
            }
            state.requested = Some(code);
            if state.in_flight == 0 && !state.fired {
                state.fired = true;
                true
            } else {
                debug!(
                    code,
                    in_flight = state.in_flight,
                    "exit deferred until handlers drain"
                );
                false
            }
        };

        if fire {
            (self.terminator)(code);
        }
    }

    /// Returns `true` once an exit has been requested.
    #[must_use]
    pub fn exit_requested(&self) -> bool {
        self.state.lock().expect("lock poisoned").requested.is_some()
    }

    /// Returns the number of in-flight handler invocations.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.state.lock().expect("lock poisoned").in_flight
    }

    /// Records one captured invocation. Called by the serializer at
    /// enqueue time, atomically with the enqueue itself.
    pub(crate) fn enter(&self) {
        self.state.lock().expect("lock poisoned").in_flight += 1;
    }

    /// Records completion of `n` invocations and releases a pending exit
    /// if the count reached zero.
    pub(crate) fn leave_n(&self, n: usize) {
        let fire = {
            let mut state = self.state.lock().expect("lock poisoned");
            state.in_flight = state.in_flight.saturating_sub(n);
            if state.in_flight == 0 && !state.fired {
                if let Some(code) = state.requested {
                    state.fired = true;
                    Some(code)
                } else {
                    None
                }
            } else {
                None
            }
        };

        if let Some(code) = fire {
            (self.terminator)(code);
        }
    }

    /// Records completion of one invocation.
    pub(crate) fn leave(&self) {
        self.leave_n(1);
    }
}

impl Default for ExitGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Gate whose terminator records codes instead of exiting.
    fn recording_gate() -> (Arc<ExitGate>, Arc<Mutex<Vec<i32>>>) {
        let exits = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&exits);
        let gate = ExitGate::with_terminator(Box::new(move |code| {
            recorder.lock().expect("lock poisoned").push(code);
        }));
        (Arc::new(gate), exits)
    }

    #[test]
    fn idle_gate_fires_immediately() {
        let (gate, exits) = recording_gate();

        gate.request_exit(0);

        assert_eq!(*exits.lock().expect("lock poisoned"), vec![0]);
    }

    #[test]
    fn second_request_is_noop() {
        let (gate, exits) = recording_gate();

        gate.request_exit(3);
        gate.request_exit(7);

        assert_eq!(*exits.lock().expect("lock poisoned"), vec![3]);
    }

    #[test]
    fn busy_gate_defers_until_drained() {
        let (gate, exits) = recording_gate();

        gate.enter();
        gate.enter();
        gate.request_exit(1);
        assert!(exits.lock().expect("lock poisoned").is_empty());
        assert!(gate.exit_requested());

        gate.leave();
        assert!(exits.lock().expect("lock poisoned").is_empty());

        gate.leave();
        assert_eq!(*exits.lock().expect("lock poisoned"), vec![1]);
    }

    #[test]
    fn drain_without_request_does_not_fire() {
        let (gate, exits) = recording_gate();

        gate.enter();
        gate.leave();

        assert!(exits.lock().expect("lock poisoned").is_empty());
        assert!(!gate.exit_requested());
    }

    #[test]
    fn leave_n_releases_batch() {
        let (gate, exits) = recording_gate();

        gate.enter();
        gate.enter();
        gate.enter();
        gate.request_exit(2);

        gate.leave_n(3);
        assert_eq!(*exits.lock().expect("lock poisoned"), vec![2]);
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn terminator_fires_at_most_once() {
        let (gate, exits) = recording_gate();

        gate.enter();
        gate.request_exit(1);
        gate.leave();
        // Re-entering and draining again must not re-fire.
        gate.enter();
        gate.leave();

        assert_eq!(*exits.lock().expect("lock poisoned"), vec![1]);
    }
}
