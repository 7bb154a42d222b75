//! The `sleep` built-in: a resumable tick loop.
//!
//! Sleeps for a configurable number of ticks, recording progress after each
//! one. Interrupting the run persists the completed tick count; the next
//! invocation resumes where it left off. Exists to exercise every lifecycle
//! path end to end: clean completion, interruption, persistence, resume.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::info;
use warden_command::{
    CheckpointState, Command, CommandEnvironment, CommandError, CommandMetadata, OptionBag,
    OptionSpec,
};
use warden_event::ShutdownEvent;

/// Registration metadata: the tick counter survives interruptions.
pub fn metadata() -> CommandMetadata {
    CommandMetadata::new("sleep").persist_field("completed_ticks")
}

/// Resumable tick-sleeper.
pub struct SleepCommand {
    completed_ticks: AtomicU64,
}

impl SleepCommand {
    /// Creates the command with no completed ticks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            completed_ticks: AtomicU64::new(0),
        }
    }
}

impl Default for SleepCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Command for SleepCommand {
    fn description(&self) -> &str {
        "Sleep in short ticks, resuming from the last checkpoint"
    }

    fn options(&self) -> BTreeMap<String, OptionSpec> {
        BTreeMap::from([
            (
                "ticks".to_string(),
                OptionSpec::new("Total number of ticks to sleep").with_default(json!(50)),
            ),
            (
                "tick-ms".to_string(),
                OptionSpec::new("Tick length in milliseconds").with_default(json!(100)),
            ),
        ])
    }

    async fn run(
        &self,
        environment: &CommandEnvironment,
        options: &OptionBag,
    ) -> Result<(), CommandError> {
        let ticks = options
            .get("ticks")
            .and_then(Value::as_u64)
            .ok_or_else(|| CommandError::InvalidOptions("ticks must be a number".into()))?;
        let tick_ms = options
            .get("tick-ms")
            .and_then(Value::as_u64)
            .ok_or_else(|| CommandError::InvalidOptions("tick-ms must be a number".into()))?;

        let start = self.completed_ticks.load(Ordering::SeqCst);
        if start > 0 {
            info!(resumed_at = start, "resuming from persisted progress");
        }

        for tick in start..ticks {
            tokio::time::sleep(Duration::from_millis(tick_ms)).await;
            self.completed_ticks.store(tick + 1, Ordering::SeqCst);
        }

        println!(
            "{}: {} ticks complete",
            environment.command_name,
            self.completed_ticks.load(Ordering::SeqCst)
        );
        Ok(())
    }

    async fn on_interrupt(&self, event: ShutdownEvent) -> Result<(), CommandError> {
        info!(
            event = %event,
            completed = self.completed_ticks.load(Ordering::SeqCst),
            "interrupted, releasing resources"
        );
        // Asynchronous teardown: the host must not exit under this await.
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }

    async fn finalize(&self, event: ShutdownEvent) -> Result<(), CommandError> {
        info!(event = %event, "sleep finished");
        Ok(())
    }

    fn snapshot(&self) -> CheckpointState {
        let mut state = CheckpointState::new();
        let _ = state.set("completed_ticks", &self.completed_ticks.load(Ordering::SeqCst));
        state
    }

    fn restore(&mut self, state: &CheckpointState) {
        if let Some(completed) = state.get_as::<u64>("completed_ticks") {
            self.completed_ticks.store(completed, Ordering::SeqCst);
        }
    }
}
