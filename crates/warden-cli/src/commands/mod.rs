//! Built-in commands.
//!
//! Registration is explicit: each built-in contributes its metadata
//! (name + persisted-field list) and an instance to the registry at
//! startup.

pub mod sleep;

use warden_command::CommandRegistry;

/// Registers every built-in command.
pub fn register_builtins(registry: &mut CommandRegistry) {
    registry.register(sleep::metadata(), Box::new(sleep::SleepCommand::new()));
}
