//! The environment record and option types handed to a command's `run`.
//!
//! All paths are resolved by the front-end before the lifecycle starts;
//! commands never compute their own directories.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Resolved paths and identity passed into [`Command::run`].
///
/// | Field | Meaning |
/// |-------|---------|
/// | `current_work_dir` | Where the user invoked the host |
/// | `project_work_dir` | The host installation's root |
/// | `system_work_dir` | Private per-command state (checkpoints live here) |
/// | `user_work_dir` | Per-command scratch space for user-visible output |
///
/// [`Command::run`]: crate::Command::run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvironment {
    /// Name the command was selected under.
    pub command_name: String,

    /// Directory the host was invoked from.
    pub current_work_dir: PathBuf,

    /// Root of the host installation.
    pub project_work_dir: PathBuf,

    /// Private per-command system state directory, created on demand.
    pub system_work_dir: PathBuf,

    /// Per-command user state directory, created on demand.
    pub user_work_dir: PathBuf,
}

/// Declared schema for a single command option.
///
/// Validation is out of scope; the front-end only uses the default value
/// when the option is absent from the parsed arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionSpec {
    /// Human-readable option description.
    pub description: String,

    /// Value used when the option is not supplied.
    pub default: Option<Value>,
}

impl OptionSpec {
    /// Creates a spec with a description and no default.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            default: None,
        }
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Parsed argument bag: option name → JSON value, in name order.
pub type OptionBag = BTreeMap<String, Value>;
