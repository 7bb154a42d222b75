//! Checkpoint state: the flat field map persisted across a restart boundary.
//!
//! A [`CheckpointState`] is an ordered mapping from persisted field name to
//! its JSON value. It is the in-memory form of `checkpoint.json`: created by
//! a command's `snapshot`, filtered through the registered field list, and
//! handed back to `restore` on the next startup.
//!
//! Restoration is best-effort: a missing field or a value that no
//! longer deserializes into the expected type is silently skipped, so a
//! stale checkpoint can never prevent a command from starting.

use crate::CommandError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Ordered flat mapping of persisted field name → JSON value.
///
/// # Example
///
/// ```
/// use warden_command::CheckpointState;
///
/// let mut state = CheckpointState::new();
/// state.set("count", &42u64).expect("u64 serializes");
/// state.set("label", &"resumed").expect("str serializes");
///
/// assert_eq!(state.get_as::<u64>("count"), Some(42));
/// assert_eq!(state.get_as::<String>("label"), Some("resumed".into()));
/// assert_eq!(state.get_as::<u64>("missing"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointState {
    fields: BTreeMap<String, Value>,
}

impl CheckpointState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no fields are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the number of recorded fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Records a field value.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::State`] if the value cannot be serialized
    /// to JSON.
    pub fn set<T: Serialize>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<(), CommandError> {
        let value =
            serde_json::to_value(value).map_err(|err| CommandError::State(err.to_string()))?;
        self.fields.insert(name.into(), value);
        Ok(())
    }

    /// Returns the raw value of a field, if recorded.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Deserializes a field into a concrete type.
    ///
    /// Returns `None` if the field is absent or the stored value does not
    /// deserialize. Restoration is best-effort, never an error.
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.fields
            .get(name)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Returns a copy containing only the named fields.
    ///
    /// The lifecycle runner applies this with the registered persisted-field
    /// list on both the save and restore paths.
    #[must_use]
    pub fn retain_fields(&self, names: &[String]) -> CheckpointState {
        let fields = self
            .fields
            .iter()
            .filter(|(name, _)| names.iter().any(|n| n == *name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self { fields }
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}
