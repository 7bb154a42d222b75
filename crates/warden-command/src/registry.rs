//! Explicit command registry.
//!
//! Commands are associated with their metadata by an explicit registration
//! call at startup; there is no reflection, decorator scanning, or ambient
//! type metadata. The persisted-field list recorded here is static for the
//! process: populated once at registration, read at startup (restore) and at
//! shutdown (persist).
//!
//! Selection is one-shot: [`CommandRegistry::take`] removes and returns the
//! entry, so a command instance can be selected at most once per process
//! invocation.

use crate::Command;

/// Metadata fixed at registration time.
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    /// Name the command is selected by.
    pub name: String,

    /// Ordered field names marked for checkpoint persistence.
    pub persist: Vec<String>,
}

impl CommandMetadata {
    /// Creates metadata with no persisted fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            persist: Vec::new(),
        }
    }

    /// Marks a field for checkpoint persistence.
    #[must_use]
    pub fn persist_field(mut self, field: impl Into<String>) -> Self {
        self.persist.push(field.into());
        self
    }
}

struct Registration {
    metadata: CommandMetadata,
    command: Box<dyn Command>,
}

/// Registry of available commands, populated once at startup.
#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<Registration>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command under its metadata.
    ///
    /// A later registration under an existing name shadows the earlier one
    /// for lookup but does not remove it.
    pub fn register(&mut self, metadata: CommandMetadata, command: Box<dyn Command>) {
        self.entries.push(Registration { metadata, command });
    }

    /// Returns the number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no commands are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `(name, description)` pairs sorted by name.
    #[must_use]
    pub fn listing(&self) -> Vec<(String, String)> {
        let mut listing: Vec<_> = self
            .entries
            .iter()
            .map(|entry| {
                (
                    entry.metadata.name.clone(),
                    entry.command.description().to_string(),
                )
            })
            .collect();
        listing.sort();
        listing
    }

    /// Returns `true` if a command is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.metadata.name == name)
    }

    /// Removes and returns the command registered under `name`.
    ///
    /// A second `take` for the same name returns `None`
    /// unless the name was registered more than once.
    pub fn take(&mut self, name: &str) -> Option<(CommandMetadata, Box<dyn Command>)> {
        let index = self
            .entries
            .iter()
            .rposition(|entry| entry.metadata.name == name)?;
        let entry = self.entries.remove(index);
        Some((entry.metadata, entry.command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CommandEnvironment, CommandError, OptionBag};
    use async_trait::async_trait;

    struct NamedCommand {
        description: &'static str,
    }

    #[async_trait]
    impl Command for NamedCommand {
        fn description(&self) -> &str {
            self.description
        }

        async fn run(
            &self,
            _environment: &CommandEnvironment,
            _options: &OptionBag,
        ) -> Result<(), CommandError> {
            Ok(())
        }
    }

    fn named(description: &'static str) -> Box<dyn Command> {
        Box::new(NamedCommand { description })
    }

    #[test]
    fn register_and_take() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandMetadata::new("sync"), named("synchronizes"));

        assert!(registry.contains("sync"));
        assert_eq!(registry.len(), 1);

        let (metadata, command) = registry.take("sync").expect("sync is registered");
        assert_eq!(metadata.name, "sync");
        assert_eq!(command.description(), "synchronizes");
    }

    #[test]
    fn take_is_one_shot() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandMetadata::new("sync"), named("synchronizes"));

        assert!(registry.take("sync").is_some());
        assert!(registry.take("sync").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn take_unknown_is_none() {
        let mut registry = CommandRegistry::new();
        assert!(registry.take("missing").is_none());
    }

    #[test]
    fn listing_is_name_sorted() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandMetadata::new("zeta"), named("last"));
        registry.register(CommandMetadata::new("alpha"), named("first"));

        let listing = registry.listing();
        assert_eq!(
            listing,
            vec![
                ("alpha".to_string(), "first".to_string()),
                ("zeta".to_string(), "last".to_string()),
            ]
        );
    }

    #[test]
    fn later_registration_shadows_earlier() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandMetadata::new("sync"), named("old"));
        registry.register(CommandMetadata::new("sync"), named("new"));

        let (_, command) = registry.take("sync").expect("sync is registered");
        assert_eq!(command.description(), "new");
    }

    #[test]
    fn persist_metadata_is_ordered() {
        let metadata = CommandMetadata::new("sync")
            .persist_field("cursor")
            .persist_field("count");

        assert_eq!(metadata.persist, vec!["cursor", "count"]);
    }
}
