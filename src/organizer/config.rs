//! Store configuration.

/// Storage keys for the three persisted collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    /// Key holding the task array.
    pub tasks: String,
    /// Key holding the project array.
    pub projects: String,
    /// Key holding the context array.
    pub contexts: String,
}

impl StorageKeys {
    /// Keys prefixed with `prefix_`, for sharing one backend between several
    /// organizers.
    #[must_use]
    pub fn namespaced(prefix: &str) -> Self {
        Self {
            tasks: format!("{prefix}_tasks"),
            projects: format!("{prefix}_projects"),
            contexts: format!("{prefix}_contexts"),
        }
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            tasks: "tasks".to_owned(),
            projects: "projects".to_owned(),
            contexts: "contexts".to_owned(),
        }
    }
}

/// What to do with a stored collection containing a damaged record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecoveryPolicy {
    /// Replace the whole collection with its default value.
    #[default]
    DiscardCollection,
    /// Drop only the damaged record and keep the rest.
    SkipRecord,
}

/// Configuration for a task store.
///
/// # Examples
///
/// ```
/// use clarify::organizer::config::{RecoveryPolicy, StoreConfig};
///
/// let config = StoreConfig::default();
/// assert_eq!(config.keys.tasks, "tasks");
/// assert_eq!(config.recovery, RecoveryPolicy::DiscardCollection);
///
/// let lenient = StoreConfig::default().with_recovery(RecoveryPolicy::SkipRecord);
/// assert_eq!(lenient.recovery, RecoveryPolicy::SkipRecord);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Storage keys for the three collections.
    pub keys: StorageKeys,
    /// Handling of damaged records on load.
    pub recovery: RecoveryPolicy,
    /// Whether absent projects and contexts load as the built-in starters
    /// rather than empty collections.
    pub seed_defaults: bool,
    /// Buffer size of the persistence failure channel.
    pub failure_channel_capacity: usize,
}

impl StoreConfig {
    /// Sets the storage keys.
    #[must_use]
    pub fn with_keys(mut self, keys: StorageKeys) -> Self {
        self.keys = keys;
        self
    }

    /// Sets the recovery policy.
    #[must_use]
    pub const fn with_recovery(mut self, recovery: RecoveryPolicy) -> Self {
        self.recovery = recovery;
        self
    }

    /// Enables or disables the built-in starter projects and contexts.
    #[must_use]
    pub const fn with_seed_defaults(mut self, seed_defaults: bool) -> Self {
        self.seed_defaults = seed_defaults;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            keys: StorageKeys::default(),
            recovery: RecoveryPolicy::default(),
            seed_defaults: true,
            failure_channel_capacity: 16,
        }
    }
}
