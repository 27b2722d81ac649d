//! Dialect configuration.

use crate::options::OptionsConfig;

/// Default number of compare-and-set attempts before id generation gives up.
///
/// Lost races back off before retrying, so this bound is only reached when a
/// counter stays contended for a long time.
pub const DEFAULT_MAX_ID_GENERATION_ATTEMPTS: u32 = 100_000;

/// Configuration for a dialect and the handle driving it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Layered storage options.
    pub options: OptionsConfig,

    /// Compare-and-set attempts per id before failing with an id generation error.
    pub max_id_generation_attempts: u32,

    /// Whether writes are queued in a batch until flushed.
    pub batching: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            options: OptionsConfig::default(),
            max_id_generation_attempts: DEFAULT_MAX_ID_GENERATION_ATTEMPTS,
            batching: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the layered storage options.
    #[must_use]
    pub fn options(mut self, options: OptionsConfig) -> Self {
        self.options = options;
        self
    }

    /// Sets the number of id generation attempts.
    #[must_use]
    pub const fn max_id_generation_attempts(mut self, attempts: u32) -> Self {
        self.max_id_generation_attempts = attempts;
        self
    }

    /// Sets whether writes are batched.
    #[must_use]
    pub const fn batching(mut self, value: bool) -> Self {
        self.batching = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{MapStorageType, OptionsLayer};

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.max_id_generation_attempts, DEFAULT_MAX_ID_GENERATION_ATTEMPTS);
        assert!(!config.batching);
        assert_eq!(config.options, OptionsConfig::default());
    }

    #[test]
    fn builder_pattern() {
        let options = OptionsConfig::new().with_global(OptionsLayer::new().map_storage(MapStorageType::AsList));
        let config = Config::new()
            .max_id_generation_attempts(3)
            .batching(true)
            .options(options.clone());

        assert_eq!(config.max_id_generation_attempts, 3);
        assert!(config.batching);
        assert_eq!(config.options, options);
    }
}
