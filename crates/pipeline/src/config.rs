//! Pipeline configuration loaded from environment variables.

use std::str::FromStr;

use pictura_core::assignment::{DelayRange, DEFAULT_MAX_DELAY_MS, DEFAULT_MIN_DELAY_MS};
use pictura_events::bus::DEFAULT_CAPACITY;

/// Default cap on label additions per image-created event.
pub const DEFAULT_MAX_ROUNDS: u32 = 256;

/// A configuration value that could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },

    #[error("{0}")]
    Inconsistent(String),
}

/// Read `key` from the environment, falling back to `default` when unset.
pub fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

/// Read `key` from the environment if it is set.
pub fn optional_env<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(None),
    }
}

/// Settings for the assignment worker and the event bus.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Range the simulated labeling delay is drawn from, per round.
    pub delay: DelayRange,
    /// Maximum label additions per image-created event.
    pub max_rounds: u32,
    /// Broadcast channel capacity.
    pub event_capacity: usize,
    /// Fixed RNG seed. `None` seeds from the OS; tests set it for determinism.
    pub rng_seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            delay: DelayRange::default(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            event_capacity: DEFAULT_CAPACITY,
            rng_seed: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default |
    /// |---------------------------|---------|
    /// | `ANNOTATION_MIN_DELAY_MS` | `500`   |
    /// | `ANNOTATION_MAX_DELAY_MS` | `5000`  |
    /// | `ANNOTATION_MAX_ROUNDS`   | `256`   |
    /// | `EVENT_BUS_CAPACITY`      | `1024`  |
    /// | `ANNOTATION_RNG_SEED`     | unset   |
    pub fn from_env() -> Result<Self, ConfigError> {
        let min_ms = env_or("ANNOTATION_MIN_DELAY_MS", DEFAULT_MIN_DELAY_MS)?;
        let max_ms = env_or("ANNOTATION_MAX_DELAY_MS", DEFAULT_MAX_DELAY_MS)?;
        let delay =
            DelayRange::new(min_ms, max_ms).map_err(|e| ConfigError::Inconsistent(e.to_string()))?;

        let config = Self {
            delay,
            max_rounds: env_or("ANNOTATION_MAX_ROUNDS", DEFAULT_MAX_ROUNDS)?,
            event_capacity: env_or("EVENT_BUS_CAPACITY", DEFAULT_CAPACITY)?,
            rng_seed: optional_env("ANNOTATION_RNG_SEED")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rounds == 0 {
            return Err(ConfigError::Inconsistent(
                "ANNOTATION_MAX_ROUNDS must be at least 1".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Inconsistent(
                "EVENT_BUS_CAPACITY must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_rounds_rejected() {
        let config = PipelineConfig {
            max_rounds: 0,
            ..PipelineConfig::default()
        };
        assert_matches!(config.validate(), Err(ConfigError::Inconsistent(_)));
    }

    #[test]
    fn zero_capacity_rejected() {
        let config = PipelineConfig {
            event_capacity: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unset_variable_falls_back_to_default() {
        let value: u32 = env_or("PICTURA_TEST_SURELY_UNSET_VARIABLE", 17).unwrap();
        assert_eq!(value, 17);

        let seed: Option<u64> = optional_env("PICTURA_TEST_SURELY_UNSET_VARIABLE").unwrap();
        assert_eq!(seed, None);
    }
}
