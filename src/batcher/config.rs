// src/batcher/config.rs

use derive_builder::{Builder, UninitializedFieldError};
use serde::Deserialize;
use tokio::sync::Semaphore;

use super::types::ConfigError;

const DEFAULT_BATCH_SIZE: usize = 1000;
const DEFAULT_CAPACITY: usize = 5000;

#[derive(Debug, Clone, Builder, Deserialize)]
#[builder(
    setter(into),
    build_fn(validate = "Self::validate", error = "ConfigError")
)]
pub struct Config {
    /// Number of items grouped into one batch
    #[builder(default = "DEFAULT_BATCH_SIZE")]
    #[serde(default = "default_batch_size")]
    pub(crate) batch_size: usize,

    /// Maximum number of accepted items not yet acknowledged by the consumer
    #[builder(default = "DEFAULT_CAPACITY")]
    #[serde(default = "default_capacity")]
    pub(crate) capacity: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Config {
    /// Returns the number of items per batch
    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Returns the in-flight item bound
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Checks the sizing rules. Configs built through [`ConfigBuilder`] are
    /// already valid; deserialized ones must be checked before use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check(self.batch_size, self.capacity)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            batch_size: DEFAULT_BATCH_SIZE,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl ConfigBuilder {
    fn validate(&self) -> Result<(), ConfigError> {
        check(
            self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            self.capacity.unwrap_or(DEFAULT_CAPACITY),
        )
    }
}

fn check(batch_size: usize, capacity: usize) -> Result<(), ConfigError> {
    if batch_size == 0 {
        return Err(ConfigError::ZeroBatchSize);
    }
    if capacity < batch_size {
        return Err(ConfigError::CapacityBelowBatchSize {
            capacity,
            batch_size,
        });
    }
    // One semaphore permit backs each in-flight item.
    if capacity > Semaphore::MAX_PERMITS {
        return Err(ConfigError::CapacityTooLarge {
            capacity,
            max: Semaphore::MAX_PERMITS,
        });
    }
    Ok(())
}

impl From<UninitializedFieldError> for ConfigError {
    fn from(err: UninitializedFieldError) -> Self {
        ConfigError::MissingField(err.field_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = ConfigBuilder::default().build().unwrap();
        assert_eq!(config.batch_size(), 1000);
        assert_eq!(config.capacity(), 5000);
    }

    #[test]
    fn test_builder_rejects_zero_batch_size() {
        let err = ConfigBuilder::default()
            .batch_size(0usize)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroBatchSize));
    }

    #[test]
    fn test_builder_rejects_capacity_below_batch_size() {
        let err = ConfigBuilder::default()
            .batch_size(10usize)
            .capacity(9usize)
            .build()
            .unwrap_err();
        match err {
            ConfigError::CapacityBelowBatchSize {
                capacity,
                batch_size,
            } => {
                assert_eq!(capacity, 9);
                assert_eq!(batch_size, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_capacity_equal_to_batch_size_is_valid() {
        let config = ConfigBuilder::default()
            .batch_size(4usize)
            .capacity(4usize)
            .build()
            .unwrap();
        assert_eq!(config.capacity(), config.batch_size());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"batch_size": 250}"#).unwrap();
        assert_eq!(config.batch_size(), 250);
        assert_eq!(config.capacity(), 5000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialized_config_needs_validation() {
        let config: Config =
            serde_json::from_str(r#"{"batch_size": 100, "capacity": 10}"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CapacityBelowBatchSize { .. })
        ));
    }

    #[test]
    fn test_capacity_beyond_permit_limit_is_rejected() {
        let config: Config =
            serde_json::from_str(r#"{"batch_size": 2, "capacity": 18446744073709551615}"#)
                .unwrap();
        match config.validate() {
            Err(ConfigError::CapacityTooLarge { capacity, max }) => {
                assert_eq!(capacity, usize::MAX);
                assert_eq!(max, Semaphore::MAX_PERMITS);
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let err = ConfigBuilder::default()
            .capacity(Semaphore::MAX_PERMITS + 1)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::CapacityTooLarge { .. }));

        let config = ConfigBuilder::default()
            .capacity(Semaphore::MAX_PERMITS)
            .build()
            .unwrap();
        assert_eq!(config.capacity(), Semaphore::MAX_PERMITS);
    }
}
