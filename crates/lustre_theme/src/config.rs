//! Engine configuration presets

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::resolver::ConflictStrategy;

/// Configuration for a [`MappingEngine`](crate::MappingEngine)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Strategy used by `get_mapping` when no override is given
    pub default_strategy: ConflictStrategy,
    /// Maximum number of cached per-widget mappings
    pub mapping_cache_capacity: usize,
    /// Maximum number of cached selector verdicts
    pub selector_cache_capacity: usize,
    /// Maximum number of cached pattern match lists
    pub pattern_cache_capacity: usize,
    /// `get_mapping` calls slower than this are logged (ms)
    pub slow_mapping_threshold_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl EngineConfig {
    /// Standard configuration for general use.
    pub fn standard() -> Self {
        Self {
            default_strategy: ConflictStrategy::Priority,
            mapping_cache_capacity: 1024,
            selector_cache_capacity: 4096,
            pattern_cache_capacity: 1024,
            slow_mapping_threshold_ms: 5,
        }
    }

    /// Minimal configuration for small widget trees.
    pub fn minimal() -> Self {
        Self {
            default_strategy: ConflictStrategy::Priority,
            mapping_cache_capacity: 64,
            selector_cache_capacity: 256,
            pattern_cache_capacity: 64,
            slow_mapping_threshold_ms: 5,
        }
    }

    /// Configuration for large trees with many rules.
    pub fn large() -> Self {
        Self {
            default_strategy: ConflictStrategy::Priority,
            mapping_cache_capacity: 16_384,
            selector_cache_capacity: 65_536,
            pattern_cache_capacity: 8192,
            slow_mapping_threshold_ms: 10,
        }
    }

    /// Parse a TOML document; missing fields take their standard values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject zero cache capacities.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let capacities = [
            ("mapping_cache_capacity", self.mapping_cache_capacity),
            ("selector_cache_capacity", self.selector_cache_capacity),
            ("pattern_cache_capacity", self.pattern_cache_capacity),
        ];
        for (field, value) in capacities {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    message: "capacity must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn slow_mapping_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_mapping_threshold_ms)
    }

    /// Set the default conflict strategy.
    pub fn with_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    /// Set the mapping cache capacity.
    pub fn with_mapping_cache_capacity(mut self, capacity: usize) -> Self {
        self.mapping_cache_capacity = capacity;
        self
    }

    /// Set the selector cache capacity.
    pub fn with_selector_cache_capacity(mut self, capacity: usize) -> Self {
        self.selector_cache_capacity = capacity;
        self
    }

    /// Set the pattern cache capacity.
    pub fn with_pattern_cache_capacity(mut self, capacity: usize) -> Self {
        self.pattern_cache_capacity = capacity;
        self
    }

    /// Set the slow-mapping log threshold.
    pub fn with_slow_mapping_threshold(mut self, threshold: Duration) -> Self {
        self.slow_mapping_threshold_ms = threshold.as_millis() as u64;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(EngineConfig::default(), EngineConfig::standard());
        assert!(EngineConfig::minimal().mapping_cache_capacity < EngineConfig::large().mapping_cache_capacity);
        assert!(EngineConfig::large().validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::minimal()
            .with_strategy(ConflictStrategy::Merge)
            .with_mapping_cache_capacity(10)
            .with_slow_mapping_threshold(Duration::from_millis(50));
        assert_eq!(config.default_strategy, ConflictStrategy::Merge);
        assert_eq!(config.mapping_cache_capacity, 10);
        assert_eq!(config.slow_mapping_threshold(), Duration::from_millis(50));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = EngineConfig::from_toml_str(
            r#"
            default_strategy = "most_specific"
            selector_cache_capacity = 128
            "#,
        )
        .unwrap();
        assert_eq!(config.default_strategy, ConflictStrategy::MostSpecific);
        assert_eq!(config.selector_cache_capacity, 128);
        assert_eq!(config.mapping_cache_capacity, EngineConfig::standard().mapping_cache_capacity);
    }

    #[test]
    fn test_from_toml_errors() {
        assert!(matches!(
            EngineConfig::from_toml_str("default_strategy = \"loudest\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("pattern_cache_capacity = 0"),
            Err(ConfigError::Invalid {
                field: "pattern_cache_capacity",
                ..
            })
        ));
    }

    #[test]
    fn test_serde_round_trip() {
        let config = EngineConfig::large().with_strategy(ConflictStrategy::LastMatch);
        let text = toml::to_string(&config).unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), config);
    }
}
