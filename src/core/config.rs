//! Scheduler and evaluation configuration with documented constants
//!
//! All tuning knobs are collected here with explanations of their purpose
//! and how they interact with each other.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value: {0}")]
    Invalid(String),
}

/// Configuration for the door evaluation loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    // === SCHEDULING ===
    /// Number of cycles in which every registered door is visited once
    ///
    /// Each cycle evaluates `ceil(door_count / refresh_rate)` doors. With
    /// the default of 20 and a host driving one cycle per game tick, every
    /// door is looked at roughly once per second.
    pub refresh_rate: u32,

    /// Half extent of the cuboid around a door in which actors are
    /// considered for actor-scoped predicates
    ///
    /// This is only a cheap prefilter. Predicates like proximity apply
    /// their own, usually tighter, geometry afterwards.
    pub actor_check_radius: f64,

    // === CACHES ===
    /// Capacity of the custom expression result cache
    ///
    /// Keys are fully substituted expressions, so a door with three
    /// categories produces at most 27 distinct keys.
    pub expression_cache_size: usize,

    /// Time-to-live of the chunk-loaded lookup per door (milliseconds)
    pub chunk_cache_ttl_ms: u64,

    /// Time-to-live of the actor list per world (milliseconds)
    pub actor_cache_ttl_ms: u64,

    /// Time-to-live of cached time and weather predicate results (milliseconds)
    ///
    /// Keeps a global predicate stable while it is re-evaluated for every
    /// candidate actor of the same door.
    pub predicate_cache_ttl_ms: u64,

    /// Time-to-live of an actor's access level on a door (milliseconds)
    pub access_cache_ttl_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            refresh_rate: 20,
            actor_check_radius: 10.0,
            expression_cache_size: 400,
            chunk_cache_ttl_ms: 5_000,
            actor_cache_ttl_ms: 5_000,
            predicate_cache_ttl_ms: 5_000,
            access_cache_ttl_ms: 30_000,
        }
    }
}

impl GateConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document, filling absent keys with defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: GateConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_rate == 0 {
            return Err(ConfigError::Invalid("refresh_rate must be at least 1".into()));
        }

        if self.expression_cache_size == 0 {
            return Err(ConfigError::Invalid(
                "expression_cache_size must be at least 1".into(),
            ));
        }

        if !(self.actor_check_radius > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "actor_check_radius ({}) must be positive",
                self.actor_check_radius
            )));
        }

        Ok(())
    }

    pub fn chunk_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.chunk_cache_ttl_ms)
    }

    pub fn actor_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.actor_cache_ttl_ms)
    }

    pub fn predicate_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.predicate_cache_ttl_ms)
    }

    pub fn access_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.access_cache_ttl_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GateConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = GateConfig::from_toml_str("refresh_rate = 40\n").unwrap();
        assert_eq!(config.refresh_rate, 40);
        assert_eq!(config.expression_cache_size, 400);
        assert_eq!(config.actor_check_radius, 10.0);
    }

    #[test]
    fn test_zero_refresh_rate_rejected() {
        let result = GateConfig::from_toml_str("refresh_rate = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_negative_radius_rejected() {
        let config = GateConfig {
            actor_check_radius: -1.0,
            ..GateConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = GateConfig::from_toml_str("refresh_rate = \"fast\"");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_ttl_accessors() {
        let config = GateConfig::default();
        assert_eq!(config.chunk_cache_ttl(), Duration::from_secs(5));
        assert_eq!(config.predicate_cache_ttl(), Duration::from_secs(5));
        assert_eq!(config.access_cache_ttl(), Duration::from_secs(30));
    }
}
