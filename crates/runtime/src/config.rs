//! Scheduler configuration structures and loaders.
use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Limits applied by the [`QuerySystem`](crate::QuerySystem).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum new queries dispatched in a single tick.
    pub max_queries_per_tick: usize,
    /// Maximum dispatches in any sliding one-second wall-clock window.
    pub max_queries_per_second: usize,
    /// Number of worker threads available for blocking client calls.
    pub thread_pool_size: usize,
    /// Wall-clock budget of one query, measured from dispatch.
    #[serde(rename = "query_timeout_ms", with = "millis")]
    pub query_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_queries_per_tick: 1,
            max_queries_per_second: 5,
            thread_pool_size: 4,
            query_timeout: Duration::from_secs(30),
        }
    }
}

impl SchedulerConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `LLM_MAX_QUERIES_PER_TICK` - Dispatches per tick (default: 1)
    /// - `LLM_MAX_QUERIES_PER_SECOND` - Dispatches per second (default: 5)
    /// - `LLM_THREAD_POOL_SIZE` - Worker threads (default: 4)
    /// - `LLM_QUERY_TIMEOUT_MS` - Query timeout in milliseconds (default: 30000)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(limit) = read_env::<usize>("LLM_MAX_QUERIES_PER_TICK") {
            config.max_queries_per_tick = limit;
        }
        if let Some(limit) = read_env::<usize>("LLM_MAX_QUERIES_PER_SECOND") {
            config.max_queries_per_second = limit;
        }
        if let Some(size) = read_env::<usize>("LLM_THREAD_POOL_SIZE") {
            config.thread_pool_size = size;
        }
        if let Some(ms) = read_env::<u64>("LLM_QUERY_TIMEOUT_MS") {
            config.query_timeout = Duration::from_millis(ms);
        }

        config
    }

    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("thread_pool_size", self.thread_pool_size > 0),
            ("max_queries_per_tick", self.max_queries_per_tick > 0),
            ("max_queries_per_second", self.max_queries_per_second > 0),
            ("query_timeout", !self.query_timeout.is_zero()),
        ];
        for (field, ok) in checks {
            if !ok {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero",
                });
            }
        }
        Ok(())
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_queries_per_tick, 1);
        assert_eq!(config.max_queries_per_second, 5);
        assert_eq!(config.thread_pool_size, 4);
        assert_eq!(config.query_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_overrides_only_given_keys() {
        let config = SchedulerConfig::from_toml_str(
            "max_queries_per_tick = 3\nquery_timeout_ms = 250\n",
        )
        .unwrap();
        assert_eq!(config.max_queries_per_tick, 3);
        assert_eq!(config.query_timeout, Duration::from_millis(250));
        assert_eq!(config.thread_pool_size, 4);
    }

    #[test]
    fn zero_limits_are_rejected() {
        let err = SchedulerConfig::from_toml_str("thread_pool_size = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "thread_pool_size",
                ..
            }
        ));

        let config = SchedulerConfig {
            query_timeout: Duration::ZERO,
            ..SchedulerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let err = SchedulerConfig::from_toml_str("max_queries_per_tick = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
