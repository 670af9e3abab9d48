//! Pipeline configuration.
//!
//! Covers the worker pool size, the processing step, the cache key layout and
//! the connection settings for Redis and PostgreSQL.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    // Pool settings
    /// Number of workers draining the dispatch queue.
    pub worker_count: usize,
    /// Simulated processing time per event.
    pub processing_delay: Duration,

    // Cache settings
    /// Prefix prepended to the event id to form the cache key.
    pub cache_key_prefix: String,
    /// Expiry for cache entries. `None` keeps them forever.
    pub cache_ttl: Option<Duration>,
    /// Redis connection URL.
    pub redis_url: String,

    // Store settings
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Maximum connections in the PostgreSQL pool.
    pub db_max_connections: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: 3,
            processing_delay: Duration::from_secs(1),

            cache_key_prefix: "event:".to_string(),
            cache_ttl: None,
            redis_url: "redis://localhost:6379".to_string(),

            database_url: "postgres://localhost/event_fanout".to_string(),
            db_max_connections: 10,
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `FANOUT_WORKERS`: Worker pool size (default: 3)
    /// - `FANOUT_PROCESSING_DELAY_MS`: Processing delay per event (default: 1000)
    /// - `FANOUT_CACHE_KEY_PREFIX`: Cache key prefix (default: event:)
    /// - `FANOUT_CACHE_TTL_SECS`: Cache entry expiry, unset for none
    /// - `REDIS_URL`: Redis URL (default: redis://localhost:6379)
    /// - `DATABASE_URL`: PostgreSQL URL (default: postgres://localhost/event_fanout)
    /// - `FANOUT_DB_MAX_CONNECTIONS`: PostgreSQL pool size (default: 10)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable cannot be parsed or the result fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("FANOUT_WORKERS") {
            config.worker_count = parse_env_value(&val, "FANOUT_WORKERS")?;
        }

        if let Some(val) = lookup("FANOUT_PROCESSING_DELAY_MS") {
            let ms: u64 = parse_env_value(&val, "FANOUT_PROCESSING_DELAY_MS")?;
            config.processing_delay = Duration::from_millis(ms);
        }

        if let Some(val) = lookup("FANOUT_CACHE_KEY_PREFIX") {
            config.cache_key_prefix = val;
        }

        if let Some(val) = lookup("FANOUT_CACHE_TTL_SECS") {
            let secs: u64 = parse_env_value(&val, "FANOUT_CACHE_TTL_SECS")?;
            config.cache_ttl = Some(Duration::from_secs(secs));
        }

        if let Some(val) = lookup("REDIS_URL") {
            config.redis_url = val;
        }

        if let Some(val) = lookup("DATABASE_URL") {
            config.database_url = val;
        }

        if let Some(val) = lookup("FANOUT_DB_MAX_CONNECTIONS") {
            config.db_max_connections = parse_env_value(&val, "FANOUT_DB_MAX_CONNECTIONS")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::ValidationFailed(
                "worker_count must be greater than 0".to_string(),
            ));
        }

        if let Some(ttl) = self.cache_ttl {
            if ttl.as_secs() == 0 {
                return Err(ConfigError::ValidationFailed(
                    "cache_ttl must be at least one second".to_string(),
                ));
            }
        }

        if self.redis_url.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "redis_url cannot be empty".to_string(),
            ));
        }

        if self.database_url.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "database_url cannot be empty".to_string(),
            ));
        }

        if self.db_max_connections == 0 {
            return Err(ConfigError::ValidationFailed(
                "db_max_connections must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    pub fn with_processing_delay(mut self, delay: Duration) -> Self {
        self.processing_delay = delay;
        self
    }

    pub fn with_cache_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_key_prefix = prefix.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = url.into();
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    pub fn with_db_max_connections(mut self, max: u32) -> Self {
        self.db_max_connections = max;
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}
