//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::error::AppError;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
    #[serde(default)]
    pub metering: MeteringConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Idle connection timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

/// Redis configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,
}

/// Resolution engine configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ResolutionConfig {
    /// Cache reference lookups in Redis
    #[serde(default = "default_resolution_cache_enabled")]
    pub cache_enabled: bool,

    /// TTL for cached reference lookups in seconds
    #[serde(default = "default_resolution_cache_ttl")]
    pub cache_ttl_secs: u64,
}

fn default_resolution_cache_enabled() -> bool {
    true
}

fn default_resolution_cache_ttl() -> u64 {
    120
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            cache_enabled: default_resolution_cache_enabled(),
            cache_ttl_secs: default_resolution_cache_ttl(),
        }
    }
}

/// What the flush coordinator does when a ledger write fails after the
/// counter was already decremented.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerFailurePolicy {
    /// Re-increment the counter by the drained amount. Keeps every call
    /// billable; may double count if the failed write actually committed.
    #[default]
    Restore,
    /// Accept the loss and report it through the flush statistics.
    Drop,
}

/// Usage metering configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MeteringConfig {
    /// Interval between flush attempts in seconds
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,

    /// Flush lock TTL in seconds
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_secs: u64,

    /// Upper bound for one drain cycle in seconds (defaults to the lock TTL)
    #[serde(default)]
    pub cycle_timeout_secs: Option<u64>,

    /// Upper bound for re-incrementing a counter after a ledger failure
    #[serde(default = "default_restore_timeout")]
    pub restore_timeout_secs: u64,

    /// Key of the cluster-wide flush lock
    #[serde(default = "default_lock_key")]
    pub lock_key: String,

    /// Namespace prefix of usage counter keys
    #[serde(default = "default_counter_prefix")]
    pub counter_prefix: String,

    /// Behavior after a failed ledger write
    #[serde(default)]
    pub ledger_failure_policy: LedgerFailurePolicy,
}

fn default_flush_interval() -> u64 {
    60
}

fn default_lock_ttl() -> u64 {
    15
}

fn default_restore_timeout() -> u64 {
    5
}

/// Default namespace of usage counter hashes
pub const DEFAULT_COUNTER_PREFIX: &str = "epcalls";

/// Default key of the cluster-wide flush lock
pub const DEFAULT_FLUSH_LOCK_KEY: &str = "lock:epcalls_sync";

fn default_lock_key() -> String {
    DEFAULT_FLUSH_LOCK_KEY.to_string()
}

fn default_counter_prefix() -> String {
    DEFAULT_COUNTER_PREFIX.to_string()
}

impl Default for MeteringConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: default_flush_interval(),
            lock_ttl_secs: default_lock_ttl(),
            cycle_timeout_secs: None,
            restore_timeout_secs: default_restore_timeout(),
            lock_key: default_lock_key(),
            counter_prefix: default_counter_prefix(),
            ledger_failure_policy: LedgerFailurePolicy::default(),
        }
    }
}

impl MeteringConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs.unwrap_or(self.lock_ttl_secs))
    }

    pub fn restore_timeout(&self) -> Duration {
        Duration::from_secs(self.restore_timeout_secs)
    }

    /// Check intervals and timeouts for consistency
    pub fn validate(&self) -> Result<(), AppError> {
        if self.flush_interval_secs == 0 {
            return Err(AppError::Config(
                "metering.flush_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.lock_ttl_secs == 0 {
            return Err(AppError::Config(
                "metering.lock_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.restore_timeout_secs == 0 {
            return Err(AppError::Config(
                "metering.restore_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if let Some(timeout) = self.cycle_timeout_secs {
            if timeout == 0 || timeout > self.lock_ttl_secs {
                return Err(AppError::Config(format!(
                    "metering.cycle_timeout_secs must be between 1 and the lock TTL ({}s), got {}",
                    self.lock_ttl_secs, timeout
                )));
            }
        }
        if self.counter_prefix.is_empty() || self.counter_prefix.contains(['*', '?', '[']) {
            return Err(AppError::Config(format!(
                "metering.counter_prefix is not a plain key prefix: {:?}",
                self.counter_prefix
            )));
        }
        if self.lock_key.is_empty() {
            return Err(AppError::Config("metering.lock_key must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default level for RouteAPI crates
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, AppError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Self::with_defaults(Config::builder())?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with ROUTEAPI_ prefix
            .add_source(
                Environment::with_prefix("ROUTEAPI")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app: AppConfig = config.try_deserialize()?;
        app.metering.validate()?;
        Ok(app)
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, AppError> {
        let config = Self::with_defaults(Config::builder())?
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("ROUTEAPI").separator("__"))
            .build()?;

        let app: AppConfig = config.try_deserialize()?;
        app.metering.validate()?;
        Ok(app)
    }

    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("resolution.cache_enabled", true)?
            .set_default("resolution.cache_ttl_secs", 120)?
            .set_default("metering.flush_interval_secs", 60)?
            .set_default("metering.lock_ttl_secs", 15)?
            .set_default("metering.restore_timeout_secs", 5)?
            .set_default("metering.lock_key", DEFAULT_FLUSH_LOCK_KEY)?
            .set_default("metering.counter_prefix", DEFAULT_COUNTER_PREFIX)?
            .set_default("metering.ledger_failure_policy", "restore")?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)
    }
}
