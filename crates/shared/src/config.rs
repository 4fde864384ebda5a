//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Transfer engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Subscription scheduler configuration.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Transfer engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Bounded wait for a single account row lock, in milliseconds.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// How many times a `LockTimeout` operation is retried before it is
    /// surfaced to the caller as a transient failure.
    #[serde(default = "default_lock_retries")]
    pub lock_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            lock_retries: default_lock_retries(),
        }
    }
}

fn default_lock_timeout_ms() -> u64 {
    1_500
}

fn default_lock_retries() -> u32 {
    3
}

/// Subscription scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Forward window, in days, within which upcoming subscription payments
    /// are materialized.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// Interval between scheduler sync passes, in seconds.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            sync_interval_secs: default_sync_interval_secs(),
        }
    }
}

fn default_horizon_days() -> u32 {
    31
}

fn default_sync_interval_secs() -> u64 {
    300
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("PAYVAULT").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
