// ============================================================================
// Dedup Config - Centralized configuration management
// ============================================================================
//
// Configuration for the delivery deduplication tracker and its storage
// backends. Loaded from environment variables (and an optional .env file)
// with defaults for everything.
//
// ============================================================================

mod constants;
mod redis;

pub use constants::MAX_ACKNOWLEDGE_TIME_SECS;
pub use redis::{RedisConfig, RedisOptions};

use anyhow::{bail, Context, Result};
use constants::*;

/// Which storage backend records are kept in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageMode {
    /// Process-local map, records live as long as the process
    InMemory,
    /// External Redis server, records expire through TTL
    Redis,
}

impl StorageMode {
    /// Parse the value of `MD_IN_MEMORY_ONLY`
    ///
    /// Only explicit boolean spellings are accepted.
    pub fn from_in_memory_flag(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(StorageMode::InMemory),
            "0" | "false" | "no" => Ok(StorageMode::Redis),
            other => bail!(
                "MD_IN_MEMORY_ONLY must be one of 1/0/true/false/yes/no, got \"{}\"",
                other
            ),
        }
    }
}

/// Main configuration structure
#[derive(Clone, Debug)]
pub struct Config {
    pub storage_mode: StorageMode,

    /// How long an IN_PROGRESS record blocks redelivery, in seconds
    pub max_acknowledge_time_secs: u64,

    /// Default TTL for written records on backends with expiry, in seconds
    pub max_message_duration_secs: u64,

    pub redis: RedisConfig,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_mode: StorageMode::InMemory,
            max_acknowledge_time_secs: DEFAULT_MAX_ACKNOWLEDGE_TIME_SECS,
            max_message_duration_secs: DEFAULT_MAX_MESSAGE_DURATION_SECS,
            redis: RedisConfig::default(),
            rust_log: DEFAULT_RUST_LOG.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let storage_mode = match std::env::var("MD_IN_MEMORY_ONLY") {
            Ok(raw) if !raw.trim().is_empty() => StorageMode::from_in_memory_flag(&raw)?,
            _ => StorageMode::InMemory,
        };

        let config = Self {
            storage_mode,
            max_acknowledge_time_secs: env_secs(
                "MD_MAX_ACKNOWLEDGE_TIME",
                DEFAULT_MAX_ACKNOWLEDGE_TIME_SECS,
            )?,
            max_message_duration_secs: env_secs(
                "MD_MAX_MESSAGE_DURATION",
                DEFAULT_MAX_MESSAGE_DURATION_SECS,
            )?,
            redis: RedisConfig::from_env()?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_RUST_LOG.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_acknowledge_time_secs == 0 {
            bail!("MD_MAX_ACKNOWLEDGE_TIME must be greater than 0");
        }
        if self.max_acknowledge_time_secs > MAX_ACKNOWLEDGE_TIME_SECS {
            bail!(
                "MD_MAX_ACKNOWLEDGE_TIME must be at most {} seconds, got {}",
                MAX_ACKNOWLEDGE_TIME_SECS,
                self.max_acknowledge_time_secs
            );
        }
        if self.max_message_duration_secs == 0 {
            bail!("MD_MAX_MESSAGE_DURATION must be greater than 0");
        }
        Ok(())
    }

    /// Acknowledge window, saturating at chrono's largest duration
    pub fn max_acknowledge_time(&self) -> chrono::Duration {
        i64::try_from(self.max_acknowledge_time_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

fn env_secs(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number of seconds, got \"{}\"", name, raw)),
        _ => Ok(default),
    }
}
