// ============================================================================
// Redis Configuration
// ============================================================================

use crate::constants::*;
use anyhow::{Context, Result};
use serde::Deserialize;

/// Backend-specific options, read as a JSON object from `MD_REDIS_OPTIONS`
///
/// Example: `{"db": 2, "username": "dedup", "connect_timeout_ms": 5000}`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedisOptions {
    /// Logical database index
    pub db: i64,
    /// ACL username (Redis 6+), password-only AUTH when absent
    pub username: Option<String>,
    /// Upper bound for connecting and for every single command
    pub connect_timeout_ms: u64,
}

impl Default for RedisOptions {
    fn default() -> Self {
        Self {
            db: 0,
            username: None,
            connect_timeout_ms: DEFAULT_REDIS_CONNECT_TIMEOUT_MS,
        }
    }
}

impl RedisOptions {
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("MD_REDIS_OPTIONS must be a JSON object")
    }
}

/// Connection settings for the Redis storage backend
#[derive(Clone)]
pub struct RedisConfig {
    pub hostname: String,
    pub port: u16,
    /// `None` disables AUTH
    pub password: Option<String>,
    pub options: RedisOptions,
    /// Prefix prepended to every delivery key on the Redis side
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_REDIS_HOSTNAME.to_string(),
            port: DEFAULT_REDIS_PORT,
            password: None,
            options: RedisOptions::default(),
            key_prefix: String::new(),
        }
    }
}

impl std::fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConfig")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("options", &self.options)
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl RedisConfig {
    pub(crate) fn from_env() -> Result<Self> {
        let port = match std::env::var("MD_REDIS_PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("MD_REDIS_PORT is not a valid port: \"{}\"", raw))?,
            Err(_) => DEFAULT_REDIS_PORT,
        };

        let options = match std::env::var("MD_REDIS_OPTIONS") {
            Ok(raw) if !raw.trim().is_empty() => RedisOptions::parse(&raw)?,
            _ => RedisOptions::default(),
        };

        Ok(Self {
            hostname: std::env::var("MD_REDIS_HOSTNAME")
                .ok()
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| DEFAULT_REDIS_HOSTNAME.to_string()),
            port,
            password: std::env::var("MD_REDIS_PASSWORD")
                .ok()
                .filter(|p| !p.is_empty()),
            options,
            key_prefix: std::env::var("MD_REDIS_KEY_PREFIX").unwrap_or_default(),
        })
    }

    /// Address safe to log (no credentials)
    pub fn display_address(&self) -> String {
        format!("{}:{}/{}", self.hostname, self.port, self.options.db)
    }
}
