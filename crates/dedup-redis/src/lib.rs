//! # Dedup Redis
//!
//! Low-level Redis client used by the Redis storage backend.
//!
//! ## Design Principles
//!
//! - **No business logic** - values are opaque strings
//! - **Single shared connection** - a `ConnectionManager` reconnects on its own
//!   and is cheap to clone per command
//!
//! ## Example
//!
//! ```rust,no_run
//! use dedup_config::RedisConfig;
//! use dedup_redis::RedisClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RedisClient::connect(&RedisConfig::default()).await?;
//!
//!     client.set_ex("key", "value", 3600).await?;
//!     let value: Option<String> = client.get("key").await?;
//!
//!     Ok(())
//! }
//! ```

mod client;

pub use client::{connection_info, RedisClient};

// Re-export commonly used types
pub use redis::RedisError;

/// Result type for Redis operations
pub type Result<T> = std::result::Result<T, RedisError>;
