//! # Message Dedup
//!
//! Deduplication tracker for at-least-once delivery channels. For every
//! (message ID, subscriber name) pair it answers whether the message may be
//! delivered, and records processing progress so redelivered duplicates are
//! suppressed.
//!
//! ```rust,no_run
//! use dedup_config::Config;
//! use message_dedup::{DeliveryTracker, StorageBackend, Verdict};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let storage = StorageBackend::from_config(&config).await?;
//!     let tracker = DeliveryTracker::from_config(storage, &config);
//!
//!     if tracker.try_claim("msg-1", "billing").await? == Verdict::Yes {
//!         // process the message ...
//!         tracker.set_as_delivered("msg-1", "billing").await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod decision;
pub mod storage;
pub mod telemetry;
pub mod tracker;

pub use storage::{
    DeliveryStorage, InMemoryStorage, RedisStorage, StorageBackend, StorageKind, StorageResult,
};
pub use tracker::{DeliveryTracker, TrackerSettings};

// Re-export workspace types so callers need a single dependency
pub use dedup_config::{Config, StorageMode};
pub use dedup_error::{DedupError, DedupResult, StorageError};
pub use dedup_types::{DeliveryKey, DeliveryRecord, DeliveryState, Verdict};
