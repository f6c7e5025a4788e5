// ============================================================================
// Delivery Storage
// ============================================================================
//
// Storage port for delivery records plus its two realizations:
// - InMemoryStorage: process-local map, no expiry
// - RedisStorage: external cache, records expire through TTL
//
// The backend is chosen once at startup from `Config::storage_mode` and
// handed to the tracker explicitly. There is no process-wide instance.
//
// ============================================================================

mod memory;
mod redis;

pub use self::memory::InMemoryStorage;
pub use self::redis::RedisStorage;

use async_trait::async_trait;
use dedup_config::{Config, StorageMode};
use dedup_error::StorageError;
use dedup_types::{DeliveryKey, DeliveryRecord};
use std::fmt;
use std::sync::Arc;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    InMemory,
    Redis,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::InMemory => f.write_str("in-memory"),
            StorageKind::Redis => f.write_str("redis"),
        }
    }
}

/// Get/set contract the tracker needs from a backend
#[async_trait]
pub trait DeliveryStorage: Send + Sync {
    /// Read the record for `key`, `Ok(None)` when there is none
    async fn get(&self, key: &DeliveryKey) -> StorageResult<Option<DeliveryRecord>>;

    /// Write the record unconditionally
    ///
    /// `ttl_secs` is an expiry hint, backends without expiry ignore it.
    async fn set(
        &self,
        key: &DeliveryKey,
        record: &DeliveryRecord,
        ttl_secs: Option<u64>,
    ) -> StorageResult<()>;

    /// Write the record only if the stored one still equals `expected`
    ///
    /// `expected = None` requires the key to be absent. Returns `true` when
    /// the record was written. Check and write happen as one step.
    async fn compare_and_set(
        &self,
        key: &DeliveryKey,
        expected: Option<&DeliveryRecord>,
        record: &DeliveryRecord,
        ttl_secs: Option<u64>,
    ) -> StorageResult<bool>;

    fn kind(&self) -> StorageKind;
}

#[async_trait]
impl<S: DeliveryStorage + ?Sized> DeliveryStorage for Arc<S> {
    async fn get(&self, key: &DeliveryKey) -> StorageResult<Option<DeliveryRecord>> {
        (**self).get(key).await
    }

    async fn set(
        &self,
        key: &DeliveryKey,
        record: &DeliveryRecord,
        ttl_secs: Option<u64>,
    ) -> StorageResult<()> {
        (**self).set(key, record, ttl_secs).await
    }

    async fn compare_and_set(
        &self,
        key: &DeliveryKey,
        expected: Option<&DeliveryRecord>,
        record: &DeliveryRecord,
        ttl_secs: Option<u64>,
    ) -> StorageResult<bool> {
        (**self).compare_and_set(key, expected, record, ttl_secs).await
    }

    fn kind(&self) -> StorageKind {
        (**self).kind()
    }
}

/// The configured backend
pub enum StorageBackend {
    InMemory(InMemoryStorage),
    Redis(RedisStorage),
}

impl StorageBackend {
    /// Build the backend selected by `config.storage_mode`
    ///
    /// For Redis this connects (bounded by the configured timeout) and
    /// authenticates before returning.
    pub async fn from_config(config: &Config) -> StorageResult<Self> {
        let backend = match config.storage_mode {
            StorageMode::InMemory => StorageBackend::InMemory(InMemoryStorage::new()),
            StorageMode::Redis => StorageBackend::Redis(RedisStorage::connect(config).await?),
        };

        tracing::info!(backend = %backend.kind(), "Delivery storage ready");
        Ok(backend)
    }
}

#[async_trait]
impl DeliveryStorage for StorageBackend {
    async fn get(&self, key: &DeliveryKey) -> StorageResult<Option<DeliveryRecord>> {
        match self {
            StorageBackend::InMemory(storage) => storage.get(key).await,
            StorageBackend::Redis(storage) => storage.get(key).await,
        }
    }

    async fn set(
        &self,
        key: &DeliveryKey,
        record: &DeliveryRecord,
        ttl_secs: Option<u64>,
    ) -> StorageResult<()> {
        match self {
            StorageBackend::InMemory(storage) => storage.set(key, record, ttl_secs).await,
            StorageBackend::Redis(storage) => storage.set(key, record, ttl_secs).await,
        }
    }

    async fn compare_and_set(
        &self,
        key: &DeliveryKey,
        expected: Option<&DeliveryRecord>,
        record: &DeliveryRecord,
        ttl_secs: Option<u64>,
    ) -> StorageResult<bool> {
        match self {
            StorageBackend::InMemory(storage) => {
                storage.compare_and_set(key, expected, record, ttl_secs).await
            }
            StorageBackend::Redis(storage) => {
                storage.compare_and_set(key, expected, record, ttl_secs).await
            }
        }
    }

    fn kind(&self) -> StorageKind {
        match self {
            StorageBackend::InMemory(_) => StorageKind::InMemory,
            StorageBackend::Redis(_) => StorageKind::Redis,
        }
    }
}
