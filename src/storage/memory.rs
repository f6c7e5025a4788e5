use super::{DeliveryStorage, StorageKind, StorageResult};
use async_trait::async_trait;
use dedup_types::{DeliveryKey, DeliveryRecord};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local record store
///
/// Records are kept for the lifetime of the process, TTL hints are ignored.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    records: RwLock<HashMap<String, DeliveryRecord>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl DeliveryStorage for InMemoryStorage {
    async fn get(&self, key: &DeliveryKey) -> StorageResult<Option<DeliveryRecord>> {
        Ok(self.records.read().await.get(key.as_str()).cloned())
    }

    async fn set(
        &self,
        key: &DeliveryKey,
        record: &DeliveryRecord,
        _ttl_secs: Option<u64>,
    ) -> StorageResult<()> {
        self.records
            .write()
            .await
            .insert(key.to_string(), record.clone());
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &DeliveryKey,
        expected: Option<&DeliveryRecord>,
        record: &DeliveryRecord,
        _ttl_secs: Option<u64>,
    ) -> StorageResult<bool> {
        let mut records = self.records.write().await;

        if records.get(key.as_str()) != expected {
            return Ok(false);
        }

        records.insert(key.to_string(), record.clone());
        Ok(true)
    }

    fn kind(&self) -> StorageKind {
        StorageKind::InMemory
    }
}
