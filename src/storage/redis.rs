use super::{DeliveryStorage, StorageKind, StorageResult};
use async_trait::async_trait;
use dedup_config::Config;
use dedup_error::StorageError;
use dedup_redis::RedisClient;
use dedup_types::{DeliveryKey, DeliveryRecord};
use std::future::Future;
use std::time::Duration;

/// Record store backed by Redis
///
/// Records are JSON strings written with `SET .. EX`, so stale keys are
/// evicted by Redis itself. All calls share one reconnecting connection.
#[derive(Clone)]
pub struct RedisStorage {
    client: RedisClient,
    key_prefix: String,
    default_ttl_secs: u64,
    timeout: Duration,
}

impl RedisStorage {
    /// Connect and authenticate using `config.redis`
    pub async fn connect(config: &Config) -> StorageResult<Self> {
        let timeout_ms = config.redis.options.connect_timeout_ms;
        tracing::info!(
            address = %config.redis.display_address(),
            "Connecting to Redis delivery storage"
        );

        let client = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            RedisClient::connect(&config.redis),
        )
        .await
        .map_err(|_| StorageError::Timeout {
            operation: "connect",
            millis: timeout_ms,
        })??;

        Ok(Self::new(client, config))
    }

    /// Wrap an already connected client
    pub fn new(client: RedisClient, config: &Config) -> Self {
        Self {
            client,
            key_prefix: config.redis.key_prefix.clone(),
            default_ttl_secs: config.max_message_duration_secs,
            timeout: Duration::from_millis(config.redis.options.connect_timeout_ms),
        }
    }

    fn redis_key(&self, key: &DeliveryKey) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    fn encode(key: &DeliveryKey, record: &DeliveryRecord) -> StorageResult<String> {
        serde_json::to_string(record).map_err(|e| StorageError::serialization(key, e))
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> StorageResult<T>
    where
        F: Future<Output = dedup_redis::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(StorageError::from),
            Err(_) => Err(StorageError::Timeout {
                operation,
                millis: self.timeout.as_millis() as u64,
            }),
        }
    }
}

/// Decode a stored value, a JSON `null` counts as absent
fn decode(key: &DeliveryKey, raw: &str) -> StorageResult<Option<DeliveryRecord>> {
    serde_json::from_str(raw).map_err(|e| StorageError::serialization(key, e))
}

/// Whether the stored raw value decodes to the record the caller expects
fn matches_expected(
    key: &DeliveryKey,
    raw: Option<&str>,
    expected: Option<&DeliveryRecord>,
) -> StorageResult<bool> {
    let current = match raw {
        Some(raw) => decode(key, raw)?,
        None => None,
    };
    Ok(current.as_ref() == expected)
}

/// `EX 0` is rejected by Redis, a zero TTL means "use the default"
fn effective_ttl(requested: Option<u64>, default_ttl_secs: u64) -> u64 {
    requested.filter(|ttl| *ttl > 0).unwrap_or(default_ttl_secs)
}

#[async_trait]
impl DeliveryStorage for RedisStorage {
    async fn get(&self, key: &DeliveryKey) -> StorageResult<Option<DeliveryRecord>> {
        let redis_key = self.redis_key(key);
        let raw = self.bounded("get", self.client.get(&redis_key)).await?;

        match raw {
            Some(raw) => decode(key, &raw),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &DeliveryKey,
        record: &DeliveryRecord,
        ttl_secs: Option<u64>,
    ) -> StorageResult<()> {
        let redis_key = self.redis_key(key);
        let value = Self::encode(key, record)?;
        let ttl = effective_ttl(ttl_secs, self.default_ttl_secs);

        self.bounded("set", self.client.set_ex(&redis_key, &value, ttl))
            .await
    }

    async fn compare_and_set(
        &self,
        key: &DeliveryKey,
        expected: Option<&DeliveryRecord>,
        record: &DeliveryRecord,
        ttl_secs: Option<u64>,
    ) -> StorageResult<bool> {
        let redis_key = self.redis_key(key);
        let current_raw = self.bounded("get", self.client.get(&redis_key)).await?;

        if !matches_expected(key, current_raw.as_deref(), expected)? {
            return Ok(false);
        }

        // The script compares against the exact bytes read above, so a
        // `null` value or another writer's encoding still swaps atomically
        let value = Self::encode(key, record)?;
        let ttl = effective_ttl(ttl_secs, self.default_ttl_secs);

        self.bounded(
            "compare_and_set",
            self.client
                .compare_and_set_ex(&redis_key, current_raw.as_deref(), &value, ttl),
        )
        .await
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Redis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dedup_config::StorageMode;
    use dedup_types::DeliveryState;

    #[test]
    fn test_decode_null_is_absent() {
        let key = DeliveryKey::new("1", "svc");
        assert_eq!(decode(&key, "null").unwrap(), None);
    }

    #[test]
    fn test_decode_garbage_names_the_key() {
        let key = DeliveryKey::new("1", "svc");
        let err = decode(&key, "{not json").unwrap_err();
        assert!(err.to_string().contains("1_svc"));
    }

    #[test]
    fn test_decode_record() {
        let key = DeliveryKey::new("1", "svc");
        let record = decode(
            &key,
            r#"{"state":"IN_PROGRESS","createdTime":"2024-05-01T12:00:00.000Z"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(record.state, DeliveryState::InProgress);
    }

    #[test]
    fn test_decode_numeric_state_record() {
        let key = DeliveryKey::new("1", "svc");
        let record = decode(&key, r#"{"state":1,"createdTime":"2024-05-01T12:00:00.000Z"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(record.state, DeliveryState::InProgress);
    }

    #[test]
    fn test_null_matches_absent_expectation() {
        let key = DeliveryKey::new("1", "svc");
        assert!(matches_expected(&key, Some("null"), None).unwrap());
        assert!(matches_expected(&key, None, None).unwrap());

        let record = DeliveryRecord::in_progress_now();
        assert!(!matches_expected(&key, Some("null"), Some(&record)).unwrap());
    }

    #[test]
    fn test_foreign_encoding_matches_semantically() {
        let key = DeliveryKey::new("1", "svc");
        let stored = r#"{ "createdTime": "2024-05-01T12:00:00.000Z", "state": "IN_PROGRESS" }"#;
        let expected = decode(&key, r#"{"state":"IN_PROGRESS","createdTime":"2024-05-01T12:00:00Z"}"#)
            .unwrap();

        assert!(matches_expected(&key, Some(stored), expected.as_ref()).unwrap());
        assert!(!matches_expected(&key, Some(stored), None).unwrap());
    }

    #[test]
    fn test_zero_ttl_falls_back_to_default() {
        assert_eq!(effective_ttl(Some(0), 864_000), 864_000);
        assert_eq!(effective_ttl(None, 864_000), 864_000);
        assert_eq!(effective_ttl(Some(30), 864_000), 30);
    }

    fn redis_config() -> Config {
        let mut config = Config {
            storage_mode: StorageMode::Redis,
            ..Default::default()
        };
        if let Ok(host) = std::env::var("MD_REDIS_HOSTNAME") {
            config.redis.hostname = host;
        }
        config.redis.key_prefix = "dedup_test:".to_string();
        config
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_round_trip_and_ttl() {
        let config = redis_config();
        let storage = RedisStorage::connect(&config).await.unwrap();
        let key = DeliveryKey::new("redis-roundtrip", "svc");
        let record = DeliveryRecord::in_progress_now();

        storage.set(&key, &record, Some(30)).await.unwrap();
        assert_eq!(storage.get(&key).await.unwrap(), Some(record));

        let ttl = storage.client.ttl("dedup_test:redis-roundtrip_svc").await.unwrap();
        assert!(ttl > 0 && ttl <= 30);

        storage.client.del("dedup_test:redis-roundtrip_svc").await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_compare_and_set_on_read_record() {
        let config = redis_config();
        let storage = RedisStorage::connect(&config).await.unwrap();
        let key = DeliveryKey::new("redis-cas", "svc");
        storage.client.del("dedup_test:redis-cas_svc").await.unwrap();

        let first = DeliveryRecord::in_progress_now();
        assert!(storage.compare_and_set(&key, None, &first, Some(30)).await.unwrap());

        // The record read back has to compare equal to the stored bytes
        let current = storage.get(&key).await.unwrap();
        let second = DeliveryRecord::in_progress_now();
        assert!(storage
            .compare_and_set(&key, current.as_ref(), &second, Some(30))
            .await
            .unwrap());
        assert!(!storage
            .compare_and_set(&key, None, &first, Some(30))
            .await
            .unwrap());

        storage.client.del("dedup_test:redis-cas_svc").await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_compare_and_set_over_stored_null() {
        let config = redis_config();
        let storage = RedisStorage::connect(&config).await.unwrap();
        let key = DeliveryKey::new("redis-null", "svc");
        storage
            .client
            .set_ex("dedup_test:redis-null_svc", "null", 30)
            .await
            .unwrap();

        assert_eq!(storage.get(&key).await.unwrap(), None);
        let record = DeliveryRecord::in_progress_now();
        assert!(storage
            .compare_and_set(&key, None, &record, Some(30))
            .await
            .unwrap());
        assert_eq!(storage.get(&key).await.unwrap(), Some(record));

        storage.client.del("dedup_test:redis-null_svc").await.unwrap();
    }
}
