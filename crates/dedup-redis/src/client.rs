//! Redis client implementation with connection management

use crate::Result;
use dedup_config::RedisConfig;
use redis::{aio::ConnectionManager, AsyncCommands};

/// Atomic compare-and-set with expiry
///
/// KEYS[1] = key
/// ARGV[1] = expected value, empty string when the key must be absent
/// ARGV[2] = new value
/// ARGV[3] = TTL in seconds
///
/// Returns 1 when the value was written, 0 when the current value differs.
const COMPARE_AND_SET_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == '' then
    if current then
        return 0
    end
elseif current ~= ARGV[1] then
    return 0
end
redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
return 1
"#;

/// Build connection parameters without going through a URL, so passwords
/// containing URL metacharacters need no escaping
pub fn connection_info(config: &RedisConfig) -> redis::ConnectionInfo {
    redis::ConnectionInfo {
        addr: redis::ConnectionAddr::Tcp(config.hostname.clone(), config.port),
        redis: redis::RedisConnectionInfo {
            db: config.options.db,
            username: config.options.username.clone(),
            password: config.password.clone(),
            ..Default::default()
        },
    }
}

/// Redis client with automatic reconnection
#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
    compare_and_set: redis::Script,
}

impl RedisClient {
    /// Connect to the configured Redis server and authenticate
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(connection_info(config))?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            compare_and_set: redis::Script::new(COMPARE_AND_SET_SCRIPT),
        })
    }

    // ============================================================================
    // Key-Value Operations
    // ============================================================================

    /// GET - Get value by key
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key).await
    }

    /// SETEX - Set key with expiry in seconds
    pub async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, seconds).await
    }

    /// DEL - Delete a key
    pub async fn del(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        conn.del(key).await
    }

    /// TTL - Get time to live in seconds
    pub async fn ttl(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        conn.ttl(key).await
    }

    // ============================================================================
    // Atomic Operations
    // ============================================================================

    /// Write `value` with expiry only if the key currently holds `expected`
    ///
    /// `expected = None` means the key must not exist. Returns whether the
    /// value was written.
    pub async fn compare_and_set_ex(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
        seconds: u64,
    ) -> Result<bool> {
        let mut conn = self.conn.clone();
        let written: i64 = self
            .compare_and_set
            .key(key)
            .arg(expected.unwrap_or(""))
            .arg(value)
            .arg(seconds)
            .invoke_async(&mut conn)
            .await?;
        Ok(written == 1)
    }
}
