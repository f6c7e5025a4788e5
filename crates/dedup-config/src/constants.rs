// ============================================================================
// Configuration Constants
// ============================================================================

// Acknowledge window: how long an IN_PROGRESS record blocks redelivery
pub(crate) const DEFAULT_MAX_ACKNOWLEDGE_TIME_SECS: u64 = 900;

// Largest accepted acknowledge window (10 years)
pub const MAX_ACKNOWLEDGE_TIME_SECS: u64 = 10 * 365 * 86_400;

// Default record TTL for backends with expiry (10 days)
pub(crate) const DEFAULT_MAX_MESSAGE_DURATION_SECS: u64 = 864_000;

// Redis connection defaults
pub(crate) const DEFAULT_REDIS_HOSTNAME: &str = "127.0.0.1";
pub(crate) const DEFAULT_REDIS_PORT: u16 = 6379;
pub(crate) const DEFAULT_REDIS_CONNECT_TIMEOUT_MS: u64 = 10_000;

pub(crate) const DEFAULT_RUST_LOG: &str = "info";

