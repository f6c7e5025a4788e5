use dedup_types::{DeliveryKey, DeliveryState};
use thiserror::Error;

pub type DedupResult<T> = Result<T, DedupError>;

/// Failure reported by a storage backend
///
/// Backend detail is kept as-is so callers see what the store reported.
#[derive(Error, Debug)]
pub enum StorageError {
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Failed to decode record stored at \"{key}\": {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage operation '{operation}' timed out after {millis}ms")]
    Timeout { operation: &'static str, millis: u64 },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn serialization(key: &DeliveryKey, source: serde_json::Error) -> Self {
        StorageError::Serialization {
            key: key.to_string(),
            source,
        }
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        StorageError::Backend(msg.into())
    }
}

/// Errors returned by the delivery tracker
#[derive(Error, Debug)]
pub enum DedupError {
    // ===== Caller Errors =====
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Couldn't find a delivery record for key \"{key}\"")]
    NotFound { key: String },

    #[error(
        "Delivery record \"{key}\" is in state {state}, it has to be IN_PROGRESS to be marked as delivered"
    )]
    InvalidState { key: String, state: DeliveryState },

    // ===== Storage Errors =====
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DedupError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        DedupError::InvalidArgument(msg.into())
    }

    pub fn not_found(key: &DeliveryKey) -> Self {
        DedupError::NotFound {
            key: key.to_string(),
        }
    }

    pub fn invalid_state(key: &DeliveryKey, state: DeliveryState) -> Self {
        DedupError::InvalidState {
            key: key.to_string(),
            state,
        }
    }

    /// Error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            DedupError::InvalidArgument(_) => "INVALID_ARGUMENT",
            DedupError::NotFound { .. } => "NOT_FOUND",
            DedupError::InvalidState { .. } => "INVALID_STATE",
            DedupError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Only storage failures may succeed when the same call is repeated
    pub fn is_retryable(&self) -> bool {
        matches!(self, DedupError::Storage(_))
    }

    /// Log this error with a level matching who caused it
    pub fn log(&self) {
        let code = self.error_code();

        match self {
            DedupError::Storage(_) => {
                tracing::error!(error = %self, error_code = %code, "Storage failure");
            }
            DedupError::InvalidState { .. } | DedupError::NotFound { .. } => {
                tracing::warn!(error = %self, error_code = %code, "Rejected delivery transition");
            }
            DedupError::InvalidArgument(_) => {
                tracing::debug!(error = %self, error_code = %code, "Invalid tracker call");
            }
        }
    }
}
