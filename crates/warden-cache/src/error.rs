//! Cache-specific error types and conversions.

use warden_core::error::WardenError;

/// Cache-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    Connection(String),

    #[error("Redis command error: {0}")]
    Command(#[from] redis::RedisError),
}

impl From<CacheError> for WardenError {
    fn from(err: CacheError) -> Self {
        WardenError::Transient(err.to_string())
    }
}
