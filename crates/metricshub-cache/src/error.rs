//! Cache error types.
//!
//! [`DurableError`] never leaves the crate through [`crate::TieredCache`]; it
//! is the contract between the cache and a [`crate::DurableStore`]
//! implementation. [`CacheError`] covers the one failure a caller can cause.

use thiserror::Error;

/// Errors raised by a durable (shared) cache backend
#[derive(Debug, Error)]
pub enum DurableError {
    /// Failed to obtain a connection
    #[error("durable cache connection error: {0}")]
    Connection(String),

    /// The backend rejected or failed a command
    #[error("durable cache command failed: {0}")]
    Command(String),

    /// The store was closed
    #[error("durable cache is closed")]
    Closed,
}

impl From<redis::RedisError> for DurableError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
            Self::Connection(err.to_string())
        } else {
            Self::Command(err.to_string())
        }
    }
}

impl From<deadpool_redis::PoolError> for DurableError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        match err {
            deadpool_redis::PoolError::Closed => Self::Closed,
            other => Self::Connection(other.to_string()),
        }
    }
}

impl From<deadpool_redis::CreatePoolError> for DurableError {
    fn from(err: deadpool_redis::CreatePoolError) -> Self {
        Self::Connection(err.to_string())
    }
}

/// Errors surfaced to cache callers
#[derive(Debug, Error)]
pub enum CacheError {
    /// The value could not be serialized for storage
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for durable backend operations
pub type DurableResult<T> = Result<T, DurableError>;
