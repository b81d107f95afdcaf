//! Redis connection pool management.

use newscast_core::NewscastError;
use redis::aio::ConnectionManager;
use thiserror::Error;

/// Redis error types.
#[derive(Error, Debug)]
pub enum RedisError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt row {key}: {reason}")]
    CorruptRow { key: String, reason: String },
}

/// Result type for Redis operations.
pub type RedisResult<T> = Result<T, RedisError>;

impl From<RedisError> for NewscastError {
    fn from(err: RedisError) -> Self {
        NewscastError::source(err)
    }
}

/// Redis connection pool. ConnectionManager multiplexes and reconnects internally.
/// It is Clone, so callers clone it to get a mutable handle for each operation.
pub type RedisPool = ConnectionManager;

/// Initialize a Redis connection pool from a URL.
///
/// Example URL: `redis://127.0.0.1:6379`
pub async fn init_pool(redis_url: &str) -> RedisResult<RedisPool> {
    let client = redis::Client::open(redis_url)?;
    let manager = ConnectionManager::new(client).await?;
    Ok(manager)
}

/// Key layout under a configurable prefix.
#[derive(Debug, Clone)]
pub struct Keys {
    prefix: String,
}

impl Keys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Hash of news id → JSON row.
    pub fn news(&self) -> String {
        format!("{}:news", self.prefix)
    }

    /// Sorted set of news ids scored by creation time.
    pub fn news_by_created(&self) -> String {
        format!("{}:news:by_created", self.prefix)
    }

    pub fn news_seq(&self) -> String {
        format!("{}:news:seq", self.prefix)
    }

    /// Hash of device id → JSON row.
    pub fn devices(&self) -> String {
        format!("{}:devices", self.prefix)
    }

    /// Sorted set of device ids scored by last registration refresh.
    pub fn devices_by_updated(&self) -> String {
        format!("{}:devices:by_updated", self.prefix)
    }
}

impl Default for Keys {
    fn default() -> Self {
        Self::new("newscast")
    }
}
