//! Redis-backed event cache.
//!
//! Writes are plain `SET key value`, or `SET key value EX ttl` when a TTL is
//! configured. The connection manager reconnects on its own, so a single
//! `RedisCache` can be shared by every worker.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use crate::error::CacheError;

use super::EventCache;

/// Redis cache handle.
#[derive(Clone)]
pub struct RedisCache {
    redis: ConnectionManager,
    ttl: Option<Duration>,
}

impl RedisCache {
    /// Connects to Redis.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the URL is invalid or the
    /// server cannot be reached.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| CacheError::ConnectionFailed(e.to_string()))?;

        let redis = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::ConnectionFailed(e.to_string()))?;

        Ok(Self { redis, ttl: None })
    }

    /// Creates a cache from an existing connection manager.
    pub fn from_connection(redis: ConnectionManager) -> Self {
        Self { redis, ttl: None }
    }

    /// Sets an expiry applied to every write. `None` means entries never expire.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sends `PING` and expects `PONG`.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.redis.clone();
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply != "PONG" {
            return Err(CacheError::ConnectionFailed(format!(
                "unexpected PING reply: {}",
                reply
            )));
        }
        Ok(())
    }

    /// Reads a value back. Used by the live integration tests.
    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.redis.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }
}

#[async_trait]
impl EventCache for RedisCache {
    async fn put(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut conn = self.redis.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = self.ttl {
            cmd.arg("EX").arg(ttl.as_secs().max(1));
        }
        cmd.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }
}
