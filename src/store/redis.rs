//! Redis-backed keyed-list store.
//!
//! Uses the native list and expiry primitives: `LPUSH` inserts at the head,
//! `EXPIRE` refreshes the key TTL, `LRANGE 0 -1` reads head-first. Push and
//! expiry are two separate calls; a key can briefly lack a refreshed expiry
//! between them, which the next push heals.

use super::{ListStore, StoreError};
use crate::config::RedisConfig;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;

/// Persistent backend over a shared redis server. Survives process restarts
/// and shares state across instances.
#[derive(Clone)]
pub struct RedisBackend {
    manager: ConnectionManager,
    timeout: Duration,
}

impl RedisBackend {
    /// Connect and health-check the server. Every subsequent call runs
    /// under the same bounded timeout; a hung server is treated as
    /// unavailable rather than blocking the request pipeline.
    pub async fn connect(config: &RedisConfig) -> Result<Self, StoreError> {
        let timeout = Duration::from_millis(config.timeout_ms);

        let client = redis::Client::open(config.url.as_str())
            .map_err(|err| StoreError::Unavailable(format!("redis client: {err}")))?;
        let manager = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Unavailable("redis connect: timed out".to_string()))?
            .map_err(|err| StoreError::Unavailable(format!("redis connect: {err}")))?;

        let backend = Self { manager, timeout };

        let mut conn = backend.manager.clone();
        backend
            .bounded(redis::cmd("PING").query_async::<_, String>(&mut conn), "ping")
            .await?;

        Ok(backend)
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = redis::RedisResult<T>>,
        op: &str,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| StoreError::Unavailable(format!("redis {op}: timed out")))?
            .map_err(|err| StoreError::Unavailable(format!("redis {op}: {err}")))
    }
}

#[async_trait]
impl ListStore for RedisBackend {
    async fn push(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        self.bounded(conn.lpush::<_, _, ()>(key, value), "lpush")
            .await?;

        let mut conn = self.manager.clone();
        self.bounded(conn.expire::<_, ()>(key, ttl.as_secs() as i64), "expire")
            .await?;

        Ok(())
    }

    async fn entries(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.manager.clone();
        self.bounded(conn.lrange::<_, Vec<String>>(key, 0, -1), "lrange")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a running redis server"]
    async fn test_push_and_read_back() {
        let config = RedisConfig {
            url: "redis://localhost:6379".to_string(),
            key_prefix: "unused".to_string(),
            timeout_ms: 2000,
        };
        let backend = RedisBackend::connect(&config).await.unwrap();
        let key = format!("redis_backend_test:{}", uuid::Uuid::new_v4());

        backend
            .push(&key, "first".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        backend
            .push(&key, "second".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        // Head-first: the most recent push comes back first
        let entries = backend.entries(&key).await.unwrap();
        assert_eq!(entries, vec!["second".to_string(), "first".to_string()]);
    }
}
