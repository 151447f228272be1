//! Redis-backed cache store.

use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::info;
use warden_core::cache::CacheStore;
use warden_core::error::WardenResult;

use crate::error::CacheError;

/// Configuration for connecting to Redis.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Connection URL (e.g., `redis://127.0.0.1:6379/0`).
    pub url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".into(),
        }
    }
}

/// Cache store over a multiplexed, auto-reconnecting Redis connection.
///
/// Cloning is cheap and clones share the connection.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(config: &CacheConfig) -> Result<Self, CacheError> {
        info!("Connecting to Redis");

        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        info!("Successfully connected to Redis");

        Ok(Self { conn })
    }
}

/// Redis expiries are whole seconds; round up so nothing expires early.
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 { secs + 1 } else { secs.max(1) }
}

impl CacheStore for RedisCache {
    async fn set_members(&self, key: &str) -> WardenResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn.smembers(key).await.map_err(CacheError::from)?;
        Ok(members)
    }

    async fn set_add(&self, key: &str, members: &[String], ttl: Duration) -> WardenResult<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let secs = i64::try_from(ttl_secs(ttl)).unwrap_or(i64::MAX);
        let () = redis::pipe()
            .atomic()
            .sadd(key, members)
            .ignore()
            .expire(key, secs)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(CacheError::from)?;
        Ok(())
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> WardenResult<()> {
        let mut conn = self.conn.clone();
        let () = conn
            .set_ex(key, value, ttl_secs(ttl))
            .await
            .map_err(CacheError::from)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> WardenResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(CacheError::from)?;
        Ok(value)
    }

    async fn take(&self, key: &str) -> WardenResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GETDEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(CacheError::from)?;
        Ok(value)
    }

    async fn exists(&self, key: &str) -> WardenResult<bool> {
        let mut conn = self.conn.clone();
        let found: bool = conn.exists(key).await.map_err(CacheError::from)?;
        Ok(found)
    }

    async fn ttl(&self, key: &str) -> WardenResult<Option<Duration>> {
        let mut conn = self.conn.clone();
        // -2: no such key, -1: no expiry.
        let secs: i64 = conn.ttl(key).await.map_err(CacheError::from)?;
        Ok(u64::try_from(secs).ok().map(Duration::from_secs))
    }

    async fn delete(&self, key: &str) -> WardenResult<()> {
        let mut conn = self.conn.clone();
        let () = conn.del(key).await.map_err(CacheError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_rounds_up_to_whole_seconds() {
        assert_eq!(ttl_secs(Duration::from_secs(3600)), 3600);
        assert_eq!(ttl_secs(Duration::from_millis(1500)), 2);
        assert_eq!(ttl_secs(Duration::from_millis(10)), 1);
        assert_eq!(ttl_secs(Duration::ZERO), 1);
    }
}
