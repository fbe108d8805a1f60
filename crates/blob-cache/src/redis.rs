//! Redis-backed blob cache

use crate::cache::BlobCache;
use crate::error::{CacheError, Result};
use crate::types::{RedisCacheConfig, RetryPolicy};
use async_trait::async_trait;
use bytes::Bytes;
use deadpool_redis::redis::{cmd, AsyncCommands};
use deadpool_redis::{Connection, Pool, PoolConfig, Runtime};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Blob cache stored in Redis with a uniform TTL.
///
/// Connections come from a `deadpool-redis` pool and are created lazily, so
/// building a `RedisCache` never touches the network. Transient failures are
/// retried according to the configured [`RetryPolicy`].
pub struct RedisCache {
    pool: Pool,
    ttl: Duration,
    read_timeout: Duration,
    write_timeout: Duration,
    ping_timeout: Duration,
    retry: RetryPolicy,
}

impl RedisCache {
    /// Create a cache from connection settings
    pub fn new(config: &RedisCacheConfig) -> Result<Self> {
        let mut redis_config = deadpool_redis::Config::from_url(config.url());

        let mut pool_config = PoolConfig::new(config.pool_size.max(1));
        pool_config.timeouts.wait = Some(config.read_timeout);
        pool_config.timeouts.create = Some(config.dial_timeout);
        pool_config.timeouts.recycle = Some(config.read_timeout);
        redis_config.pool = Some(pool_config);

        let pool = redis_config.create_pool(Some(Runtime::Tokio1))?;

        info!(
            addr = %config.addr,
            db = config.db,
            ttl_secs = config.ttl.as_secs(),
            pool_size = config.pool_size,
            "Redis cache configured"
        );

        Ok(Self {
            pool,
            ttl: config.ttl,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            ping_timeout: config.dial_timeout + config.read_timeout,
            retry: config.retry,
        })
    }

    /// TTL applied to every write
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn connection(&self) -> Result<Connection> {
        if self.pool.is_closed() {
            return Err(CacheError::Closed);
        }
        Ok(self.pool.get().await?)
    }

    async fn get_once(&self, key: &str) -> Result<Option<Bytes>> {
        let mut conn = self.connection().await?;
        let data = bounded(self.read_timeout, async {
            conn.get::<_, Option<Vec<u8>>>(key)
                .await
                .map_err(CacheError::from)
        })
        .await?;
        Ok(data.map(Bytes::from))
    }

    async fn set_once(&self, key: &str, data: &[u8]) -> Result<()> {
        let mut conn = self.connection().await?;
        // PX rather than EX so sub-second TTLs are not rounded down to zero
        let ttl_ms = (self.ttl.as_millis() as u64).max(1);
        bounded(self.write_timeout, async {
            conn.pset_ex::<_, _, ()>(key, data, ttl_ms)
                .await
                .map_err(CacheError::from)
        })
        .await
    }

    async fn ping_once(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let pong: String = cmd("PING").query_async(&mut conn).await?;
        debug!(reply = %pong, "Redis ping");
        Ok(())
    }

    async fn with_retry<T, F, Fut>(&self, op: &'static str, mut attempt_fn: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.backoff(attempt);
                    debug!(
                        op,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying Redis operation"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl BlobCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.with_retry("get", || self.get_once(key)).await
    }

    async fn set(&self, key: &str, data: Bytes) -> Result<()> {
        self.with_retry("set", || self.set_once(key, &data)).await
    }

    async fn ping(&self) -> Result<()> {
        bounded(self.ping_timeout, self.ping_once()).await
    }

    async fn close(&self) -> Result<()> {
        if !self.pool.is_closed() {
            self.pool.close();
            info!("Redis cache closed");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

async fn bounded<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(CacheError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing listens on port 1, so every connection attempt is refused.
    fn unreachable_config() -> RedisCacheConfig {
        RedisCacheConfig {
            addr: "127.0.0.1:1".to_string(),
            dial_timeout: Duration::from_millis(200),
            read_timeout: Duration::from_millis(200),
            write_timeout: Duration::from_millis(200),
            retry: RetryPolicy::none(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_new_does_not_connect() {
        let cache = RedisCache::new(&unreachable_config());
        assert!(cache.is_ok());
        assert_eq!(cache.unwrap().ttl(), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_an_error_not_a_miss() {
        let cache = RedisCache::new(&unreachable_config()).unwrap();

        assert!(cache.get("a.txt").await.is_err());
        assert!(cache.set("a.txt", Bytes::from_static(b"hello")).await.is_err());
        assert!(cache.ping().await.is_err());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let cache = RedisCache::new(&unreachable_config()).unwrap();

        cache.close().await.unwrap();
        cache.close().await.unwrap();

        assert!(matches!(cache.get("a.txt").await, Err(CacheError::Closed)));
        assert!(matches!(cache.ping().await, Err(CacheError::Closed)));
    }

    #[tokio::test]
    async fn test_name() {
        let cache = RedisCache::new(&unreachable_config()).unwrap();
        assert_eq!(cache.name(), "redis");
    }
}
