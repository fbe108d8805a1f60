//! Cache configuration types

use std::time::Duration;

/// Connection settings for [`crate::RedisCache`]
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// `host:port` of the Redis server
    pub addr: String,
    pub password: Option<String>,
    pub db: i64,
    /// Expiry applied to every entry written
    pub ttl: Duration,
    pub dial_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub pool_size: usize,
    pub retry: RetryPolicy,
}

impl RedisCacheConfig {
    /// Build the `redis://` connection URL
    pub fn url(&self) -> String {
        match self.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => format!(
                "redis://:{}@{}/{}",
                urlencoding::encode(password),
                self.addr,
                self.db
            ),
            None => format!("redis://{}/{}", self.addr, self.db),
        }
    }
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            addr: "localhost:6379".to_string(),
            password: None,
            db: 0,
            ttl: Duration::from_secs(5 * 60),
            dial_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            pool_size: 10,
            retry: RetryPolicy::default(),
        }
    }
}

/// Retry behaviour for transient backend failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            min_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based), doubling from
    /// `min_backoff` and clamped to `max_backoff`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.min_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RedisCacheConfig::default();
        assert_eq!(config.addr, "localhost:6379");
        assert_eq!(config.ttl, Duration::from_secs(300));
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_url_without_password() {
        let config = RedisCacheConfig {
            addr: "redis.internal:6380".to_string(),
            db: 2,
            ..Default::default()
        };
        assert_eq!(config.url(), "redis://redis.internal:6380/2");
    }

    #[test]
    fn test_url_with_password() {
        let config = RedisCacheConfig {
            password: Some("p@ss:word".to_string()),
            ..Default::default()
        };
        assert_eq!(config.url(), "redis://:p%40ss%3Aword@localhost:6379/0");
    }

    #[test]
    fn test_empty_password_is_ignored() {
        let config = RedisCacheConfig {
            password: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(config.url(), "redis://localhost:6379/0");
    }

    #[test]
    fn test_backoff_doubles_and_clamps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(500));
        assert_eq!(policy.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn test_no_retry_policy() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.backoff(0), Duration::ZERO);
    }
}
