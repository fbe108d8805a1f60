//! Error types for blob cache backends
//!
//! Every variant means the same thing to a caller: the cache could not
//! answer. A missing key is not an error, see [`crate::BlobCache::get`].

use deadpool_redis::redis::RedisError;
use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum CacheError {
    /// Command failed on the Redis connection
    Redis(Box<RedisError>),
    /// No connection could be checked out of the pool
    Pool(String),
    /// The backend did not answer within the allotted time
    Timeout(Duration),
    /// The cache has been closed
    Closed,
    /// Invalid backend configuration
    Config(String),
}

impl CacheError {
    /// Whether retrying the same operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CacheError::Redis(_) | CacheError::Pool(_) | CacheError::Timeout(_)
        )
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Redis(err) => write!(f, "Redis error: {}", err),
            CacheError::Pool(msg) => write!(f, "Connection pool error: {}", msg),
            CacheError::Timeout(after) => write!(f, "Cache timed out after {:?}", after),
            CacheError::Closed => write!(f, "Cache is closed"),
            CacheError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Redis(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<RedisError> for CacheError {
    fn from(err: RedisError) -> Self {
        CacheError::Redis(Box::new(err))
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        match err {
            deadpool_redis::PoolError::Backend(err) => CacheError::Redis(Box::new(err)),
            deadpool_redis::PoolError::Closed => CacheError::Closed,
            other => CacheError::Pool(other.to_string()),
        }
    }
}

impl From<deadpool_redis::CreatePoolError> for CacheError {
    fn from(err: deadpool_redis::CreatePoolError) -> Self {
        CacheError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
