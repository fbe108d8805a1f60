//! Blob cache port and backends
//!
//! Defines [`BlobCache`], a key/value contract for caching file contents
//! whose entries expire after a backend-wide TTL, along with a Redis
//! implementation for production and an in-process one for development
//! and tests.

mod cache;
mod error;
mod memory;
mod redis;
mod types;

pub use cache::BlobCache;
pub use error::{CacheError, Result};
pub use memory::MemoryCache;
pub use redis::RedisCache;
pub use types::{RedisCacheConfig, RetryPolicy};
