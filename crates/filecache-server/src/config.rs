//! Service configuration from environment variables

use crate::retrieval::RetrievalPolicy;
use blob_cache::{RedisCacheConfig, RetryPolicy};
use object_storage::{R2Config, StorageBackend};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which cache tier sits in front of storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// No cache; every request goes to storage
    Disabled,
    Redis,
    /// In-process cache, for running without Redis
    Memory,
}

impl CacheMode {
    /// `disabled`, `none`, `off` and `false` (any case) turn the cache off,
    /// `memory` selects the in-process cache, anything else means Redis.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "disabled" | "none" | "off" | "false" => CacheMode::Disabled,
            "memory" => CacheMode::Memory,
            _ => CacheMode::Redis,
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    pub log_json: bool,
    pub cache_mode: CacheMode,
    pub redis: RedisCacheConfig,
    pub memory_cache_max_bytes: u64,
    pub storage: StorageBackend,
    /// Deadline covering cache lookup and storage fetch of one request
    pub request_timeout: Duration,
    /// Budget of each background cache write
    pub cache_write_timeout: Duration,
    pub health_timeout: Duration,
    pub max_pending_write_backs: usize,
}

impl Config {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse configuration from any key lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let string = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());
        let duration = |key: &str, default: Duration| {
            var(key)
                .and_then(|v| humantime::parse_duration(&v).ok())
                .unwrap_or(default)
        };

        let port = parse_var(&var, "PORT", 8080u16);

        let redis = RedisCacheConfig {
            addr: string("REDIS_ADDR", "localhost:6379"),
            password: var("REDIS_PASSWORD"),
            db: parse_var(&var, "REDIS_DB", 0i64),
            ttl: duration("CACHE_TTL", Duration::from_secs(5 * 60)),
            dial_timeout: duration("REDIS_DIAL_TIMEOUT", Duration::from_secs(2)),
            read_timeout: duration("REDIS_READ_TIMEOUT", Duration::from_secs(5)),
            write_timeout: duration("REDIS_WRITE_TIMEOUT", Duration::from_secs(5)),
            pool_size: 10,
            retry: RetryPolicy {
                max_retries: parse_var(&var, "REDIS_MAX_RETRIES", 3u32),
                min_backoff: duration("REDIS_MIN_RETRY_BACKOFF", Duration::from_millis(100)),
                max_backoff: duration("REDIS_MAX_RETRY_BACKOFF", Duration::from_millis(500)),
            },
        };

        let storage = match string("STORAGE_BACKEND", "r2").to_ascii_lowercase().as_str() {
            "memory" => StorageBackend::Memory,
            "file" | "fs" | "local" => {
                StorageBackend::File(PathBuf::from(string("STORAGE_PATH", "./data")))
            }
            _ => StorageBackend::R2(R2Config {
                account_id: string("R2_ACCOUNT_ID", ""),
                access_key_id: string("R2_ACCESS_KEY_ID", ""),
                secret_access_key: string("R2_SECRET_ACCESS_KEY", ""),
                bucket_name: string("R2_BUCKET_NAME", ""),
            }),
        };

        Self {
            port,
            log_level: string("LOG_LEVEL", "info"),
            log_json: var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false),
            cache_mode: CacheMode::parse(&string("REDIS_MODE", "enabled")),
            redis,
            memory_cache_max_bytes: parse_var(
                &var,
                "MEMORY_CACHE_MAX_BYTES",
                256 * 1024 * 1024u64,
            ),
            storage,
            request_timeout: duration("REQUEST_TIMEOUT", Duration::from_secs(30)),
            cache_write_timeout: duration("CACHE_WRITE_TIMEOUT", Duration::from_secs(30)),
            health_timeout: duration("HEALTH_TIMEOUT", Duration::from_secs(5)),
            max_pending_write_backs: parse_var(&var, "MAX_PENDING_WRITE_BACKS", 64usize),
        }
    }

    /// Timeouts and limits for the file retriever
    pub fn retrieval_policy(&self) -> RetrievalPolicy {
        RetrievalPolicy {
            request_timeout: self.request_timeout,
            cache_lookup_timeout: self.redis.read_timeout,
            write_back_timeout: self.cache_write_timeout,
            max_pending_write_backs: self.max_pending_write_backs,
        }
    }
}

/// Parse a variable into its target type. Unparsable or out-of-range
/// values fall back to the default.
fn parse_var<T: FromStr>(var: impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
