//! File Caching Service - read-through HTTP cache for object storage
//!
//! Serves files from a Redis cache when present and falls back to
//! Cloudflare R2, populating the cache in the background.

mod config;
mod content;
mod error;
mod health;
mod metrics;
#[cfg(test)]
mod mocks;
mod retrieval;
mod server;
mod types;

use crate::config::{CacheMode, Config};
use crate::error::{Result, ServiceError};
use crate::health::HealthAggregator;
use crate::retrieval::FileRetriever;
use crate::server::{start_server, ServerState, SharedState};
use blob_cache::{BlobCache, MemoryCache, RedisCache};
use object_storage::{ObjectStorage, ObjectStoreStorage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Upper bound on draining write-backs at shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    init_logging(&config)?;

    info!("Starting File Caching Service...");
    info!("Port: {}", config.port);
    info!("Request timeout: {:?}", config.request_timeout);

    metrics::init_metrics();

    let cache = build_cache(&config).await?;
    let storage = ObjectStoreStorage::from_backend(&config.storage)?;
    info!(backend = storage.label(), "Storage ready");
    let storage: Arc<dyn ObjectStorage> = Arc::new(storage);

    let retriever = Arc::new(FileRetriever::new(
        cache.clone(),
        storage.clone(),
        config.retrieval_policy(),
    ));
    info!(cache_enabled = retriever.cache_enabled(), "Retriever ready");
    let health = HealthAggregator::new(cache, storage, config.health_timeout);

    let state: SharedState = Arc::new(ServerState::new(retriever.clone(), health));

    let served = start_server(state, config.port)
        .await
        .map_err(|e| ServiceError::Config(format!("Server error: {}", e)));

    retriever.shutdown(SHUTDOWN_GRACE).await;
    info!("File Caching Service stopped");

    served
}

fn init_logging(config: &Config) -> Result<()> {
    // RUST_LOG wins over LOG_LEVEL
    let env_filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.is_empty() => EnvFilter::try_new(directives)?,
        _ => EnvFilter::try_new(&config.log_level)?,
    };

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if config.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    Ok(())
}

/// Connect the configured cache. An unreachable Redis at startup is logged
/// and kept, since lookups fall back to storage until it recovers.
async fn build_cache(config: &Config) -> Result<Option<Arc<dyn BlobCache>>> {
    match config.cache_mode {
        CacheMode::Disabled => {
            info!("Cache disabled, serving directly from storage");
            Ok(None)
        }
        CacheMode::Memory => {
            info!(
                max_mb = config.memory_cache_max_bytes / (1024 * 1024),
                ttl = %humantime::format_duration(config.redis.ttl),
                "Using in-memory cache"
            );
            let cache = MemoryCache::new(config.redis.ttl, config.memory_cache_max_bytes);
            Ok(Some(Arc::new(cache)))
        }
        CacheMode::Redis => {
            let cache = RedisCache::new(&config.redis)?;
            match cache.ping().await {
                Ok(()) => info!(addr = %config.redis.addr, "Connected to Redis"),
                Err(e) => warn!(
                    addr = %config.redis.addr,
                    error = %e,
                    "Redis unreachable, continuing with storage fallback"
                ),
            }
            Ok(Some(Arc::new(cache)))
        }
    }
}
