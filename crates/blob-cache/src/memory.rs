//! In-process blob cache

use crate::cache::BlobCache;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use moka::future::Cache;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

/// Blob cache held in process memory.
///
/// Entries expire after `ttl` and the total size of cached values is capped
/// at `max_bytes`; moka evicts the least useful entries once the cap is hit.
pub struct MemoryCache {
    inner: Cache<String, Bytes>,
    closed: AtomicBool,
}

impl MemoryCache {
    pub fn new(ttl: Duration, max_bytes: u64) -> Self {
        let inner = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(max_bytes)
            .weigher(|key: &String, value: &Bytes| {
                (key.len() + value.len()).try_into().unwrap_or(u32::MAX)
            })
            .build();

        info!(ttl_secs = ttl.as_secs(), max_bytes, "Memory cache configured");

        Self {
            inner,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(CacheError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BlobCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.ensure_open()?;
        Ok(self.inner.get(key).await)
    }

    async fn set(&self, key: &str, data: Bytes) -> Result<()> {
        self.ensure_open()?;
        self.inner.insert(key.to_string(), data).await;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.ensure_open()
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.inner.invalidate_all();
            info!("Memory cache closed");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
