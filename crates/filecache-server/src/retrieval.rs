//! Read-through file retrieval.
//!
//! [`FileRetriever`] answers every request from the cache when it can and
//! falls back to object storage otherwise. Objects fetched from storage are
//! written back to the cache by detached tasks so the response never waits
//! on the cache write.
//!
//! Cache faults are never fatal: a failing or slow cache costs one trip to
//! storage and a log line.

use crate::error::RetrievalError;
use crate::metrics;
use blob_cache::BlobCache;
use bytes::Bytes;
use object_storage::{ObjectStorage, StorageError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Timeouts and limits applied to each retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalPolicy {
    /// Deadline for the whole request, cache lookup included
    pub request_timeout: Duration,
    /// Upper bound on the cache lookup within the request deadline
    pub cache_lookup_timeout: Duration,
    /// Budget of one background cache write
    pub write_back_timeout: Duration,
    /// Write-backs allowed in flight at once; extra ones are skipped
    pub max_pending_write_backs: usize,
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            cache_lookup_timeout: Duration::from_secs(5),
            write_back_timeout: Duration::from_secs(30),
            max_pending_write_backs: 64,
        }
    }
}

/// Where a retrieved file came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSource {
    Cache,
    Storage,
}

impl FileSource {
    /// Value of the `X-Cache` response header
    pub fn cache_status(&self) -> &'static str {
        match self {
            FileSource::Cache => "HIT",
            FileSource::Storage => "MISS",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetrievedFile {
    pub data: Bytes,
    pub source: FileSource,
}

/// Cache-aside retriever over a cache and a storage backend.
///
/// The cache is optional. Without one every request goes to storage.
pub struct FileRetriever {
    cache: Option<Arc<dyn BlobCache>>,
    storage: Arc<dyn ObjectStorage>,
    policy: RetrievalPolicy,
    write_backs: TaskTracker,
    write_back_permits: Arc<Semaphore>,
}

impl FileRetriever {
    pub fn new(
        cache: Option<Arc<dyn BlobCache>>,
        storage: Arc<dyn ObjectStorage>,
        policy: RetrievalPolicy,
    ) -> Self {
        Self {
            cache,
            storage,
            write_back_permits: Arc::new(Semaphore::new(
                policy.max_pending_write_backs.min(Semaphore::MAX_PERMITS),
            )),
            policy,
            write_backs: TaskTracker::new(),
        }
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Fetch a file by key, from the cache if present, otherwise from storage
    pub async fn get_file(&self, key: &str) -> Result<RetrievedFile, RetrievalError> {
        if key.is_empty() {
            return Err(RetrievalError::EmptyKey);
        }

        let deadline = Instant::now() + self.policy.request_timeout;

        if let Some(cache) = &self.cache {
            if let Some(data) = self.lookup_cache(cache.as_ref(), key, deadline).await {
                return Ok(RetrievedFile {
                    data,
                    source: FileSource::Cache,
                });
            }
        }

        let data = self.fetch_from_storage(key, deadline).await?;
        self.schedule_write_back(key, data.clone());

        Ok(RetrievedFile {
            data,
            source: FileSource::Storage,
        })
    }

    /// Look the key up in the cache. Errors and timeouts are reported as misses.
    async fn lookup_cache(
        &self,
        cache: &dyn BlobCache,
        key: &str,
        deadline: Instant,
    ) -> Option<Bytes> {
        let limit = deadline.min(Instant::now() + self.policy.cache_lookup_timeout);
        let started = Instant::now();
        let outcome = timeout_at(limit, cache.get(key)).await;
        metrics::record_cache_operation("get", started.elapsed());

        match outcome {
            Ok(Ok(Some(data))) => {
                metrics::record_cache_hit();
                debug!(key, size = data.len(), "Cache hit");
                Some(data)
            }
            Ok(Ok(None)) => {
                metrics::record_cache_miss();
                debug!(key, "Cache miss");
                None
            }
            Ok(Err(e)) => {
                metrics::record_cache_miss();
                warn!(key, error = %e, "Cache lookup failed, falling back to storage");
                None
            }
            Err(_) => {
                metrics::record_cache_miss();
                warn!(
                    key,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Cache lookup timed out, falling back to storage"
                );
                None
            }
        }
    }

    async fn fetch_from_storage(
        &self,
        key: &str,
        deadline: Instant,
    ) -> Result<Bytes, RetrievalError> {
        let started = Instant::now();
        let outcome = timeout_at(deadline, self.storage.get_object(key)).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(Ok(data)) => {
                metrics::record_storage_request("get_object", true, elapsed);
                debug!(key, size = data.len(), "Fetched from storage");
                Ok(data)
            }
            Ok(Err(e)) => {
                metrics::record_storage_request("get_object", false, elapsed);
                let err = classify_storage_error(e, deadline);
                match &err {
                    RetrievalError::NotFound => debug!(key, "File not found in storage"),
                    other => warn!(key, error = %other, "Storage fetch failed"),
                }
                Err(err)
            }
            Err(_) => {
                metrics::record_storage_request("get_object", false, elapsed);
                warn!(
                    key,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Storage fetch timed out"
                );
                Err(RetrievalError::Timeout)
            }
        }
    }

    /// Populate the cache in the background. Skipped when the cache is
    /// disabled or too many writes are already pending.
    fn schedule_write_back(&self, key: &str, data: Bytes) {
        let Some(cache) = &self.cache else {
            return;
        };

        let permit = match Arc::clone(&self.write_back_permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                metrics::record_write_back_skipped();
                debug!(key, "Write-back queue full, skipping cache population");
                return;
            }
        };

        let cache = Arc::clone(cache);
        let key = key.to_string();
        let budget = self.policy.write_back_timeout;

        self.write_backs.spawn(async move {
            let _permit = permit;
            let started = Instant::now();
            let outcome = timeout(budget, cache.set(&key, data)).await;
            metrics::record_cache_operation("set", started.elapsed());

            match outcome {
                Ok(Ok(())) => debug!(key = %key, "Cached file"),
                Ok(Err(e)) => warn!(key = %key, error = %e, "Failed to cache file"),
                Err(_) => warn!(
                    key = %key,
                    timeout_ms = budget.as_millis() as u64,
                    "Cache write timed out"
                ),
            }
        });
    }

    /// Number of write-backs currently in flight
    pub fn pending_write_backs(&self) -> usize {
        self.write_backs.len()
    }

    /// Wait until every write-back scheduled so far has finished
    #[cfg(test)]
    pub async fn wait_for_write_backs(&self) {
        self.write_backs.close();
        self.write_backs.wait().await;
        self.write_backs.reopen();
    }

    /// Drain pending write-backs for at most `grace`, then close the cache
    pub async fn shutdown(&self, grace: Duration) {
        self.write_backs.close();
        if timeout(grace, self.write_backs.wait()).await.is_err() {
            warn!(
                pending = self.pending_write_backs(),
                "Write-backs still pending at shutdown, abandoning them"
            );
        }

        if let Some(cache) = &self.cache {
            match cache.close().await {
                Ok(()) => info!(cache = cache.name(), "Cache closed"),
                Err(e) => warn!(cache = cache.name(), error = %e, "Failed to close cache"),
            }
        }
    }
}

/// Map a storage failure onto a retrieval outcome. An elapsed deadline wins
/// over whatever the backend reported.
fn classify_storage_error(err: StorageError, deadline: Instant) -> RetrievalError {
    if Instant::now() >= deadline {
        return RetrievalError::Timeout;
    }
    match err {
        StorageError::NotFound { .. } => RetrievalError::NotFound,
        StorageError::InvalidKey { reason, .. } => RetrievalError::InvalidKey(reason),
        other => RetrievalError::Storage(other),
    }
}
