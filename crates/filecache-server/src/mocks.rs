//! In-process cache and storage doubles for unit tests

use async_trait::async_trait;
use blob_cache::{BlobCache, CacheError};
use bytes::Bytes;
use object_storage::{ObjectStorage, StorageError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

fn backend_failure(message: &'static str) -> StorageError {
    StorageError::from(object_store::Error::Generic {
        store: "mock",
        source: message.into(),
    })
}

#[derive(Default)]
pub struct MockCache {
    entries: Mutex<HashMap<String, Bytes>>,
    get_calls: AtomicUsize,
    set_calls: AtomicUsize,
    closed: AtomicBool,
    fail_get: bool,
    fail_set: bool,
    fail_ping: bool,
    delay: Option<Duration>,
    set_delay: Option<Duration>,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_get(mut self) -> Self {
        self.fail_get = true;
        self
    }

    pub fn fail_set(mut self) -> Self {
        self.fail_set = true;
        self
    }

    pub fn fail_ping(mut self) -> Self {
        self.fail_ping = true;
        self
    }

    /// Delay every operation before it runs
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay only writes, on top of any general delay
    pub fn with_set_delay(mut self, delay: Duration) -> Self {
        self.set_delay = Some(delay);
        self
    }

    pub fn insert(&self, key: &str, data: &'static [u8]) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), Bytes::from_static(data));
    }

    pub fn stored(&self, key: &str) -> Option<Bytes> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl BlobCache for MockCache {
    async fn get(&self, key: &str) -> blob_cache::Result<Option<Bytes>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_get {
            return Err(CacheError::Pool("connection refused".to_string()));
        }
        Ok(self.stored(key))
    }

    async fn set(&self, key: &str, data: Bytes) -> blob_cache::Result<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if let Some(delay) = self.set_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_set {
            return Err(CacheError::Pool("connection refused".to_string()));
        }
        self.entries.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn ping(&self) -> blob_cache::Result<()> {
        self.pause().await;
        if self.fail_ping {
            return Err(CacheError::Pool("connection refused".to_string()));
        }
        Ok(())
    }

    async fn close(&self) -> blob_cache::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[derive(Default)]
pub struct MockStorage {
    objects: Mutex<HashMap<String, Bytes>>,
    get_calls: AtomicUsize,
    fail_get: bool,
    fail_health: bool,
    delay: Option<Duration>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_get(mut self) -> Self {
        self.fail_get = true;
        self
    }

    pub fn fail_health(mut self) -> Self {
        self.fail_health = true;
        self
    }

    /// Delay reads and health checks before they run
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert(&self, key: &str, data: &'static [u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), Bytes::from_static(data));
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ObjectStorage for MockStorage {
    async fn get_object(&self, key: &str) -> object_storage::Result<Bytes> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_get {
            return Err(backend_failure("access denied"));
        }
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_string(),
            })
    }

    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> object_storage::Result<()> {
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> object_storage::Result<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn object_exists(&self, key: &str) -> object_storage::Result<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn health_check(&self) -> object_storage::Result<()> {
        self.pause().await;
        if self.fail_health {
            return Err(backend_failure("bucket unreachable"));
        }
        Ok(())
    }
}
