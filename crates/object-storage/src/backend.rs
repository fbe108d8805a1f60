//! `object_store`-backed implementation of [`ObjectStorage`]

use crate::error::{Result, StorageError};
use crate::storage::ObjectStorage;
use crate::types::{R2Config, StorageBackend};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use std::sync::Arc;
use tracing::{debug, info};

/// Object storage over any `object_store` backend.
///
/// Supports:
/// - Cloudflare R2 (and other S3-compatible endpoints)
/// - Local filesystem
/// - In-memory (for development and tests)
pub struct ObjectStoreStorage {
    inner: Arc<dyn ObjectStore>,
    label: &'static str,
    /// Whether the backend can persist object attributes such as content type.
    /// The local filesystem backend cannot.
    supports_attributes: bool,
}

impl ObjectStoreStorage {
    /// Build storage for the configured backend
    pub fn from_backend(backend: &StorageBackend) -> Result<Self> {
        match backend {
            StorageBackend::R2(config) => Self::r2(config),
            StorageBackend::File(path) => {
                std::fs::create_dir_all(path).map_err(|e| {
                    StorageError::Config(format!(
                        "failed to create storage directory {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                let store = LocalFileSystem::new_with_prefix(path).map_err(|e| {
                    StorageError::Config(format!(
                        "failed to open storage directory {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                info!(path = %path.display(), "Filesystem storage configured");
                Ok(Self {
                    inner: Arc::new(store),
                    label: "file",
                    supports_attributes: false,
                })
            }
            StorageBackend::Memory => {
                info!("In-memory storage configured");
                Ok(Self::memory())
            }
        }
    }

    /// Storage backed by an R2 bucket
    pub fn r2(config: &R2Config) -> Result<Self> {
        if config.account_id.is_empty() {
            return Err(StorageError::Config("R2 account id is required".to_string()));
        }
        if config.bucket_name.is_empty() {
            return Err(StorageError::Config("R2 bucket name is required".to_string()));
        }

        let store = AmazonS3Builder::new()
            .with_endpoint(config.endpoint())
            .with_region("auto")
            .with_bucket_name(&config.bucket_name)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .build()
            .map_err(|e| StorageError::Config(format!("failed to create R2 client: {}", e)))?;

        info!(
            bucket = %config.bucket_name,
            endpoint = %config.endpoint(),
            "R2 storage configured"
        );

        Ok(Self {
            inner: Arc::new(store),
            label: "r2",
            supports_attributes: true,
        })
    }

    /// Ephemeral in-memory storage
    pub fn memory() -> Self {
        Self {
            inner: Arc::new(InMemory::new()),
            label: "memory",
            supports_attributes: true,
        }
    }

    /// Short backend name for logs
    pub fn label(&self) -> &'static str {
        self.label
    }
}

fn object_path(key: &str) -> Result<Path> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey {
            key: String::new(),
            reason: "key is empty".to_string(),
        });
    }
    Path::parse(key).map_err(|e| StorageError::InvalidKey {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl ObjectStorage for ObjectStoreStorage {
    async fn get_object(&self, key: &str) -> Result<Bytes> {
        let path = object_path(key)?;

        let result = self
            .inner
            .get(&path)
            .await
            .map_err(|e| StorageError::from_object_store(e, key))?;

        let data = result
            .bytes()
            .await
            .map_err(|e| StorageError::from_object_store(e, key))?;

        debug!(key, size = data.len(), backend = self.label, "Fetched object");
        Ok(data)
    }

    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        let path = object_path(key)?;
        let size = data.len();

        let mut opts = PutOptions::default();
        if self.supports_attributes {
            let mut attributes = Attributes::new();
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
            opts.attributes = attributes;
        }

        self.inner
            .put_opts(&path, PutPayload::from_bytes(data), opts)
            .await?;

        debug!(key, size, content_type, backend = self.label, "Stored object");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        let path = object_path(key)?;
        match self.inner.delete(&path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn object_exists(&self, key: &str) -> Result<bool> {
        let path = object_path(key)?;
        match self.inner.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn health_check(&self) -> Result<()> {
        // Reading the first listing page proves the bucket exists and the
        // credentials can read it.
        let mut listing = self.inner.list(None);
        match listing.next().await {
            None | Some(Ok(_)) => Ok(()),
            Some(Err(e)) => Err(e.into()),
        }
    }
}
