//! The storage port

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Durable blob store holding the source of truth for served files.
///
/// `get_object` must report a missing key as [`crate::StorageError::NotFound`]
/// so callers can tell it apart from a backend fault without inspecting
/// error text.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Fetch the full contents of `key`
    async fn get_object(&self, key: &str) -> Result<Bytes>;

    /// Store `data` under `key`, recording `content_type` as metadata
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete_object(&self, key: &str) -> Result<()>;

    async fn object_exists(&self, key: &str) -> Result<bool>;

    /// Check that the bucket or directory is reachable and readable
    async fn health_check(&self) -> Result<()>;
}
