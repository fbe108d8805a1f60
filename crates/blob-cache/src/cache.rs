//! The cache port shared by every backend

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// A key/value store for file contents with backend-owned expiry.
///
/// Implementations are shared across concurrent requests and background
/// tasks, so they must handle their own connection pooling and locking.
/// Entries expire after the TTL the backend was configured with; callers
/// never pass a per-key TTL and never delete entries.
#[async_trait]
pub trait BlobCache: Send + Sync {
    /// Look up `key`.
    ///
    /// Returns `Ok(None)` when the key is simply absent. An `Err` means the
    /// backend could not be consulted and says nothing about the key.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Store `data` under `key` with the backend's configured TTL
    async fn set(&self, key: &str, data: Bytes) -> Result<()>;

    /// Check that the backend is reachable
    async fn ping(&self) -> Result<()>;

    /// Release backend resources. Calling it more than once is a no-op.
    async fn close(&self) -> Result<()>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}
