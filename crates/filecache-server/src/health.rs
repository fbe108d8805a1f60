//! Service health from cache and storage probes.
//!
//! Storage is required: when it fails the service is unhealthy. The cache is
//! an optimization, so its state is reported but never changes the verdict.

use blob_cache::BlobCache;
use object_storage::ObjectStorage;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// Health of one dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentHealth {
    Healthy,
    Unhealthy(String),
    /// Not configured
    Disabled,
}

impl ComponentHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ComponentHealth::Healthy)
    }
}

impl fmt::Display for ComponentHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentHealth::Healthy => write!(f, "healthy"),
            ComponentHealth::Unhealthy(reason) => write!(f, "unhealthy: {}", reason),
            ComponentHealth::Disabled => write!(f, "disabled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Unhealthy,
}

/// Result of one health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub overall: OverallStatus,
    pub cache: ComponentHealth,
    pub storage: ComponentHealth,
}

impl HealthSnapshot {
    pub fn is_healthy(&self) -> bool {
        self.overall == OverallStatus::Healthy
    }

    pub fn report(&self) -> HealthReport {
        HealthReport {
            status: self.overall,
            redis: self.cache.to_string(),
            r2: self.storage.to_string(),
        }
    }
}

/// JSON payload of `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: OverallStatus,
    pub redis: String,
    pub r2: String,
}

/// Probes cache and storage on demand. Nothing is cached between checks.
pub struct HealthAggregator {
    cache: Option<Arc<dyn BlobCache>>,
    storage: Arc<dyn ObjectStorage>,
    timeout: Duration,
}

impl HealthAggregator {
    pub fn new(
        cache: Option<Arc<dyn BlobCache>>,
        storage: Arc<dyn ObjectStorage>,
        timeout: Duration,
    ) -> Self {
        Self {
            cache,
            storage,
            timeout,
        }
    }

    /// Probe both dependencies concurrently
    pub async fn check(&self) -> HealthSnapshot {
        let cache_probe = async {
            match &self.cache {
                Some(cache) => probe(self.timeout, cache.ping()).await,
                None => ComponentHealth::Disabled,
            }
        };
        let storage_probe = probe(self.timeout, self.storage.health_check());

        let (cache, storage) = tokio::join!(cache_probe, storage_probe);

        if let ComponentHealth::Unhealthy(reason) = &cache {
            warn!(reason = %reason, "Cache health check failed");
        }
        if let ComponentHealth::Unhealthy(reason) = &storage {
            warn!(reason = %reason, "Storage health check failed");
        }

        let overall = if storage.is_healthy() {
            OverallStatus::Healthy
        } else {
            OverallStatus::Unhealthy
        };

        HealthSnapshot {
            overall,
            cache,
            storage,
        }
    }
}

async fn probe<E, F>(limit: Duration, check: F) -> ComponentHealth
where
    E: fmt::Display,
    F: Future<Output = Result<(), E>>,
{
    match timeout(limit, check).await {
        Ok(Ok(())) => ComponentHealth::Healthy,
        Ok(Err(e)) => ComponentHealth::Unhealthy(e.to_string()),
        Err(_) => ComponentHealth::Unhealthy(format!(
            "timed out after {}",
            humantime::format_duration(limit)
        )),
    }
}
