//! Prometheus metrics for the file caching service.
//!
//! Covers HTTP traffic, cache hit/miss rates with per-operation latency,
//! and storage request outcomes.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Latency buckets in seconds, shared by every duration histogram.
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

    pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
    pub const CACHE_OPERATION_DURATION_SECONDS: &str = "cache_operation_duration_seconds";
    pub const CACHE_WRITE_BACKS_SKIPPED_TOTAL: &str = "cache_write_backs_skipped_total";

    pub const R2_REQUESTS_TOTAL: &str = "r2_requests_total";
    pub const R2_REQUEST_DURATION_SECONDS: &str = "r2_request_duration_seconds";
}

/// Initialize the Prometheus metrics exporter.
///
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    let builder = match PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("_seconds".to_string()), DURATION_BUCKETS)
    {
        Ok(builder) => builder,
        Err(e) => {
            tracing::error!(error = %e, "Invalid histogram buckets");
            return false;
        }
    };

    match builder.install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Failed to store Prometheus handle (already set)");
                return false;
            }
            register_counters();
            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Render all metrics in Prometheus text format.
///
/// Returns `None` if metrics were not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

/// Make the cache counters visible before the first request
fn register_counters() {
    counter!(names::CACHE_HITS_TOTAL).increment(0);
    counter!(names::CACHE_MISSES_TOTAL).increment(0);
}

// =============================================================================
// HTTP Metrics
// =============================================================================

/// Record an HTTP request. `path` should be the matched route, not the raw URI.
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    counter!(
        names::HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration.as_secs_f64());
}

// =============================================================================
// Cache Metrics
// =============================================================================

pub fn record_cache_hit() {
    counter!(names::CACHE_HITS_TOTAL).increment(1);
}

/// Record a cache miss. Cache errors and timeouts count as misses too.
pub fn record_cache_miss() {
    counter!(names::CACHE_MISSES_TOTAL).increment(1);
}

/// Record the latency of a cache `get` or `set`.
pub fn record_cache_operation(operation: &'static str, duration: Duration) {
    histogram!(
        names::CACHE_OPERATION_DURATION_SECONDS,
        "operation" => operation
    )
    .record(duration.as_secs_f64());
}

pub fn record_write_back_skipped() {
    counter!(names::CACHE_WRITE_BACKS_SKIPPED_TOTAL).increment(1);
}

// =============================================================================
// Storage Metrics
// =============================================================================

/// Record a storage request and its outcome.
pub fn record_storage_request(operation: &'static str, success: bool, duration: Duration) {
    let status = if success { "success" } else { "error" };

    counter!(
        names::R2_REQUESTS_TOTAL,
        "operation" => operation,
        "status" => status
    )
    .increment(1);

    histogram!(
        names::R2_REQUEST_DURATION_SECONDS,
        "operation" => operation
    )
    .record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        // Without an installed recorder the macros discard values
        record_http_request("GET", "/files/{filename}", 200, Duration::from_millis(5));
        record_cache_hit();
        record_cache_miss();
        record_cache_operation("get", Duration::from_millis(1));
        record_storage_request("get_object", false, Duration::from_millis(20));
        record_write_back_skipped();
    }

    #[test]
    fn test_init_and_render() {
        init_metrics();
        assert!(!init_metrics());

        record_cache_hit();
        let rendered = render_metrics().expect("metrics initialized");
        assert!(rendered.contains(names::CACHE_HITS_TOTAL));
        assert!(rendered.contains(names::CACHE_MISSES_TOTAL));
    }
}
