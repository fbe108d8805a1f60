//! HTTP server for the file cache
//!
//! Provides /, /health, /metrics and /files/{filename} endpoints.

use crate::content::file_response;
use crate::error::RetrievalError;
use crate::health::HealthAggregator;
use crate::metrics;
use crate::retrieval::FileRetriever;
use crate::types::{ApiResponse, ServiceInfo};
use axum::{
    extract::{rejection::PathRejection, MatchedPath, Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::info;

const SERVICE_NAME: &str = "File Caching Service";

/// Shared state for the HTTP server
pub struct ServerState {
    pub retriever: Arc<FileRetriever>,
    pub health: HealthAggregator,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(retriever: Arc<FileRetriever>, health: HealthAggregator) -> Self {
        Self {
            retriever,
            health,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/files/", get(missing_filename))
        .route("/files/{*filename}", get(get_file))
        .fallback(not_found)
        .layer(middleware::from_fn(track_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server and serve until Ctrl-C or SIGTERM
pub async fn start_server(state: SharedState, port: u16) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

/// Time every request and record it under its route pattern
async fn track_requests(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let duration = started.elapsed();
    let status = response.status().as_u16();
    metrics::record_http_request(method.as_str(), &path, status, duration);
    info!(
        method = %method,
        path = %path,
        status,
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}

async fn root(State(state): State<SharedState>) -> Json<ApiResponse> {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0) as u64;
    Json(ApiResponse::success(SERVICE_NAME).with_data(ServiceInfo {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs,
    }))
}

/// Health check endpoint. 503 when storage is unreachable.
async fn health(State(state): State<SharedState>) -> Response {
    let snapshot = state.health.check().await;

    let (status, envelope) = if snapshot.is_healthy() {
        (StatusCode::OK, ApiResponse::success("Service is healthy"))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            ApiResponse::failure("Service is unhealthy"),
        )
    };

    (status, Json(envelope.with_data(snapshot.report()))).into_response()
}

async fn metrics_endpoint() -> Response {
    match metrics::render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::failure("Metrics are not initialized")),
        )
            .into_response(),
    }
}

async fn missing_filename() -> RetrievalError {
    RetrievalError::EmptyKey
}

/// Serve a file from the cache or storage
async fn get_file(
    State(state): State<SharedState>,
    filename: Result<Path<String>, PathRejection>,
) -> Result<Response, RetrievalError> {
    // Undecodable names are a 400 in the JSON envelope
    let Path(filename) =
        filename.map_err(|rejection| RetrievalError::InvalidKey(rejection.body_text()))?;
    let file = state.retriever.get_file(&filename).await?;
    info!(
        filename = %filename,
        size = file.data.len(),
        cache = file.source.cache_status(),
        "Served file"
    );
    Ok(file_response(&filename, file))
}

async fn not_found() -> (StatusCode, Json<ApiResponse>) {
    (StatusCode::NOT_FOUND, Json(ApiResponse::failure("Not found")))
}
