//! Error types for the file caching service

use crate::types::ApiResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use blob_cache::CacheError;
use object_storage::StorageError;
use std::fmt;

/// Startup and wiring failures
#[derive(Debug)]
pub enum ServiceError {
    Cache(CacheError),
    Storage(StorageError),
    Io(Box<std::io::Error>),
    Config(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Cache(err) => write!(f, "Cache error: {}", err),
            ServiceError::Storage(err) => write!(f, "Storage error: {}", err),
            ServiceError::Io(err) => write!(f, "IO error: {}", err),
            ServiceError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Cache(err) => Some(err),
            ServiceError::Storage(err) => Some(err),
            ServiceError::Io(err) => Some(err.as_ref()),
            ServiceError::Config(_) => None,
        }
    }
}

impl From<CacheError> for ServiceError {
    fn from(err: CacheError) -> Self {
        ServiceError::Cache(err)
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Storage(err)
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for ServiceError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ServiceError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Why a file could not be served.
///
/// Cache faults never appear here: they are absorbed by the retriever and
/// only cost a trip to storage.
#[derive(Debug)]
pub enum RetrievalError {
    /// No filename was given
    EmptyKey,
    /// The filename cannot address an object
    InvalidKey(String),
    /// Storage has no object under the key
    NotFound,
    /// The request deadline elapsed
    Timeout,
    /// Storage failed for any other reason
    Storage(StorageError),
}

impl RetrievalError {
    pub fn status(&self) -> StatusCode {
        match self {
            RetrievalError::EmptyKey | RetrievalError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            RetrievalError::NotFound => StatusCode::NOT_FOUND,
            RetrievalError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            RetrievalError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to clients
    pub fn public_message(&self) -> &'static str {
        match self {
            RetrievalError::EmptyKey => "filename is required",
            RetrievalError::InvalidKey(_) => "invalid filename",
            RetrievalError::NotFound => "File not found",
            RetrievalError::Timeout => "Request timeout",
            RetrievalError::Storage(_) => "Failed to retrieve file",
        }
    }
}

impl fmt::Display for RetrievalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalError::EmptyKey => write!(f, "Filename is empty"),
            RetrievalError::InvalidKey(reason) => write!(f, "Invalid filename: {}", reason),
            RetrievalError::NotFound => write!(f, "File not found"),
            RetrievalError::Timeout => write!(f, "Request timed out"),
            RetrievalError::Storage(err) => write!(f, "Storage error: {}", err),
        }
    }
}

impl std::error::Error for RetrievalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RetrievalError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl IntoResponse for RetrievalError {
    fn into_response(self) -> Response {
        (self.status(), Json(ApiResponse::failure(self.public_message()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ServiceError::Config("missing R2_BUCKET_NAME".to_string());
        assert_eq!(
            format!("{}", err),
            "Configuration error: missing R2_BUCKET_NAME"
        );
    }

    #[test]
    fn test_retrieval_error_status_codes() {
        assert_eq!(RetrievalError::EmptyKey.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RetrievalError::InvalidKey("bad".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(RetrievalError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(RetrievalError::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            RetrievalError::Storage(StorageError::Config("down".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_not_found_response_body() {
        let response = RetrievalError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": false, "message": "File not found" })
        );
    }

    #[test]
    fn test_storage_detail_is_not_exposed() {
        let err = RetrievalError::Storage(StorageError::Config("secret endpoint".to_string()));
        assert_eq!(err.public_message(), "Failed to retrieve file");
        assert!(format!("{}", err).contains("secret endpoint"));
    }
}
