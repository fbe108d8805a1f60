//! Error types for object storage

use std::fmt;

#[derive(Debug)]
pub enum StorageError {
    /// No object exists under the key
    NotFound { key: String },
    /// The key cannot be used as an object path
    InvalidKey { key: String, reason: String },
    /// Any other backend failure: connectivity, permissions, bad responses
    ObjectStore(Box<object_store::Error>),
    /// The backend could not be constructed
    Config(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    /// Map a backend error for `key`, keeping not-found distinct
    pub fn from_object_store(err: object_store::Error, key: &str) -> Self {
        match err {
            object_store::Error::NotFound { .. } => StorageError::NotFound {
                key: key.to_string(),
            },
            other => StorageError::ObjectStore(Box::new(other)),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound { key } => write!(f, "Object not found: {}", key),
            StorageError::InvalidKey { key, reason } => {
                write!(f, "Invalid object key {:?}: {}", key, reason)
            }
            StorageError::ObjectStore(err) => write!(f, "Object store error: {}", err),
            StorageError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::ObjectStore(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<object_store::Error> for StorageError {
    fn from(err: object_store::Error) -> Self {
        StorageError::ObjectStore(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
