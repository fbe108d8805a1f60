//! Storage backend configuration

use std::fmt;
use std::path::PathBuf;

/// Credentials and location of a Cloudflare R2 bucket
#[derive(Clone, Default)]
pub struct R2Config {
    pub account_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
}

impl R2Config {
    /// S3 API endpoint for the account
    pub fn endpoint(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }
}

// Keeps the secret out of logs.
impl fmt::Debug for R2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("R2Config")
            .field("account_id", &self.account_id)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket_name", &self.bucket_name)
            .finish()
    }
}

/// Which object store backs the service
#[derive(Debug, Clone)]
pub enum StorageBackend {
    R2(R2Config),
    /// Objects are files under this directory
    File(PathBuf),
    /// Ephemeral, process-local
    Memory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_r2_endpoint() {
        let config = R2Config {
            account_id: "abc123".to_string(),
            ..Default::default()
        };
        assert_eq!(config.endpoint(), "https://abc123.r2.cloudflarestorage.com");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = R2Config {
            secret_access_key: "super-secret".to_string(),
            ..Default::default()
        };
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("super-secret"));
        assert!(debug_str.contains("<redacted>"));
    }
}
