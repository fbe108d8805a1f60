//! Response envelope and payload types

use serde::{Deserialize, Serialize};

/// Envelope wrapping every JSON response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }

    /// Attach a payload. Values that fail to serialize are dropped.
    pub fn with_data(mut self, data: impl Serialize) -> Self {
        self.data = serde_json::to_value(data).ok();
        self
    }
}

/// Payload of `GET /`
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_omits_data() {
        let json = serde_json::to_value(ApiResponse::failure("File not found")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": false, "message": "File not found" })
        );
    }

    #[test]
    fn test_success_with_data() {
        let info = ServiceInfo {
            service: "filecache-server",
            version: "1.0.0",
            uptime_secs: 42,
        };
        let response = ApiResponse::success("File Caching Service").with_data(info);

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"success\":true"));
        assert!(json.contains("filecache-server"));
        assert!(json.contains("42"));
    }

    #[test]
    fn test_envelope_deserialization() {
        let json = r#"{"success":false,"message":"Request timeout"}"#;
        let response: ApiResponse = serde_json::from_str(json).unwrap();
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("Request timeout"));
        assert!(response.data.is_none());
    }
}
