//! Response shaping for served files

use crate::retrieval::RetrievedFile;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// MIME type for a filename, inferred from its extension.
/// Unknown or missing extensions map to `application/octet-stream`.
pub fn content_type_for(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn content_disposition(filename: &str) -> HeaderValue {
    let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_str(&format!("inline; filename=\"{}\"", escaped))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"))
}

/// Build the 200 response carrying a file's bytes
pub fn file_response(filename: &str, file: RetrievedFile) -> Response {
    let content_type = HeaderValue::from_str(&content_type_for(filename))
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, content_type),
            (CONTENT_DISPOSITION, content_disposition(filename)),
            (CONTENT_LENGTH, HeaderValue::from(file.data.len())),
            (X_CACHE, HeaderValue::from_static(file.source.cache_status())),
        ],
        file.data,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::FileSource;
    use bytes::Bytes;

    #[test]
    fn test_content_type_inference() {
        assert_eq!(content_type_for("a.txt"), "text/plain");
        assert_eq!(content_type_for("photo.JPG"), "image/jpeg");
        assert_eq!(content_type_for("report.pdf"), "application/pdf");
        assert_eq!(content_type_for("dir/page.html"), "text/html");
        assert_eq!(content_type_for("data.json"), "application/json");
    }

    #[test]
    fn test_unknown_extension_is_binary() {
        assert_eq!(content_type_for("README"), "application/octet-stream");
        assert_eq!(content_type_for("blob.zzqx"), "application/octet-stream");
    }

    #[test]
    fn test_content_disposition_escapes_quotes() {
        assert_eq!(
            content_disposition("a.txt").to_str().unwrap(),
            "inline; filename=\"a.txt\""
        );
        assert_eq!(
            content_disposition("my \"file\".txt").to_str().unwrap(),
            "inline; filename=\"my \\\"file\\\".txt\""
        );
        assert_eq!(content_disposition("bad\nname").to_str().unwrap(), "inline");
    }

    #[test]
    fn test_file_response_headers() {
        let file = RetrievedFile {
            data: Bytes::from_static(b"hello"),
            source: FileSource::Cache,
        };
        let response = file_response("a.txt", file);

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[CONTENT_TYPE], "text/plain");
        assert_eq!(headers[CONTENT_LENGTH], "5");
        assert_eq!(headers[X_CACHE], "HIT");
    }
}
