//! Error types for the HTTP server.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use docgen_convert::{ConvertError, FailureCategory};
use serde_json::json;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ServerError {
    /// Upload rejected before conversion.
    #[error("{0}")]
    BadRequest(String),

    /// Document compiler cannot be launched.
    #[error("Pandoc is not available on the server")]
    CompilerUnavailable,

    /// Conversion failed.
    #[error("{0}")]
    Convert(#[from] ConvertError),

    /// Malformed multipart body.
    #[error("Invalid upload: {0}")]
    Multipart(#[from] MultipartError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({"error": message})),
            Self::CompilerUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({"error": self.to_string()}),
            ),
            Self::Convert(e) => {
                let status = match e.category() {
                    FailureCategory::InvalidRequest => StatusCode::BAD_REQUEST,
                    FailureCategory::CompilerUnavailable
                    | FailureCategory::CompilerTimeout
                    | FailureCategory::CompilerFailed
                    | FailureCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let body = match e.details() {
                    Some(details) => json!({"error": e.to_string(), "details": details}),
                    None => json!({"error": e.to_string()}),
                };
                (status, body)
            }
            Self::Multipart(e) => (e.status(), json!({"error": self.to_string()})),
            Self::Io(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": e.to_string()}),
            ),
            Self::Task(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": e.to_string()}),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use docgen_convert::{CompileError, TemplateError};
    use pretty_assertions::assert_eq;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_bad_request() {
        let response =
            ServerError::BadRequest("No file part in the request".to_owned()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"error": "No file part in the request"})
        );
    }

    #[tokio::test]
    async fn test_compiler_unavailable_is_503() {
        let response = ServerError::CompilerUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_compile_failure_includes_details() {
        let error = ServerError::from(ConvertError::from(CompileError::Failed {
            code: Some(1),
            details: "pandoc: unknown extension".to_owned(),
        }));

        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["details"], "pandoc: unknown extension");
        assert!(body["error"].as_str().unwrap().contains("conversion failed"));
    }

    #[tokio::test]
    async fn test_compile_timeout_has_no_details() {
        let error = ServerError::from(ConvertError::from(CompileError::Timeout(
            Duration::from_secs(60),
        )));

        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_invalid_template_is_400() {
        let error = ServerError::from(ConvertError::from(TemplateError::InvalidName {
            name: "../x.docx".to_owned(),
            reason: "unsafe filename",
        }));

        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
