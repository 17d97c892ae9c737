//! Error types for the media uploader

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::upload::{UploadError, UploadPhase};

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Failed read file: {0}")]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl AppError {
    /// The upload phase reported to the caller
    pub fn phase(&self) -> UploadPhase {
        match self {
            AppError::BadRequest(_) => UploadPhase::Validation,
            AppError::Multipart(_) => UploadPhase::ReadFile,
            AppError::Upload(e) => e.phase(),
        }
    }
}

/// Storage-specific errors
///
/// Every variant is classified as retryable or permanent so the part
/// uploader can stop burning attempts on failures that cannot recover.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("S3 connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Multipart upload not found: {0}")]
    UploadNotFound(String),

    #[error("Invalid part list: {0}")]
    InvalidPart(String),

    #[error("Request throttled: {0}")]
    Throttled(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("S3 SDK error: {0}")]
    SdkError(String),
}

impl StorageError {
    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::ConnectionFailed(_) | StorageError::Throttled(_) | StorageError::SdkError(_)
        )
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub phase: UploadPhase,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let phase = self.phase();
        let status = match (&self, phase) {
            // Oversized bodies surface here as 413
            (AppError::Multipart(e), _) => e.status(),
            (_, UploadPhase::Validation | UploadPhase::ReadFile) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(phase = %phase, "Upload request failed: {}", self);
        } else {
            tracing::info!(phase = %phase, "Upload request rejected: {}", self);
        }

        let body = Json(ErrorResponse {
            message: self.to_string(),
            phase,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(StorageError::ConnectionFailed("reset".into()).is_retryable());
        assert!(StorageError::Throttled("SlowDown".into()).is_retryable());
        assert!(StorageError::SdkError("500".into()).is_retryable());

        assert!(!StorageError::AccessDenied("nope".into()).is_retryable());
        assert!(!StorageError::InvalidCredentials("empty key".into()).is_retryable());
        assert!(!StorageError::UploadNotFound("id".into()).is_retryable());
    }

    #[test]
    fn test_bad_request_status() {
        let response = AppError::BadRequest("No files provided".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
