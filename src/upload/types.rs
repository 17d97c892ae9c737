//! Upload types

use std::collections::BTreeSet;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

// ============================================================================
// Requests
// ============================================================================

/// One file submitted for upload
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Original file name
    pub name: String,

    /// Raw file contents
    pub content: Bytes,

    /// Size in bytes
    pub size: u64,

    /// Content type the client declared for this file
    pub declared_content_type: String,
}

impl UploadRequest {
    pub fn new(
        name: impl Into<String>,
        declared_content_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        let content = content.into();
        Self {
            name: name.into(),
            size: content.len() as u64,
            content,
            declared_content_type: declared_content_type.into(),
        }
    }
}

/// A file that reached the backend as a complete object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub key: String,
    pub location: String,
}

// ============================================================================
// Validation
// ============================================================================

/// Size and content-type policy applied before any backend call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationPolicy {
    pub max_file_size: u64,
    pub allowed_content_types: BTreeSet<String>,
    /// Accept zero-byte files (uploaded as a single empty part)
    #[serde(default)]
    pub allow_empty: bool,
}

/// Policy violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("No files provided")]
    NoFiles,

    #[error("File too large")]
    TooLarge { name: String, size: u64, max: u64 },

    #[error("Filetype is not supported")]
    UnsupportedType { name: String, content_type: String },

    #[error("File is empty")]
    Empty { name: String },
}

// ============================================================================
// Phases & Errors
// ============================================================================

/// Stage of the pipeline a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadPhase {
    Validation,
    ReadFile,
    Plan,
    CreateSession,
    UploadPart,
    Complete,
    Abort,
    Internal,
}

impl UploadPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadPhase::Validation => "validation",
            UploadPhase::ReadFile => "read-file",
            UploadPhase::Plan => "plan",
            UploadPhase::CreateSession => "create-session",
            UploadPhase::UploadPart => "upload-part",
            UploadPhase::Complete => "complete",
            UploadPhase::Abort => "abort",
            UploadPhase::Internal => "internal",
        }
    }
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upload pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid part size: {0} (must be greater than zero)")]
    InvalidPartSize(u64),

    #[error("Failed to create upload session for {file_name}: {source}")]
    SessionInit {
        file_name: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to upload part #{part_number} after {attempts} attempt(s): {source}")]
    PartUploadFailed {
        part_number: i32,
        attempts: u32,
        #[source]
        source: StorageError,
    },

    #[error("Failed to complete upload of {file_name}: {source}")]
    CompletionFailed {
        file_name: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to abort upload {upload_id}: {source}")]
    AbortFailed {
        upload_id: String,
        #[source]
        source: StorageError,
    },

    #[error("Invalid upload state transition: {event} while {state}")]
    InvalidTransition { state: String, event: String },
}

impl UploadError {
    pub fn phase(&self) -> UploadPhase {
        match self {
            Self::Validation(_) => UploadPhase::Validation,
            Self::InvalidPartSize(_) => UploadPhase::Plan,
            Self::SessionInit { .. } => UploadPhase::CreateSession,
            Self::PartUploadFailed { .. } => UploadPhase::UploadPart,
            Self::CompletionFailed { .. } => UploadPhase::Complete,
            Self::AbortFailed { .. } => UploadPhase::Abort,
            Self::InvalidTransition { .. } => UploadPhase::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_size_follows_content() {
        let request = UploadRequest::new("a.png", "image/png", vec![0u8; 42]);
        assert_eq!(request.size, 42);
        assert_eq!(request.declared_content_type, "image/png");
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&UploadPhase::CreateSession).unwrap();
        assert_eq!(json, "\"create-session\"");
        assert_eq!(UploadPhase::UploadPart.to_string(), "upload-part");
    }

    #[test]
    fn test_validation_messages() {
        let too_large = ValidationError::TooLarge {
            name: "a.png".into(),
            size: 10,
            max: 5,
        };
        assert_eq!(too_large.to_string(), "File too large");

        let error = UploadError::from(ValidationError::UnsupportedType {
            name: "a.gif".into(),
            content_type: "image/gif".into(),
        });
        assert_eq!(error.to_string(), "Filetype is not supported");
        assert_eq!(error.phase(), UploadPhase::Validation);
    }
}
