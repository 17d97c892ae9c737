//! Storage types

use serde::{Deserialize, Serialize};

/// Handle for one in-progress multipart upload, as issued by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipartSession {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
}

/// A part the backend has acknowledged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    /// 1-based ordinal
    pub part_number: i32,
    pub e_tag: String,
}

impl CompletedPart {
    pub fn new(part_number: i32, e_tag: impl Into<String>) -> Self {
        Self {
            part_number,
            e_tag: e_tag.into(),
        }
    }
}

/// Backend operations, used for call logs and scripted failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageOperation {
    InitiateUpload,
    UploadPart,
    CompleteUpload,
    AbortUpload,
}

/// One recorded backend invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    InitiateUpload {
        bucket: String,
        key: String,
        content_type: String,
    },
    UploadPart {
        upload_id: String,
        part_number: i32,
        len: usize,
    },
    CompleteUpload {
        upload_id: String,
        parts: Vec<CompletedPart>,
    },
    AbortUpload {
        upload_id: String,
    },
}

impl StorageCall {
    pub fn operation(&self) -> StorageOperation {
        match self {
            StorageCall::InitiateUpload { .. } => StorageOperation::InitiateUpload,
            StorageCall::UploadPart { .. } => StorageOperation::UploadPart,
            StorageCall::CompleteUpload { .. } => StorageOperation::CompleteUpload,
            StorageCall::AbortUpload { .. } => StorageOperation::AbortUpload,
        }
    }
}

/// An object assembled by the in-memory backend
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub content_type: String,
    pub data: Vec<u8>,
}
