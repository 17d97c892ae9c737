//! Object storage backend trait
//!
//! The upload pipeline only needs the four multipart operations below. Any
//! object store that offers them can sit behind this trait.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageError;

use super::types::{CompletedPart, MultipartSession};

/// Multipart-capable object storage
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Open a multipart upload for `key` in `bucket`
    async fn initiate_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<MultipartSession, StorageError>;

    /// Upload one part, returning the backend's ETag for it
    async fn upload_part(
        &self,
        session: &MultipartSession,
        part_number: i32,
        body: Bytes,
    ) -> Result<String, StorageError>;

    /// Stitch the acknowledged parts into the final object, returning its location
    async fn complete_upload(
        &self,
        session: &MultipartSession,
        parts: &[CompletedPart],
    ) -> Result<String, StorageError>;

    /// Discard an in-progress upload and any parts already received
    async fn abort_upload(&self, session: &MultipartSession) -> Result<(), StorageError>;
}
