//! Storage module for S3-compatible backends
//!
//! Supports MinIO, Cloudflare R2, Backblaze B2 and AWS S3 through the AWS
//! SDK, plus an in-process backend for development and tests.

mod backend;
mod memory;
mod s3_client;
mod types;

use std::sync::Arc;

pub use backend::ObjectStorage;
pub use memory::MemoryStorage;
pub use s3_client::S3Client;
pub use types::*;

use crate::config::{StorageConfig, StorageProvider};
use crate::error::StorageError;

/// Build the backend selected by configuration
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn ObjectStorage>, StorageError> {
    match config.provider {
        StorageProvider::Memory => {
            tracing::warn!("Using in-memory storage; uploaded objects are lost on restart");
            Ok(Arc::new(MemoryStorage::new()))
        }
        _ => Ok(Arc::new(S3Client::new(config).await?)),
    }
}
