//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::storage::ObjectStorage;
use crate::upload::{Orchestrator, UploadError, UploadSettings};

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to initialize upload pipeline: {0}")]
    Upload(#[from] UploadError),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    orchestrator: Orchestrator,
}

impl AppState {
    /// Create a new application state around an already connected backend
    pub fn new(config: Config, storage: Arc<dyn ObjectStorage>) -> Result<Self, StateError> {
        let settings = UploadSettings {
            bucket: config.storage.bucket.clone(),
            key_prefix: config.upload.key_prefix.clone(),
            max_part_size: config.upload.max_part_size,
            retry: config.upload.retry_policy(),
            policy: config.upload.validation_policy(),
        };
        let orchestrator = Orchestrator::new(storage, settings)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                orchestrator,
            }),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the upload orchestrator
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.inner.orchestrator
    }
}
