//! Upload Orchestrator
//!
//! Drives one file through the multipart lifecycle:
//!
//! ```text
//! Initiated ──part──▶ PartsInFlight ──finalized──▶ Completed
//!     │                   │    └──finalize failed──▶ Abandoned
//!     └──part failed──────┴──▶ Aborting ──abort done──▶ Aborted
//! ```
//!
//! Files in a batch and parts within a file are uploaded one at a time, in
//! order. The first failure ends the batch.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{CompletedPart, MultipartSession, ObjectStorage};

use super::content_type;
use super::part_uploader::{self, RetryPolicy};
use super::planner;
use super::types::{UploadError, UploadRequest, UploadedFile, ValidationError, ValidationPolicy};
use super::validator;

// ============================================================================
// State Machine
// ============================================================================

/// Lifecycle state of one multipart upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "state")]
pub enum UploadState {
    /// Session opened, no part acknowledged yet
    Initiated,
    /// At least one part acknowledged
    PartsInFlight { completed: usize },
    /// A part failed for good; the session is being discarded
    Aborting,
    /// Object finalized
    Completed,
    /// Session discarded after a part failure
    Aborted,
    /// Finalize failed; the session is left for backend expiry
    Abandoned,
}

/// Inputs to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadEvent {
    PartCompleted,
    PartFailed,
    Finalized,
    FinalizeFailed,
    AbortFinished,
}

impl UploadState {
    pub fn transition(self, event: UploadEvent) -> Result<Self, UploadError> {
        use UploadEvent::*;
        use UploadState::*;

        match (self, event) {
            (Initiated, PartCompleted) => Ok(PartsInFlight { completed: 1 }),
            (PartsInFlight { completed }, PartCompleted) => Ok(PartsInFlight {
                completed: completed + 1,
            }),
            (Initiated | PartsInFlight { .. }, PartFailed) => Ok(Aborting),
            (PartsInFlight { .. }, Finalized) => Ok(Completed),
            (PartsInFlight { .. }, FinalizeFailed) => Ok(Abandoned),
            (Aborting, AbortFinished) => Ok(Aborted),
            (state, event) => Err(UploadError::InvalidTransition {
                state: format!("{:?}", state),
                event: format!("{:?}", event),
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Completed | UploadState::Aborted | UploadState::Abandoned)
    }
}

/// One in-progress multipart upload, owned by the orchestrator call handling its file
#[derive(Debug)]
pub struct UploadSession {
    handle: MultipartSession,
    parts: Vec<CompletedPart>,
    state: UploadState,
}

impl UploadSession {
    pub fn new(handle: MultipartSession) -> Self {
        Self {
            handle,
            parts: Vec::new(),
            state: UploadState::Initiated,
        }
    }

    pub fn handle(&self) -> &MultipartSession {
        &self.handle
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    /// Acknowledged parts, in part-number order
    pub fn completed_parts(&self) -> &[CompletedPart] {
        &self.parts
    }

    /// Append the next acknowledged part; part numbers must follow on without gaps
    pub fn record_part(&mut self, part: CompletedPart) -> Result<(), UploadError> {
        let expected = self.parts.len() as i32 + 1;
        if part.part_number != expected {
            return Err(UploadError::InvalidTransition {
                state: format!("{:?}", self.state),
                event: format!("part #{} recorded, expected #{}", part.part_number, expected),
            });
        }
        self.advance(UploadEvent::PartCompleted)?;
        self.parts.push(part);
        Ok(())
    }

    pub fn advance(&mut self, event: UploadEvent) -> Result<(), UploadError> {
        self.state = self.state.transition(event)?;
        Ok(())
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Settings the orchestrator receives from configuration
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub bucket: String,
    pub key_prefix: String,
    pub max_part_size: u64,
    pub retry: RetryPolicy,
    pub policy: ValidationPolicy,
}

/// Runs uploads against a shared storage backend
#[derive(Clone)]
pub struct Orchestrator {
    storage: Arc<dyn ObjectStorage>,
    settings: Arc<UploadSettings>,
}

impl Orchestrator {
    pub fn new(storage: Arc<dyn ObjectStorage>, settings: UploadSettings) -> Result<Self, UploadError> {
        if settings.max_part_size == 0 {
            return Err(UploadError::InvalidPartSize(settings.max_part_size));
        }
        Ok(Self {
            storage,
            settings: Arc::new(settings),
        })
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// Validate every file, then upload them in order
    ///
    /// Nothing reaches the backend unless the whole batch passes validation.
    /// Objects stored before a later file fails are not rolled back.
    pub async fn upload_batch(&self, requests: &[UploadRequest]) -> Result<Vec<UploadedFile>, UploadError> {
        if requests.is_empty() {
            return Err(ValidationError::NoFiles.into());
        }
        validator::validate(requests, &self.settings.policy)?;

        let uploaded_at = Utc::now();
        let mut uploaded = Vec::with_capacity(requests.len());

        for request in requests {
            match self.upload_file_at(request, uploaded_at).await {
                Ok(file) => uploaded.push(file),
                Err(error) => {
                    if !uploaded.is_empty() {
                        tracing::warn!(
                            committed = uploaded.len(),
                            failed_file = %request.name,
                            "Batch failed after objects were already stored"
                        );
                    }
                    return Err(error);
                }
            }
        }

        Ok(uploaded)
    }

    /// Upload one file
    pub async fn upload_file(&self, request: &UploadRequest) -> Result<UploadedFile, UploadError> {
        self.upload_file_at(request, Utc::now()).await
    }

    async fn upload_file_at(
        &self,
        request: &UploadRequest,
        uploaded_at: DateTime<Utc>,
    ) -> Result<UploadedFile, UploadError> {
        validator::validate_file(request, &self.settings.policy)?;

        let plan = planner::plan(request.content.len() as u64, self.settings.max_part_size)?;
        let key = object_key(&self.settings.key_prefix, uploaded_at, &request.name);
        let content_type = content_type::sniff(&request.content, &request.name);

        let handle = self
            .storage
            .initiate_upload(&self.settings.bucket, &key, &content_type)
            .await
            .map_err(|source| UploadError::SessionInit {
                file_name: request.name.clone(),
                source,
            })?;

        tracing::info!(
            file_name = %request.name,
            key = %key,
            upload_id = %handle.upload_id,
            content_type = %content_type,
            size = request.size,
            parts = plan.len(),
            "Created multipart upload"
        );

        let mut session = UploadSession::new(handle);

        for (part_number, range) in plan.numbered() {
            let body = request.content.slice(range.range());
            let result = part_uploader::upload_part(
                self.storage.as_ref(),
                session.handle(),
                part_number,
                body,
                &self.settings.retry,
            )
            .await;

            match result {
                Ok(part) => session.record_part(part)?,
                Err(error) => {
                    tracing::error!(
                        file_name = %request.name,
                        upload_id = %session.handle().upload_id,
                        "{}",
                        error
                    );
                    session.advance(UploadEvent::PartFailed)?;
                    self.abort(&mut session).await?;
                    return Err(error);
                }
            }
        }

        match self
            .storage
            .complete_upload(session.handle(), session.completed_parts())
            .await
        {
            Ok(location) => {
                session.advance(UploadEvent::Finalized)?;
                tracing::info!(
                    file_name = %request.name,
                    location = %location,
                    parts = session.completed_parts().len(),
                    "Successfully uploaded file"
                );
                Ok(UploadedFile {
                    name: request.name.clone(),
                    key,
                    location,
                })
            }
            Err(source) => {
                session.advance(UploadEvent::FinalizeFailed)?;
                tracing::error!(
                    file_name = %request.name,
                    upload_id = %session.handle().upload_id,
                    error = %source,
                    "Failed to complete multipart upload; leaving session to expire"
                );
                Err(UploadError::CompletionFailed {
                    file_name: request.name.clone(),
                    source,
                })
            }
        }
    }

    /// Discard the session. A failed abort is logged and otherwise ignored:
    /// the part failure that triggered it is what the caller sees.
    async fn abort(&self, session: &mut UploadSession) -> Result<(), UploadError> {
        tracing::warn!(
            upload_id = %session.handle().upload_id,
            key = %session.handle().key,
            "Aborting multipart upload"
        );

        if let Err(source) = self.storage.abort_upload(session.handle()).await {
            let error = UploadError::AbortFailed {
                upload_id: session.handle().upload_id.clone(),
                source,
            };
            tracing::error!(phase = %error.phase(), "{}", error);
        }

        session.advance(UploadEvent::AbortFinished)
    }
}

/// Object key for `file_name`: `{prefix}/{rfc3339 timestamp}-{base name}`
pub fn object_key(prefix: &str, uploaded_at: DateTime<Utc>, file_name: &str) -> String {
    let base = file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("file");
    let timestamp = uploaded_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    let prefix = prefix.trim_matches('/');

    if prefix.is_empty() {
        format!("{}-{}", timestamp, base)
    } else {
        format!("{}/{}-{}", prefix, timestamp, base)
    }
}
