//! Multipart Upload Pipeline
//!
//! Moves validated files into object storage using the multipart protocol:
//! - Validation of size and declared content type before any network call
//! - Deterministic part planning
//! - Per-part upload with bounded retry
//! - Orchestration of initiate / upload parts / complete, with abort on failure
//!
//! Flow:
//! 1. Validate the whole batch
//! 2. For each file: open a session, upload planned parts in order
//! 3. Complete the upload, or abort it if a part cannot be delivered

pub mod content_type;
pub mod orchestrator;
pub mod part_uploader;
pub mod planner;
pub mod types;
pub mod validator;

pub use orchestrator::{object_key, Orchestrator, UploadEvent, UploadSession, UploadSettings, UploadState};
pub use part_uploader::{upload_part, RetryPolicy};
pub use planner::{plan, PartPlan, PartRange};
pub use types::*;
pub use validator::{validate, validate_file};
