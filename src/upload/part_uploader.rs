//! Single-part upload with bounded retry

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::storage::{CompletedPart, MultipartSession, ObjectStorage};

use super::types::UploadError;

/// How often and how patiently a part upload is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Delay before the first retry, doubled for each further retry.
    /// Zero retries immediately.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Duration::ZERO,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if self.backoff.is_zero() {
            return Duration::ZERO;
        }
        self.backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate(3)
    }
}

/// Upload `body` as part `part_number`, retrying the same part and bytes
/// until it succeeds, the attempts are exhausted, or the backend reports a
/// permanent error.
pub async fn upload_part(
    storage: &dyn ObjectStorage,
    session: &MultipartSession,
    part_number: i32,
    body: Bytes,
    policy: &RetryPolicy,
) -> Result<CompletedPart, UploadError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match storage.upload_part(session, part_number, body.clone()).await {
            Ok(e_tag) => {
                tracing::debug!(
                    upload_id = %session.upload_id,
                    part_number,
                    attempt,
                    size = body.len(),
                    "Uploaded part"
                );
                return Ok(CompletedPart::new(part_number, e_tag));
            }
            Err(error) if attempt < max_attempts && error.is_retryable() => {
                tracing::warn!(
                    upload_id = %session.upload_id,
                    part_number,
                    attempt,
                    max_attempts,
                    error = %error,
                    "Retrying part upload"
                );
                let delay = policy.delay_after(attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(error) => {
                return Err(UploadError::PartUploadFailed {
                    part_number,
                    attempts: attempt,
                    source: error,
                });
            }
        }
    }
}
