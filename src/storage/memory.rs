//! In-memory object storage
//!
//! A process-local multipart backend for development (`S3_PROVIDER=memory`)
//! and tests. It enforces the same completion rules as S3 (parts numbered
//! from 1 without gaps, ETags matching what was issued) and records every
//! call so callers can assert on the exact traffic. Failures can be scripted
//! per operation or per part number.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::StorageError;

use super::backend::ObjectStorage;
use super::types::{CompletedPart, MultipartSession, StorageCall, StorageOperation, StoredObject};

#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    uploads: HashMap<String, PendingUpload>,
    objects: HashMap<(String, String), StoredObject>,
    calls: Vec<StorageCall>,
    failures: HashMap<StorageOperation, VecDeque<Option<StorageError>>>,
    part_failures: HashMap<i32, VecDeque<StorageError>>,
    scripted_etags: VecDeque<String>,
}

struct PendingUpload {
    key: String,
    content_type: String,
    parts: BTreeMap<i32, (String, Bytes)>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` calls of `operation` with `error`
    pub fn fail_next(&self, operation: StorageOperation, error: StorageError, times: usize) {
        let mut state = self.inner.lock();
        let queue = state.failures.entry(operation).or_default();
        queue.extend(std::iter::repeat(Some(error)).take(times));
    }

    /// Let the next `times` calls of `operation` through before any queued failure
    pub fn pass_next(&self, operation: StorageOperation, times: usize) {
        let mut state = self.inner.lock();
        let queue = state.failures.entry(operation).or_default();
        queue.extend(std::iter::repeat(None).take(times));
    }

    /// Fail the next `times` uploads of part `part_number` with `error`
    pub fn fail_part(&self, part_number: i32, error: StorageError, times: usize) {
        let mut state = self.inner.lock();
        let queue = state.part_failures.entry(part_number).or_default();
        queue.extend(std::iter::repeat(error).take(times));
    }

    /// Hand out these ETags, in order, for the next successful part uploads
    pub fn script_etags<I, S>(&self, etags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.inner.lock();
        state.scripted_etags.extend(etags.into_iter().map(Into::into));
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<StorageCall> {
        self.inner.lock().calls.clone()
    }

    pub fn call_count(&self, operation: StorageOperation) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    /// Part numbers of every upload-part call, retries included
    pub fn part_attempts(&self) -> Vec<i32> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                StorageCall::UploadPart { part_number, .. } => Some(*part_number),
                _ => None,
            })
            .collect()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.inner
            .lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        self.inner.lock().objects.len()
    }

    /// Uploads initiated but neither completed nor aborted
    pub fn pending_uploads(&self) -> usize {
        self.inner.lock().uploads.len()
    }
}

impl MemoryState {
    fn scripted_failure(&mut self, operation: StorageOperation) -> Option<StorageError> {
        self.failures
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
            .flatten()
    }
}

fn etag_for(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    format!("\"{}\"", &hex::encode(digest)[..32])
}

fn location_for(bucket: &str, key: &str) -> String {
    format!("memory://{}/{}", bucket, key)
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn initiate_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<MultipartSession, StorageError> {
        let mut state = self.inner.lock();
        state.calls.push(StorageCall::InitiateUpload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
        });

        if let Some(error) = state.scripted_failure(StorageOperation::InitiateUpload) {
            return Err(error);
        }

        let upload_id = Uuid::new_v4().to_string();
        state.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                key: key.to_string(),
                content_type: content_type.to_string(),
                parts: BTreeMap::new(),
            },
        );

        Ok(MultipartSession {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id,
        })
    }

    async fn upload_part(
        &self,
        session: &MultipartSession,
        part_number: i32,
        body: Bytes,
    ) -> Result<String, StorageError> {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        state.calls.push(StorageCall::UploadPart {
            upload_id: session.upload_id.clone(),
            part_number,
            len: body.len(),
        });

        if let Some(error) = state.scripted_failure(StorageOperation::UploadPart) {
            return Err(error);
        }
        if let Some(error) = state
            .part_failures
            .get_mut(&part_number)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }

        let upload = state
            .uploads
            .get_mut(&session.upload_id)
            .ok_or_else(|| StorageError::UploadNotFound(session.upload_id.clone()))?;

        let e_tag = state
            .scripted_etags
            .pop_front()
            .unwrap_or_else(|| etag_for(&body));
        upload.parts.insert(part_number, (e_tag.clone(), body));

        Ok(e_tag)
    }

    async fn complete_upload(
        &self,
        session: &MultipartSession,
        parts: &[CompletedPart],
    ) -> Result<String, StorageError> {
        let mut state = self.inner.lock();
        state.calls.push(StorageCall::CompleteUpload {
            upload_id: session.upload_id.clone(),
            parts: parts.to_vec(),
        });

        if let Some(error) = state.scripted_failure(StorageOperation::CompleteUpload) {
            return Err(error);
        }

        let upload = state
            .uploads
            .get(&session.upload_id)
            .ok_or_else(|| StorageError::UploadNotFound(session.upload_id.clone()))?;

        if parts.is_empty() {
            return Err(StorageError::InvalidPart("no parts supplied".to_string()));
        }

        let mut data = Vec::new();
        for (index, part) in parts.iter().enumerate() {
            let expected_number = index as i32 + 1;
            if part.part_number != expected_number {
                return Err(StorageError::InvalidPart(format!(
                    "expected part #{}, got #{}",
                    expected_number, part.part_number
                )));
            }
            match upload.parts.get(&part.part_number) {
                Some((e_tag, body)) if *e_tag == part.e_tag => data.extend_from_slice(body),
                Some(_) => {
                    return Err(StorageError::InvalidPart(format!(
                        "ETag mismatch for part #{}",
                        part.part_number
                    )))
                }
                None => {
                    return Err(StorageError::InvalidPart(format!(
                        "part #{} was never uploaded",
                        part.part_number
                    )))
                }
            }
        }

        let object = StoredObject {
            key: upload.key.clone(),
            content_type: upload.content_type.clone(),
            data,
        };
        state.uploads.remove(&session.upload_id);
        state
            .objects
            .insert((session.bucket.clone(), session.key.clone()), object);

        Ok(location_for(&session.bucket, &session.key))
    }

    async fn abort_upload(&self, session: &MultipartSession) -> Result<(), StorageError> {
        let mut state = self.inner.lock();
        state.calls.push(StorageCall::AbortUpload {
            upload_id: session.upload_id.clone(),
        });

        if let Some(error) = state.scripted_failure(StorageOperation::AbortUpload) {
            return Err(error);
        }

        state
            .uploads
            .remove(&session.upload_id)
            .map(|_| ())
            .ok_or_else(|| StorageError::UploadNotFound(session.upload_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_complete_assembles_parts() {
        let storage = MemoryStorage::new();
        let session = storage
            .initiate_upload("media", "a.bin", "application/octet-stream")
            .await
            .unwrap();

        let first = storage
            .upload_part(&session, 1, Bytes::from_static(b"Hello, "))
            .await
            .unwrap();
        let second = storage
            .upload_part(&session, 2, Bytes::from_static(b"World!"))
            .await
            .unwrap();

        let location = storage
            .complete_upload(
                &session,
                &[CompletedPart::new(1, first), CompletedPart::new(2, second)],
            )
            .await
            .unwrap();

        assert_eq!(location, "memory://media/a.bin");
        let object = storage.object("media", "a.bin").unwrap();
        assert_eq!(object.data, b"Hello, World!");
        assert_eq!(storage.pending_uploads(), 0);
    }

    #[tokio::test]
    async fn test_complete_rejects_gaps() {
        let storage = MemoryStorage::new();
        let session = storage.initiate_upload("media", "a.bin", "x").await.unwrap();
        storage
            .upload_part(&session, 1, Bytes::from_static(b"a"))
            .await
            .unwrap();
        let third = storage
            .upload_part(&session, 3, Bytes::from_static(b"c"))
            .await
            .unwrap();

        let result = storage
            .complete_upload(&session, &[CompletedPart::new(3, third)])
            .await;

        assert!(matches!(result, Err(StorageError::InvalidPart(_))));
        assert_eq!(storage.object_count(), 0);
    }

    #[tokio::test]
    async fn test_scripted_part_failures() {
        let storage = MemoryStorage::new();
        storage.fail_part(2, StorageError::ConnectionFailed("reset".into()), 1);
        storage.script_etags(["a", "b"]);

        let session = storage.initiate_upload("media", "k", "x").await.unwrap();
        let body = Bytes::from_static(b"data");

        assert_eq!(storage.upload_part(&session, 1, body.clone()).await.unwrap(), "a");
        assert!(storage.upload_part(&session, 2, body.clone()).await.is_err());
        assert_eq!(storage.upload_part(&session, 2, body).await.unwrap(), "b");
        assert_eq!(storage.part_attempts(), vec![1, 2, 2]);
    }

    #[tokio::test]
    async fn test_abort_discards_upload() {
        let storage = MemoryStorage::new();
        let session = storage.initiate_upload("media", "k", "x").await.unwrap();

        storage.abort_upload(&session).await.unwrap();

        assert_eq!(storage.pending_uploads(), 0);
        assert!(storage.abort_upload(&session).await.is_err());
        assert_eq!(storage.call_count(StorageOperation::AbortUpload), 2);
    }
}
