//! S3-compatible storage client
//!
//! Wraps the AWS SDK multipart upload API.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::{ProvideErrorMetadata, SdkError},
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart},
    Client,
};
use bytes::Bytes;

use crate::config::{StorageConfig, StorageProvider};
use crate::error::StorageError;

use super::backend::ObjectStorage;
use super::types::{CompletedPart, MultipartSession};

/// S3-compatible storage client
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    endpoint: Option<String>,
    region: String,
}

impl S3Client {
    /// Create a new S3 client from configuration
    pub async fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        if config.access_key.is_empty() || config.secret_key.is_empty() {
            return Err(StorageError::InvalidCredentials(
                "access key and secret key must be set".to_string(),
            ));
        }

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "media-uploader",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if config.provider != StorageProvider::S3 {
            // Required for MinIO and other S3-compatible services
            builder = builder.force_path_style(true);
        }

        let client = Client::from_conf(builder.build());

        match client.head_bucket().bucket(&config.bucket).send().await {
            Ok(_) => {
                tracing::info!("Connected to S3 bucket: {}", config.bucket);
            }
            Err(e) => {
                let error = classify("head bucket", e);
                if matches!(error, StorageError::AccessDenied(_)) {
                    return Err(StorageError::InvalidCredentials(error.to_string()));
                }
                tracing::warn!(
                    "Could not verify bucket {}: {}. Will attempt operations anyway.",
                    config.bucket,
                    error
                );
            }
        }

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            region: config.region.clone(),
        })
    }

    /// Location reported when the completion response carries none
    fn fallback_location(&self, bucket: &str, key: &str) -> String {
        let encoded_key = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        match &self.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                bucket,
                encoded_key
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                bucket, self.region, encoded_key
            ),
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Client {
    async fn initiate_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<MultipartSession, StorageError> {
        let response = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| classify("create multipart upload", e))?;

        let upload_id = response.upload_id().ok_or_else(|| {
            StorageError::MalformedResponse(format!(
                "CreateMultipartUpload returned no upload id for {}",
                key
            ))
        })?;

        Ok(MultipartSession {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: upload_id.to_string(),
        })
    }

    async fn upload_part(
        &self,
        session: &MultipartSession,
        part_number: i32,
        body: Bytes,
    ) -> Result<String, StorageError> {
        let content_length = body.len() as i64;

        let response = self
            .client
            .upload_part()
            .bucket(&session.bucket)
            .key(&session.key)
            .upload_id(&session.upload_id)
            .part_number(part_number)
            .content_length(content_length)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| classify("upload part", e))?;

        response.e_tag().map(str::to_string).ok_or_else(|| {
            StorageError::MalformedResponse(format!("UploadPart #{} returned no ETag", part_number))
        })
    }

    async fn complete_upload(
        &self,
        session: &MultipartSession,
        parts: &[CompletedPart],
    ) -> Result<String, StorageError> {
        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(
                parts
                    .iter()
                    .map(|part| {
                        S3CompletedPart::builder()
                            .part_number(part.part_number)
                            .e_tag(&part.e_tag)
                            .build()
                    })
                    .collect(),
            ))
            .build();

        let response = self
            .client
            .complete_multipart_upload()
            .bucket(&session.bucket)
            .key(&session.key)
            .upload_id(&session.upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| classify("complete multipart upload", e))?;

        Ok(response
            .location()
            .map(str::to_string)
            .unwrap_or_else(|| self.fallback_location(&session.bucket, &session.key)))
    }

    async fn abort_upload(&self, session: &MultipartSession) -> Result<(), StorageError> {
        self.client
            .abort_multipart_upload()
            .bucket(&session.bucket)
            .key(&session.key)
            .upload_id(&session.upload_id)
            .send()
            .await
            .map_err(|e| classify("abort multipart upload", e))?;

        Ok(())
    }
}

/// Map an SDK failure onto the retryable/permanent storage taxonomy
fn classify<E, R>(operation: &str, err: SdkError<E, R>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let message = format!("Failed to {}: {}", operation, err);

    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            StorageError::ConnectionFailed(message)
        }
        SdkError::ConstructionFailure(_) => StorageError::MalformedResponse(message),
        _ => {
            let code = err.as_service_error().and_then(|e| e.code());
            classify_code(code, message)
        }
    }
}

fn classify_code(code: Option<&str>, message: String) -> StorageError {
    match code {
        Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "ExpiredToken") => {
            StorageError::AccessDenied(message)
        }
        Some("NoSuchBucket") => StorageError::BucketNotFound(message),
        Some("NoSuchUpload") => StorageError::UploadNotFound(message),
        Some("InvalidPart" | "InvalidPartOrder" | "EntityTooSmall" | "EntityTooLarge") => {
            StorageError::InvalidPart(message)
        }
        Some("SlowDown" | "Throttling" | "RequestLimitExceeded") => StorageError::Throttled(message),
        _ => StorageError::SdkError(message),
    }
}
