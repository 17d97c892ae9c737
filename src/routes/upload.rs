//! Upload Routes
//!
//! Endpoints:
//! - POST /upload - Upload one or more files (multipart form, field `files`)
//! - POST /api/v1/upload - Same, versioned path
//!
//! Responds with the stored object locations in submission order, or a single
//! error naming the phase that failed. A batch is all-or-nothing from the
//! caller's point of view.

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::upload::UploadRequest;

/// Form field carrying the files
pub const FILES_FIELD: &str = "files";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub paths: Vec<String>,
}

/// Create the upload router
pub fn router(body_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_files))
        .route("/api/v1/upload", post(upload_files))
        .layer(DefaultBodyLimit::max(body_limit))
}

/// POST /upload
async fn upload_files(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let requests = read_files(&mut multipart).await?;

    tracing::info!(
        files = requests.len(),
        total_bytes = requests.iter().map(|r| r.size).sum::<u64>(),
        "Received upload request"
    );

    let uploaded = state.orchestrator().upload_batch(&requests).await?;

    Ok(Json(UploadResponse {
        paths: uploaded.into_iter().map(|file| file.location).collect(),
    }))
}

/// Collect every file part submitted under [`FILES_FIELD`]
async fn read_files(multipart: &mut Multipart) -> Result<Vec<UploadRequest>> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            tracing::debug!("Skipping non-file value in files field");
            continue;
        };
        let declared_content_type = field.content_type().unwrap_or_default().to_string();
        let content = field.bytes().await?;

        files.push(UploadRequest::new(file_name, declared_content_type, content));
    }

    Ok(files)
}
