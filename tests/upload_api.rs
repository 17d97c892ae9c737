//! HTTP-level tests for the upload and health endpoints, backed by in-memory storage

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use axum_test::TestServer;
use serde_json::Value;
use tower::ServiceExt;

use media_uploader::config::Config;
use media_uploader::error::StorageError;
use media_uploader::routes;
use media_uploader::state::AppState;
use media_uploader::storage::{MemoryStorage, StorageOperation};

const BOUNDARY: &str = "media-uploader-test-boundary";
const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1A\n";

fn test_app(storage: &MemoryStorage) -> Router {
    let mut config = Config::default();
    config.upload.max_part_size = 16;
    config.upload.max_file_size = 1024;

    let state = AppState::new(config, Arc::new(storage.clone())).unwrap();
    routes::app(state)
}

fn png(len: usize) -> Vec<u8> {
    let mut data = PNG_MAGIC.to_vec();
    data.resize(len, 0xAB);
    data
}

fn multipart_request(files: &[(&str, &str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (file_name, content_type, data) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_upload_returns_paths_in_order() {
    let storage = MemoryStorage::new();
    let first = png(40);
    let second = png(10);

    let (status, body) = send(
        test_app(&storage),
        multipart_request(&[("one.png", "image/png", first.as_slice()), ("two.png", "image/png", second.as_slice())]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let paths = body["paths"].as_array().unwrap();
    assert_eq!(paths.len(), 2);
    assert!(paths[0].as_str().unwrap().ends_with("-one.png"));
    assert!(paths[1].as_str().unwrap().ends_with("-two.png"));

    // 40 bytes in 16-byte parts, then 10 bytes in one part
    assert_eq!(storage.part_attempts(), vec![1, 2, 3, 1]);
    assert_eq!(storage.object_count(), 2);
}

#[tokio::test]
async fn test_unsupported_type_rejects_whole_batch() {
    let storage = MemoryStorage::new();
    let image = png(10);

    let (status, body) = send(
        test_app(&storage),
        multipart_request(&[
            ("ok.png", "image/png", image.as_slice()),
            ("anim.gif", "image/gif", &b"GIF89a"[..]),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Filetype is not supported");
    assert_eq!(body["phase"], "validation");
    assert!(storage.calls().is_empty());
}

#[tokio::test]
async fn test_too_large_rejected() {
    let storage = MemoryStorage::new();
    let image = png(2048);

    let (status, body) = send(
        test_app(&storage),
        multipart_request(&[("big.png", "image/png", image.as_slice())]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "File too large");
    assert!(storage.calls().is_empty());
}

#[tokio::test]
async fn test_part_failure_reports_upload_part_phase() {
    let storage = MemoryStorage::new();
    storage.fail_part(2, StorageError::ConnectionFailed("reset".into()), 3);
    let image = png(40);

    let (status, body) = send(
        test_app(&storage),
        multipart_request(&[("one.png", "image/png", image.as_slice())]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["phase"], "upload-part");
    assert_eq!(storage.part_attempts(), vec![1, 2, 2, 2]);
    assert_eq!(storage.call_count(StorageOperation::AbortUpload), 1);
    assert_eq!(storage.object_count(), 0);
}

#[tokio::test]
async fn test_session_failure_reports_create_session_phase() {
    let storage = MemoryStorage::new();
    storage.fail_next(
        StorageOperation::InitiateUpload,
        StorageError::AccessDenied("bad credentials".into()),
        1,
    );
    let image = png(10);

    let (status, body) = send(
        test_app(&storage),
        multipart_request(&[("one.png", "image/png", image.as_slice())]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["phase"], "create-session");
    assert_eq!(storage.call_count(StorageOperation::AbortUpload), 0);
}

#[tokio::test]
async fn test_empty_form_rejected() {
    let storage = MemoryStorage::new();

    let (status, body) = send(test_app(&storage), multipart_request(&[])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No files provided");
}

#[tokio::test]
async fn test_non_multipart_body_rejected() {
    let storage = MemoryStorage::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let (status, body) = send(test_app(&storage), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["phase"], "validation");
}

#[tokio::test]
async fn test_health() {
    let storage = MemoryStorage::new();
    let server = TestServer::new(test_app(&storage)).unwrap();

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
}
