//! Integration tests for the HTTP surface using multipart uploads.

mod helpers;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use helpers::*;
use qbank_convert::{create_router, Converter, ServiceConfig};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "X-QBANK-BOUNDARY";

// ── Test helpers ─────────────────────────────────────────────────────────────

fn router(config: ServiceConfig) -> Router {
    create_router(Arc::new(Converter::new(config)))
}

/// Build a multipart body from text fields and an optional file part.
fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
Content-Type: application/vnd.openxmlformats-officedocument.wordprocessingml.document\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn upload(router: Router, body: Vec<u8>) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .expect("Failed to build request");
    router.oneshot(request).await.expect("Request failed")
}

async fn get(router: Router, uri: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build request");
    router.oneshot(request).await.expect("Request failed")
}

async fn error_message(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), 1_000_000)
        .await
        .expect("Failed to read body");
    let value: Value = serde_json::from_slice(&bytes).expect("Response JSON parse failed");
    value
        .get("error")
        .and_then(Value::as_str)
        .expect("error body should carry an `error` string")
        .to_string()
}

fn form(category: &str, question_type: &str) -> Vec<u8> {
    multipart_body(
        &[("category", category), ("questionType", question_type)],
        Some(("paper.docx", b"PK\x03\x04docx")),
    )
}

// ── Validation (no converter is ever run) ────────────────────────────────────

#[tokio::test]
async fn missing_file_is_400() {
    let fx = Fixture::new();
    let body = multipart_body(&[("category", "Mock"), ("questionType", "question")], None);
    let response = upload(router(fx.config()), body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "No file uploaded");
    assert!(fx.staged_files().is_empty());
}

#[tokio::test]
async fn missing_category_is_400() {
    let fx = Fixture::new();
    let body = multipart_body(&[("questionType", "question")], Some(("paper.docx", b"doc")));
    let response = upload(router(fx.config()), body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Category is required");
}

#[tokio::test]
async fn missing_question_type_is_400() {
    let fx = Fixture::new();
    let body = multipart_body(&[("category", "Section")], Some(("paper.docx", b"doc")));
    let response = upload(router(fx.config()), body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Question type is required");
}

#[tokio::test]
async fn empty_file_is_400() {
    let fx = Fixture::new();
    let body = multipart_body(
        &[("category", "Mock"), ("questionType", "question")],
        Some(("paper.docx", b"")),
    );
    let response = upload(router(fx.config()), body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Uploaded file is empty");
}

#[tokio::test]
async fn wrong_extension_is_400() {
    let fx = Fixture::new();
    let body = multipart_body(
        &[("category", "Mock"), ("questionType", "question")],
        Some(("paper.pdf", b"%PDF-1.7")),
    );
    let response = upload(router(fx.config()), body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(error_message(response).await.starts_with("Unsupported file type"));
    assert!(fx.staged_files().is_empty());
}

#[tokio::test]
async fn unknown_category_is_400() {
    let fx = Fixture::new();
    let response = upload(router(fx.config()), form("Final", "question")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Invalid category");
    assert!(fx.staged_files().is_empty());
}

#[tokio::test]
async fn unknown_subtype_fails_fast_without_staging() {
    let fx = Fixture::new();
    let sentinel = fx.scripts.path().join("ran");
    fx.all_converters(&format!("touch '{}'", sentinel.display()));

    let response = upload(router(fx.config()), form("Section", "unknown-value")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Invalid question type for Section");
    assert!(fx.staged_files().is_empty());
    assert!(!sentinel.exists());
}

#[tokio::test]
async fn cross_category_subtype_is_400() {
    let fx = Fixture::new();
    let response = upload(router(fx.config()), form("Mock", "passage")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Invalid question type for Mock");
}

#[tokio::test]
async fn oversized_body_is_413() {
    let fx = Fixture::new();
    let config = ServiceConfig::builder()
        .scripts_dir(fx.scripts.path())
        .staging_dir(fx.staging.path())
        .max_upload_bytes(1024)
        .build()
        .unwrap();
    let big = vec![b'x'; 8 * 1024];
    let body = multipart_body(
        &[("category", "Mock"), ("questionType", "question")],
        Some(("paper.docx", &big)),
    );
    let response = upload(router(config), body).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(fx.staged_files().is_empty());
}

// ── Conversion ───────────────────────────────────────────────────────────────

#[cfg(unix)]
#[tokio::test]
async fn mock_question_returns_archive_attachment() {
    let fx = Fixture::new();
    fx.converter("mock_questions", MARKER_OK);

    let response = upload(router(fx.config()), form("Mock", "question")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers().clone();
    assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache, no-store, must-revalidate");
    assert_eq!(headers[header::PRAGMA], "no-cache");
    assert_eq!(headers[header::EXPIRES], "0");

    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\""), "got: {disposition}");
    assert!(disposition.ends_with("-paper.zip\""), "got: {disposition}");

    let bytes = to_bytes(response.into_body(), 1_000_000).await.unwrap();
    assert_eq!(&bytes[..], b"PK\x03\x04archive");
    assert_eq!(headers[header::CONTENT_LENGTH], bytes.len().to_string().as_str());

    // Staged input and archive are both gone.
    assert!(fx.staged_files().is_empty(), "left behind: {:?}", fx.staged_files());
}

#[cfg(unix)]
#[tokio::test]
async fn section_mcq_subtype_with_comma_routes_correctly() {
    let fx = Fixture::new();
    fx.converter("mcq_section", MARKER_OK);

    let response = upload(router(fx.config()), form("Section", "section, mcq")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(fx.staged_files().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn extra_fields_are_ignored() {
    let fx = Fixture::new();
    fx.converter("solutions_mock", MARKER_OK);

    let body = multipart_body(
        &[
            ("category", "Mock"),
            ("questionType", "solution"),
            ("uploader", "someone"),
        ],
        Some(("paper.docx", b"doc")),
    );
    let response = upload(router(fx.config()), body).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[cfg(unix)]
#[tokio::test]
async fn converter_exit_1_is_500_with_stderr() {
    let fx = Fixture::new();
    fx.converter("mock_questions", EXIT_1);

    let response = upload(router(fx.config()), form("Mock", "question")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let message = error_message(response).await;
    assert!(message.starts_with("Processing failed:"), "got: {message}");
    assert!(message.contains("Traceback: docx parse error"), "got: {message}");
    assert!(fx.staged_files().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn unparseable_output_is_500() {
    let fx = Fixture::new();
    fx.converter("question_passage", NO_PATH);

    let response = upload(router(fx.config()), form("Section", "passage")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        error_message(response).await,
        "Processing failed to generate output file"
    );
    assert!(fx.staged_files().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn missing_archive_is_500() {
    let fx = Fixture::new();
    fx.converter("mock_questions", MISSING_ARCHIVE);

    let response = upload(router(fx.config()), form("Mock", "question")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        error_message(response).await,
        "Processing failed to create output file"
    );
    assert!(fx.staged_files().is_empty());
}

#[tokio::test]
async fn missing_runtime_is_500_with_install_hint() {
    let fx = Fixture::new();
    fx.converter("mock_questions", MARKER_OK);

    let response = upload(
        router(fx.config_with_runtime("qbank-no-such-python")),
        form("Mock", "question"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let message = error_message(response).await;
    assert!(message.starts_with("Python required:"), "got: {message}");
    assert!(message.contains("python.org"), "got: {message}");
    assert!(fx.staged_files().is_empty());
}

// ── Auxiliary endpoints ──────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_version() {
    let fx = Fixture::new();
    let response = get(router(fx.config()), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), 10_000).await.unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["status"], "healthy");
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
}

#[cfg(unix)]
#[tokio::test]
async fn runtime_endpoint_reports_located_interpreter() {
    let fx = Fixture::new();
    let response = get(router(fx.config()), "/api/runtime").await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), 10_000).await.unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["available"], true);
    assert_eq!(value["executable"], "bash");
    assert!(value.get("error").is_none());
}

#[tokio::test]
async fn runtime_endpoint_reports_absence() {
    let fx = Fixture::new();
    let response = get(router(fx.config_with_runtime("qbank-no-such-python")), "/api/runtime").await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), 10_000).await.unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["available"], false);
    assert!(value["error"].as_str().unwrap().starts_with("Python required:"));
}
