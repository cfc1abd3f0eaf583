//! API request handlers.

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use tracing::debug;

use crate::output::ConversionOutput;
use crate::pipeline::deliver::header_safe_filename;
use crate::request::{UploadForm, UploadedFile};

use super::{
    error::ApiError,
    types::{ApiState, HealthResponse, RuntimeResponse},
};

/// Upload endpoint handler.
///
/// POST /api/upload
///
/// Accepts multipart form data with:
/// - `file`: the document to convert
/// - `category`: `Mock` or `Section`
/// - `questionType`: a subtype valid for `category`
///
/// Other fields are ignored. On success the body is the archive the
/// converter produced, sent as a non-cacheable attachment.
pub async fn upload_handler(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let name = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await?;
                form.file = Some(UploadedFile {
                    name,
                    bytes: bytes.to_vec(),
                });
            }
            "category" => form.category = Some(field.text().await?),
            "questionType" => form.question_type = Some(field.text().await?),
            other => debug!(field = other, "Ignoring multipart field"),
        }
    }

    // Detached: a client disconnect must not cut cleanup short.
    let output = state.converter.submit(form).await?;
    archive_response(output)
}

fn archive_response(output: ConversionOutput) -> Result<Response, ApiError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, output.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", header_safe_filename(&output.filename)),
        )
        .header(header::CONTENT_LENGTH, output.bytes.len())
        .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .header(header::PRAGMA, "no-cache")
        .header(header::EXPIRES, "0")
        .body(Body::from(output.bytes))
        .map_err(|e| ApiError::internal(format!("Response build failed: {e}")))
}

/// Health check endpoint handler.
///
/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Interpreter check endpoint handler.
///
/// GET /api/runtime
///
/// Always 200; `available` says whether a Python interpreter was found.
pub async fn runtime_handler(State(state): State<ApiState>) -> Json<RuntimeResponse> {
    let response = match state.converter.check_runtime().await {
        Ok(rt) => RuntimeResponse {
            available: true,
            executable: Some(rt.executable),
            version: Some(rt.version),
            error: None,
        },
        Err(e) => RuntimeResponse {
            available: false,
            executable: None,
            version: None,
            error: Some(e.to_string()),
        },
    };
    Json(response)
}
