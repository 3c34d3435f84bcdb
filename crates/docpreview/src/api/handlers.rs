//! API request handlers.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    response::Response,
};

use crate::{PreviewError, SupportedFormat, core::pipeline::ConversionRequest};

use super::{
    delivery::deliver,
    error::ApiError,
    types::{ApiState, HealthResponse, InfoResponse},
};

/// Multipart field carrying the uploaded document.
pub const FILE_FIELD: &str = "file";

/// Keeps axum's status for body errors, so an oversized field stays a 413.
fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::new(e.status(), PreviewError::validation(e.body_text()))
}

/// Preview endpoint handler.
///
/// POST /preview
///
/// Accepts multipart form data with a single `file` field. The file name is
/// classified before the upload body is read, so an unsupported type is
/// rejected with 415 without buffering the payload. Fields other than `file`
/// are ignored.
///
/// On success the PDF is streamed back as an attachment named after the
/// upload (`report.docx` downloads as `report.pdf`).
///
/// # Size Limits
///
/// The request body limit is enforced at the router layer via `DefaultBodyLimit`
/// and `RequestBodyLimitLayer` (default 100 MB). Oversized requests are rejected
/// with HTTP 413.
pub async fn preview_handler(State(state): State<ApiState>, mut multipart: Multipart) -> Result<Response, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ApiError::validation(PreviewError::validation("Uploaded file has no file name")))?;

        let classification = state.previewer.classify(&filename)?;

        let data = field.bytes().await.map_err(multipart_error)?;

        tracing::debug!("Received '{}' ({} bytes)", filename, data.len());

        let result = state
            .previewer
            .convert(ConversionRequest {
                input: &data,
                filename: &filename,
                classification: &classification,
            })
            .await?;

        return deliver(result).await.map_err(ApiError::from);
    }

    Err(ApiError::validation(PreviewError::validation(format!(
        "No '{}' field provided",
        FILE_FIELD
    ))))
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

/// Server info endpoint handler.
///
/// GET /info
pub async fn info_handler(State(state): State<ApiState>) -> Json<InfoResponse> {
    let registry = state.previewer.registry();
    let formats: BTreeMap<String, Vec<String>> = SupportedFormat::ALL
        .iter()
        .map(|format| {
            let extensions = registry.extensions(*format).into_iter().map(String::from).collect();
            (format.as_str().to_string(), extensions)
        })
        .collect();

    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        renderer: state.previewer.renderer_name().to_string(),
        formats,
    })
}
