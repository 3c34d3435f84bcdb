//! Mapping of `PreviewError` onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::PreviewError;

use super::types::ErrorResponse;

/// Error returned by API handlers.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: PreviewError,
}

impl ApiError {
    pub fn new(status: StatusCode, error: PreviewError) -> Self {
        Self { status, error }
    }

    /// 400 Bad Request.
    pub fn validation(error: PreviewError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// 500 Internal Server Error.
    pub fn internal(error: PreviewError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

/// Status code for each error kind.
pub fn status_for(error: &PreviewError) -> StatusCode {
    match error {
        PreviewError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        PreviewError::PasswordProtected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PreviewError::Validation { .. } => StatusCode::BAD_REQUEST,
        PreviewError::MissingDependency(_) => StatusCode::SERVICE_UNAVAILABLE,
        PreviewError::Io(_)
        | PreviewError::Conversion { .. }
        | PreviewError::Delivery { .. }
        | PreviewError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<PreviewError> for ApiError {
    fn from(error: PreviewError) -> Self {
        Self::new(status_for(&error), error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {}", self.error);
        } else {
            tracing::debug!("Request rejected: {}", self.error);
        }

        let body = ErrorResponse {
            error_type: self.error.kind().to_string(),
            message: self.error.to_string(),
            status_code: self.status.as_u16(),
        };
        (self.status, Json(body)).into_response()
    }
}
