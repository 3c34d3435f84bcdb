//! API request and response types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Previewer;

/// Upload size limit configuration.
///
/// # Default Values
///
/// - `max_upload_bytes`: 100 MB (104,857,600 bytes)
///
/// # Configuration via Environment Variables
///
/// ```bash
/// export DOCPREVIEW_MAX_UPLOAD_BYTES=104857600  # 100 MB
/// # or, in megabytes:
/// export DOCPREVIEW_MAX_UPLOAD_SIZE_MB=100
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiSizeLimits {
    /// Maximum size of the whole multipart request body in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ApiSizeLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

impl ApiSizeLimits {
    pub fn new(max_upload_bytes: usize) -> Self {
        Self { max_upload_bytes }
    }

    /// # Examples
    ///
    /// ```
    /// use docpreview::api::ApiSizeLimits;
    ///
    /// let limits = ApiSizeLimits::from_mb(50);
    /// assert_eq!(limits.max_upload_bytes, 50 * 1024 * 1024);
    /// ```
    pub fn from_mb(max_upload_mb: usize) -> Self {
        Self {
            max_upload_bytes: max_upload_mb * 1024 * 1024,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server information response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub version: String,
    /// Name of the active renderer
    pub renderer: String,
    /// Supported extensions keyed by family name
    pub formats: BTreeMap<String, Vec<String>>,
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error kind, e.g. `UnsupportedFormat`
    pub error_type: String,
    pub message: String,
    pub status_code: u16,
}

/// API server state.
#[derive(Debug, Clone)]
pub struct ApiState {
    pub previewer: Previewer,
}
