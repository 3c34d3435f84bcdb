//! REST API server for document previews.
//!
//! An Axum-based HTTP server that accepts an office document and answers
//! with a PDF rendering of it as a download.
//!
//! # Endpoints
//!
//! - `POST /preview` - Render an uploaded file (multipart field `file`) to PDF
//! - `GET /health` - Health check endpoint
//! - `GET /info` - Server version, renderer and supported extensions
//!
//! # Error responses
//!
//! Failures are JSON bodies (`error_type`, `message`, `status_code`):
//!
//! | Error | Status |
//! |---|---|
//! | `UnsupportedFormat` | 415 |
//! | `PasswordProtected` | 422 |
//! | `ValidationError` | 400 |
//! | `MissingDependency` | 503 |
//! | `ConversionError`, `DeliveryError`, I/O | 500 |
//!
//! # Examples
//!
//! ## Starting the server
//!
//! ```no_run
//! use docpreview::api::serve;
//!
//! #[tokio::main]
//! async fn main() -> docpreview::Result<()> {
//!     serve("127.0.0.1", 8000).await?;
//!     Ok(())
//! }
//! ```
//!
//! # cURL Examples
//!
//! ```bash
//! # Render a Word document; saves report.pdf
//! curl -OJ -F "file=@report.docx" http://localhost:8000/preview
//!
//! # Health check
//! curl http://localhost:8000/health
//!
//! # Server info
//! curl http://localhost:8000/info
//! ```

mod delivery;
mod error;
mod handlers;
mod server;
mod types;

pub use delivery::{content_disposition, deliver, encode_filename};
pub use error::{ApiError, status_for};
pub use handlers::FILE_FIELD;
pub use server::{
    create_router, create_router_with_limits, parse_size_limits_from_env, serve, serve_previewer, serve_with_config,
    serve_with_config_and_limits,
};
pub use types::{ApiSizeLimits, ApiState, ErrorResponse, HealthResponse, InfoResponse};
