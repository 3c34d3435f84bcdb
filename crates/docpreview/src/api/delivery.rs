//! Download responses for rendered PDFs.
//!
//! The staging file is streamed, not buffered. The response body owns the
//! artifact: when the body finishes, fails, or is dropped because the client
//! went away, the staging file is deleted.

use axum::{
    body::Body,
    http::{StatusCode, header},
    response::Response,
};
use futures::StreamExt;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::core::staging::TempArtifact;
use crate::{ConversionResult, PreviewError, Result};

/// Characters left as-is in `filename*`: alphanumerics and `- _ . *`.
///
/// Space becomes `%20`, never `+`.
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'*');

/// Percent-encode a display name as UTF-8.
pub fn encode_filename(name: &str) -> String {
    utf8_percent_encode(name, FILENAME_ENCODE_SET).to_string()
}

/// `Content-Disposition` value asking the client to save `display_name`.
///
/// # Example
///
/// ```rust
/// use docpreview::api::content_disposition;
///
/// assert_eq!(
///     content_disposition("Q3 report.pdf"),
///     "attachment; filename*=UTF-8''Q3%20report.pdf"
/// );
/// ```
pub fn content_disposition(display_name: &str) -> String {
    format!("attachment; filename*=UTF-8''{}", encode_filename(display_name))
}

/// Owns the artifact for the lifetime of the response body.
struct DeliveryGuard {
    artifact: TempArtifact,
    display_name: String,
    expected: u64,
    sent: u64,
    failed: bool,
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        if !self.failed && self.sent == self.expected {
            tracing::info!("[{}] PDF download completed ({} bytes)", self.display_name, self.sent);
        } else {
            tracing::warn!(
                "[{}] PDF download incomplete: sent {} of {} bytes",
                self.display_name,
                self.sent,
                self.expected
            );
        }
        if let Err(e) = self.artifact.release() {
            tracing::warn!("Failed to delete staging artifact for [{}]: {}", self.display_name, e);
        }
    }
}

/// Stream `reader` as a response body that owns `guard`.
///
/// A read error marks the download failed and ends the body with a
/// `PreviewError::Delivery`; the guard releases the artifact once the body is
/// dropped either way.
fn download_body<R>(reader: R, mut guard: DeliveryGuard) -> Body
where
    R: AsyncRead + Send + 'static,
{
    let stream = ReaderStream::new(reader).map(move |chunk| match chunk {
        Ok(bytes) => {
            guard.sent += bytes.len() as u64;
            Ok(bytes)
        }
        Err(e) => {
            guard.failed = true;
            Err(PreviewError::delivery_with_source(
                format!("Streaming {} failed", guard.display_name),
                e,
            ))
        }
    });
    Body::from_stream(stream)
}

/// Build the download response for a conversion result.
///
/// Sets `Content-Type`, `Content-Length` and `Content-Disposition` and streams
/// the staging file as the body.
///
/// # Errors
///
/// Returns `PreviewError::Delivery` if the staging file cannot be opened or
/// the response cannot be assembled. Read errors after the headers are sent
/// surface as `Delivery` errors on the body stream, which aborts the response.
/// The artifact is released on every path.
pub async fn deliver(result: ConversionResult) -> Result<Response> {
    let display_name = result.display_name.clone();
    let expected = result.byte_len;
    let artifact = result.into_artifact();

    tracing::debug!("Downloading [{}] from {}", display_name, artifact.path().display());

    let file = artifact
        .open()
        .await
        .map_err(|e| PreviewError::delivery_with_source(format!("Cannot open staged PDF for {}", display_name), e))?;

    let disposition = content_disposition(&display_name);

    let guard = DeliveryGuard {
        artifact,
        display_name,
        expected,
        sent: 0,
        failed: false,
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, expected)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(download_body(file, guard))
        .map_err(|e| PreviewError::delivery_with_source("Failed to build download response", e))
}
