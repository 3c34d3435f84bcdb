//! Error types for docpreview.
//!
//! Every fallible operation in the crate returns [`PreviewError`]. Errors follow
//! the same split throughout:
//!
//! - `PreviewError::Io` (from `std::io::Error`) bubbles up unchanged. These are
//!   real system problems (permissions, full disks) and are never re-wrapped.
//! - Domain errors carry context: `UnsupportedFormat` is raised before any file
//!   I/O, `PasswordProtected` when the source needs credentials, `Conversion`
//!   for renderer faults and `Delivery` for failures while streaming the PDF.
//!
//! None of these are retried. The HTTP layer decides on the status code.
//!
//! # Example
//!
//! ```rust
//! use docpreview::{PreviewError, Result};
//!
//! fn ensure_pdf(bytes: &[u8]) -> Result<()> {
//!     if !bytes.starts_with(b"%PDF-") {
//!         return Err(PreviewError::conversion("renderer output is not a PDF"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(ensure_pdf(b"%PDF-1.7").is_ok());
//! assert!(ensure_pdf(b"garbage").is_err());
//! ```
use thiserror::Error;

/// Result type alias using `PreviewError`.
pub type Result<T> = std::result::Result<T, PreviewError>;

/// Main error type for all docpreview operations.
///
/// # Variants
///
/// - `Io` - File system and I/O errors (always bubble up)
/// - `UnsupportedFormat` - Extension is not in any format family
/// - `PasswordProtected` - Source document requires a password
/// - `Conversion` - Renderer failed to produce a PDF
/// - `Delivery` - Writing the PDF to the caller failed
/// - `Validation` - Invalid request or configuration
/// - `MissingDependency` - Rendering backend is not installed
/// - `Other` - Catch-all for uncommon errors
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Password protected file: {0}")]
    PasswordProtected(String),

    #[error("Conversion error: {message}")]
    Conversion {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Download failed: {message}")]
    Delivery {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for PreviewError {
    fn from(err: serde_json::Error) -> Self {
        PreviewError::Validation {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<csv::Error> for PreviewError {
    fn from(err: csv::Error) -> Self {
        PreviewError::Conversion {
            message: format!("Invalid CSV input: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl PreviewError {
    error_constructor!(conversion, Conversion);
    error_constructor!(delivery, Delivery);
    error_constructor!(validation, Validation);

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PreviewError::Io(_) => "Io",
            PreviewError::UnsupportedFormat(_) => "UnsupportedFormat",
            PreviewError::PasswordProtected(_) => "PasswordProtected",
            PreviewError::Conversion { .. } => "ConversionError",
            PreviewError::Delivery { .. } => "DeliveryError",
            PreviewError::Validation { .. } => "ValidationError",
            PreviewError::MissingDependency(_) => "MissingDependency",
            PreviewError::Other(_) => "Other",
        }
    }
}
