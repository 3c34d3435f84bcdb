//! Rendering seam.
//!
//! A [`Renderer`] turns source bytes of a declared family into PDF bytes. The
//! crate ships a LibreOffice-backed implementation; anything else (a remote
//! conversion service, a test double) plugs in by implementing the trait.
//!
//! Family-specific behaviour travels as a [`RenderOptions`] value built by
//! [`options_for`]. Adding a fourth family is a new enum variant, and every
//! `match` on it fails to compile until it is handled.

pub mod compound;
pub mod libreoffice;
pub mod options;
pub mod protection;
pub mod sheet;

use crate::{PreviewError, Result};
use crate::core::formats::SupportedFormat;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use libreoffice::{LibreOfficeRenderer, check_libreoffice_available};
pub use options::options_for;

/// What the renderer is told about its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub format: SupportedFormat,
    /// Lowercase extension without the dot
    pub extension: String,
}

/// How a text-family source is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextLoadFormat {
    /// Let the renderer detect the rich format
    Auto,
    /// Treat the bytes as raw UTF-8 text, line breaks preserved
    PlainText,
}

/// PDF output profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfCompliance {
    Default,
    /// PDF/A-1b archival profile
    PdfA1b,
}

/// How a worksheet source is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetLoadFormat {
    Auto,
    /// Comma-delimited text
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridlineStyle {
    Default,
    /// Thinnest printable line
    Hair,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentOptions {
    pub load_format: TextLoadFormat,
    pub compliance: PdfCompliance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorksheetOptions {
    pub load_format: SheetLoadFormat,
    pub print_gridlines: bool,
    pub gridline_style: GridlineStyle,
    pub auto_fit_columns: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationOptions {}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            load_format: TextLoadFormat::Auto,
            compliance: PdfCompliance::Default,
        }
    }
}

impl Default for WorksheetOptions {
    fn default() -> Self {
        Self {
            load_format: SheetLoadFormat::Auto,
            print_gridlines: false,
            gridline_style: GridlineStyle::Default,
            auto_fit_columns: false,
        }
    }
}

/// Per-family render settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum RenderOptions {
    Document(DocumentOptions),
    Worksheet(WorksheetOptions),
    Presentation(PresentationOptions),
}

impl RenderOptions {
    pub fn format(&self) -> SupportedFormat {
        match self {
            RenderOptions::Document(_) => SupportedFormat::Document,
            RenderOptions::Worksheet(_) => SupportedFormat::Worksheet,
            RenderOptions::Presentation(_) => SupportedFormat::Presentation,
        }
    }

    /// Output profile requested by these options.
    pub fn compliance(&self) -> PdfCompliance {
        match self {
            RenderOptions::Document(doc) => doc.compliance,
            RenderOptions::Worksheet(_) | RenderOptions::Presentation(_) => PdfCompliance::Default,
        }
    }
}

/// Trait for PDF rendering backends.
///
/// Implementations must be thread-safe: one renderer instance serves all
/// concurrent requests, each call with its own input and output.
///
/// # Errors
///
/// - `PreviewError::PasswordProtected` - the source needs a password
/// - `PreviewError::Conversion` - any other rendering fault
/// - `PreviewError::MissingDependency` - the backend is not installed
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Short identifier, e.g. `"libreoffice"`.
    fn name(&self) -> &str;

    /// Render `input` to PDF bytes.
    async fn render_to_pdf(&self, input: &[u8], source: &SourceDescriptor, options: &RenderOptions)
    -> Result<Vec<u8>>;
}

/// Reject empty output or output without a PDF header.
pub fn validate_pdf(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(PreviewError::conversion("Renderer produced an empty file"));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(PreviewError::conversion("Renderer output is not a PDF document"));
    }
    Ok(())
}
