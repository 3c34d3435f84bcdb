//! Format classification.
//!
//! Maps a file name to one of the three format families by its extension. The
//! extension sets come from [`FormatsConfig`]; a [`FormatRegistry`] is built
//! from them once and shared read-only afterwards.

use crate::core::config::FormatsConfig;
use crate::{PreviewError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Format family of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportedFormat {
    /// Text and word-processing documents
    Document,
    /// Spreadsheets
    Worksheet,
    /// Slide decks
    Presentation,
}

impl SupportedFormat {
    pub const ALL: [SupportedFormat; 3] = [
        SupportedFormat::Document,
        SupportedFormat::Worksheet,
        SupportedFormat::Presentation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedFormat::Document => "document",
            SupportedFormat::Worksheet => "worksheet",
            SupportedFormat::Presentation => "presentation",
        }
    }
}

impl fmt::Display for SupportedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub format: SupportedFormat,
    /// Lowercase extension without the dot, e.g. `"odt"`
    pub extension: String,
}

/// Immutable extension → family lookup.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    by_extension: HashMap<String, SupportedFormat>,
}

impl FormatRegistry {
    /// Build the lookup from configured extension sets.
    ///
    /// Extensions are normalized to lowercase. If an extension is listed in more
    /// than one family the first family (document, worksheet, presentation)
    /// wins; [`PreviewConfig::validate`](crate::PreviewConfig::validate) rejects
    /// such configs up front.
    pub fn from_config(formats: &FormatsConfig) -> Self {
        let mut by_extension = HashMap::new();
        let families = [
            (SupportedFormat::Document, &formats.document),
            (SupportedFormat::Worksheet, &formats.worksheet),
            (SupportedFormat::Presentation, &formats.presentation),
        ];

        for (format, extensions) in families {
            for ext in extensions.iter() {
                by_extension
                    .entry(ext.trim_start_matches('.').to_ascii_lowercase())
                    .or_insert(format);
            }
        }

        Self { by_extension }
    }

    /// Classify a file name.
    ///
    /// # Errors
    ///
    /// Returns `PreviewError::UnsupportedFormat` when the name has no extension
    /// or the extension is in none of the families. No I/O happens here.
    pub fn classify(&self, filename: &str) -> Result<Classification> {
        let extension = extension_of(filename)
            .ok_or_else(|| PreviewError::UnsupportedFormat(format!("'{}' has no file extension", filename)))?;

        match self.by_extension.get(&extension) {
            Some(format) => {
                tracing::debug!("Classified '{}' as {} (.{})", filename, format, extension);
                Ok(Classification {
                    format: *format,
                    extension,
                })
            }
            None => Err(PreviewError::UnsupportedFormat(format!(
                "Preview not supported for '.{}' files",
                extension
            ))),
        }
    }

    pub fn is_supported(&self, extension: &str) -> bool {
        self.by_extension
            .contains_key(&extension.trim_start_matches('.').to_ascii_lowercase())
    }

    /// Sorted extensions belonging to `format`.
    pub fn extensions(&self, format: SupportedFormat) -> Vec<&str> {
        let mut extensions: Vec<&str> = self
            .by_extension
            .iter()
            .filter(|(_, f)| **f == format)
            .map(|(ext, _)| ext.as_str())
            .collect();
        extensions.sort_unstable();
        extensions
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::from_config(&FormatsConfig::default())
    }
}

/// Lowercased text after the last `.` of the final path component.
///
/// Returns `None` for names without a dot, names ending in a dot and dotfiles
/// such as `.bashrc`.
pub fn extension_of(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Classify with the default extension sets.
///
/// # Example
///
/// ```rust
/// use docpreview::{classify, SupportedFormat};
///
/// assert_eq!(classify("report.docx").unwrap().format, SupportedFormat::Document);
/// assert_eq!(classify("Budget.XLSX").unwrap().format, SupportedFormat::Worksheet);
/// assert!(classify("image.png").is_err());
/// ```
pub fn classify(filename: &str) -> Result<Classification> {
    FormatRegistry::default().classify(filename)
}
