//! Configuration loading and management.
//!
//! A [`PreviewConfig`] is built once at process start (from a TOML, YAML or JSON
//! file, or programmatically) and then shared immutably by the classifier, the
//! staging area and the renderer.

use crate::{PreviewError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default timeout for a single rendering call (300 seconds)
pub const DEFAULT_CONVERSION_TIMEOUT: u64 = 300;

/// Name of the file searched for by [`PreviewConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "docpreview.toml";

/// Main service configuration.
///
/// # Example
///
/// ```rust
/// use docpreview::PreviewConfig;
///
/// let config = PreviewConfig::default();
/// assert!(config.formats.worksheet.contains(&"xlsx".to_string()));
///
/// // Load from TOML file
/// // let config = PreviewConfig::from_toml_file("docpreview.toml")?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Directory holding staging artifacts (None = `<system temp>/docpreview`)
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,

    /// Upper bound for one rendering call, in seconds
    #[serde(default = "default_timeout")]
    pub conversion_timeout_secs: u64,

    /// Extension sets for each format family
    #[serde(default)]
    pub formats: FormatsConfig,

    /// Document family options
    #[serde(default)]
    pub document: DocumentConfig,

    /// Worksheet family options
    #[serde(default)]
    pub worksheet: WorksheetConfig,

    /// LibreOffice backend options
    #[serde(default)]
    pub libreoffice: LibreOfficeConfig,
}

/// Extension sets per family. Extensions are lowercase, without a leading dot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatsConfig {
    #[serde(default = "default_document_extensions")]
    pub document: Vec<String>,

    #[serde(default = "default_worksheet_extensions")]
    pub worksheet: Vec<String>,

    #[serde(default = "default_presentation_extensions")]
    pub presentation: Vec<String>,
}

/// Document family options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Export `.odt` sources with the PDF/A-1b archival profile
    #[serde(default = "default_true")]
    pub odt_pdfa: bool,
}

/// Worksheet family options. Only the CSV path uses these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorksheetConfig {
    /// Print gridlines (hairline style) for CSV sheets
    #[serde(default = "default_true")]
    pub csv_gridlines: bool,

    /// Fit column widths to content for CSV sheets
    #[serde(default = "default_true")]
    pub csv_auto_fit_columns: bool,
}

/// LibreOffice backend options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibreOfficeConfig {
    /// Explicit path to the `soffice` executable (None = discovery)
    #[serde(default)]
    pub binary: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}
fn default_timeout() -> u64 {
    DEFAULT_CONVERSION_TIMEOUT
}
fn default_document_extensions() -> Vec<String> {
    ["txt", "doc", "docx", "rtf", "odt"].iter().map(|s| s.to_string()).collect()
}
fn default_worksheet_extensions() -> Vec<String> {
    ["ods", "xls", "xlsx", "csv"].iter().map(|s| s.to_string()).collect()
}
fn default_presentation_extensions() -> Vec<String> {
    ["ppt", "pptx"].iter().map(|s| s.to_string()).collect()
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            staging_dir: None,
            conversion_timeout_secs: DEFAULT_CONVERSION_TIMEOUT,
            formats: FormatsConfig::default(),
            document: DocumentConfig::default(),
            worksheet: WorksheetConfig::default(),
            libreoffice: LibreOfficeConfig::default(),
        }
    }
}

impl Default for FormatsConfig {
    fn default() -> Self {
        Self {
            document: default_document_extensions(),
            worksheet: default_worksheet_extensions(),
            presentation: default_presentation_extensions(),
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self { odt_pdfa: true }
    }
}

impl Default for WorksheetConfig {
    fn default() -> Self {
        Self {
            csv_gridlines: true,
            csv_auto_fit_columns: true,
        }
    }
}

impl PreviewConfig {
    /// Resolved staging directory.
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("docpreview"))
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// Returns `PreviewError::Validation` if the timeout is zero, an extension is
    /// empty, uppercase or dotted, or an extension belongs to more than one family.
    pub fn validate(&self) -> Result<()> {
        if self.conversion_timeout_secs == 0 {
            return Err(PreviewError::validation("conversion_timeout_secs must be greater than 0"));
        }

        let mut owners: HashMap<&str, &str> = HashMap::new();
        let families = [
            ("document", &self.formats.document),
            ("worksheet", &self.formats.worksheet),
            ("presentation", &self.formats.presentation),
        ];

        for (family, extensions) in families {
            for ext in extensions.iter() {
                if ext.is_empty() || ext.starts_with('.') || ext.chars().any(|c| c.is_ascii_uppercase()) {
                    return Err(PreviewError::validation(format!(
                        "Invalid extension '{}' in formats.{}: use lowercase without a leading dot",
                        ext, family
                    )));
                }
                if let Some(previous) = owners.insert(ext.as_str(), family)
                    && previous != family
                {
                    return Err(PreviewError::validation(format!(
                        "Extension '{}' is listed in both formats.{} and formats.{}",
                        ext, previous, family
                    )));
                }
            }
        }

        Ok(())
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `PreviewError::Validation` if the file doesn't exist, is invalid
    /// TOML or fails [`validate`](Self::validate).
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| PreviewError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = serde_yaml_ng::from_str(&content)
            .map_err(|e| PreviewError::validation(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| PreviewError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, choosing the parser from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "toml" => Self::from_toml_file(path),
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            _ => Err(PreviewError::validation(format!(
                "Unsupported config file format: {} (expected .toml, .yaml, .yml or .json)",
                path.display()
            ))),
        }
    }

    /// Discover configuration file in parent directories.
    ///
    /// Searches for `docpreview.toml` in the current directory and its parents.
    ///
    /// # Returns
    ///
    /// - `Some(config)` if found
    /// - `None` if no config file found
    pub fn discover() -> Result<Option<Self>> {
        let mut current = std::env::current_dir().map_err(PreviewError::Io)?;

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                tracing::debug!("Found config file at {}", candidate.display());
                return Ok(Some(Self::from_toml_file(candidate)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| PreviewError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}
