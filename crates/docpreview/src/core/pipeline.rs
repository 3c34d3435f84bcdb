//! Conversion pipeline orchestration.
//!
//! One request moves through: classify → allocate staging artifact → render →
//! write PDF to the artifact. Classification happens before any I/O, so an
//! unsupported file never touches the staging directory or the renderer. Any
//! failure after allocation drops the artifact, which deletes its file.

use crate::core::config::PreviewConfig;
use crate::core::formats::{Classification, FormatRegistry, SupportedFormat};
use crate::core::staging::{StagingArea, TempArtifact};
use crate::render::{LibreOfficeRenderer, Renderer, SourceDescriptor, options_for, validate_pdf};
use crate::{PreviewError, Result};
use std::path::Path;
use std::sync::Arc;

/// A classified input, ready for rendering.
#[derive(Debug, Clone, Copy)]
pub struct ConversionRequest<'a> {
    pub input: &'a [u8],
    pub filename: &'a str,
    pub classification: &'a Classification,
}

/// A rendered PDF waiting in the staging directory.
#[derive(Debug)]
pub struct ConversionResult {
    artifact: TempArtifact,
    /// Download name, e.g. `report.pdf` for `report.docx`
    pub display_name: String,
    pub format: SupportedFormat,
    pub byte_len: u64,
}

impl ConversionResult {
    pub fn artifact(&self) -> &TempArtifact {
        &self.artifact
    }

    pub fn into_artifact(self) -> TempArtifact {
        self.artifact
    }

    /// Read the PDF into memory.
    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        self.artifact.read().await
    }

    /// Copy the PDF to `dest` and delete the staging file.
    pub async fn persist_to(self, dest: impl AsRef<Path>) -> Result<u64> {
        self.artifact.persist_to(dest).await
    }
}

/// Download name for a source file: its stem plus `.pdf`.
///
/// Directory components are dropped. Falls back to `document.pdf` when nothing
/// usable is left.
pub fn display_name_for(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        Some(_) => "",
        None => base,
    };
    let stem = stem.trim();
    if stem.is_empty() {
        "document.pdf".to_string()
    } else {
        format!("{}.pdf", stem)
    }
}

/// Shared conversion service.
///
/// Cheap to clone; all state is immutable and behind `Arc`s, so one instance
/// serves every concurrent request.
#[derive(Clone)]
pub struct Previewer {
    config: Arc<PreviewConfig>,
    registry: Arc<FormatRegistry>,
    staging: StagingArea,
    renderer: Arc<dyn Renderer>,
}

impl std::fmt::Debug for Previewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Previewer")
            .field("staging", &self.staging)
            .field("renderer", &self.renderer.name())
            .finish()
    }
}

impl Previewer {
    /// Build a previewer from a validated config and a renderer.
    pub fn new(config: PreviewConfig, renderer: Arc<dyn Renderer>) -> Result<Self> {
        config.validate()?;
        let registry = FormatRegistry::from_config(&config.formats);
        let staging = StagingArea::new(config.staging_dir());
        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            staging,
            renderer,
        })
    }

    /// Build a previewer backed by the local LibreOffice installation.
    pub fn with_libreoffice(config: PreviewConfig) -> Result<Self> {
        let renderer = Arc::new(LibreOfficeRenderer::from_config(&config));
        Self::new(config, renderer)
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn renderer_name(&self) -> &str {
        self.renderer.name()
    }

    pub fn classify(&self, filename: &str) -> Result<Classification> {
        self.registry.classify(filename)
    }

    /// Convert in-memory bytes named `filename` to a staged PDF.
    ///
    /// # Errors
    ///
    /// - `UnsupportedFormat` before anything else happens
    /// - `PasswordProtected` / `Conversion` / `MissingDependency` from the renderer
    /// - `Io` if the staging directory is not writable
    pub async fn convert_bytes(&self, input: &[u8], filename: &str) -> Result<ConversionResult> {
        let classification = self.classify(filename)?;
        self.convert(ConversionRequest {
            input,
            filename,
            classification: &classification,
        })
        .await
    }

    /// Convert a file on disk.
    ///
    /// The file name is classified before the file is opened.
    pub async fn convert_file(&self, path: impl AsRef<Path>) -> Result<ConversionResult> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PreviewError::validation(format!("Invalid file name: {}", path.display())))?;

        let classification = self.classify(filename)?;
        let input = tokio::fs::read(path).await?;

        self.convert(ConversionRequest {
            input: &input,
            filename,
            classification: &classification,
        })
        .await
    }

    /// Render a classified request into a fresh staging artifact.
    pub async fn convert(&self, request: ConversionRequest<'_>) -> Result<ConversionResult> {
        let classification = request.classification;
        let artifact = self.staging.allocate().await?;

        tracing::info!(
            "Generating PDF preview for '{}' ({}) in {}",
            request.filename,
            classification.format,
            artifact.path().display()
        );

        let options = options_for(classification.format, &classification.extension, &self.config);
        let source = SourceDescriptor {
            format: classification.format,
            extension: classification.extension.clone(),
        };

        let pdf = match self.renderer.render_to_pdf(request.input, &source, &options).await {
            Ok(pdf) => pdf,
            Err(e) => {
                tracing::warn!("Conversion of '{}' failed: {}", request.filename, e);
                return Err(e);
            }
        };
        validate_pdf(&pdf)?;

        artifact.write_all(&pdf).await?;
        let byte_len = artifact.len().await?;

        tracing::info!("'{}' rendered to PDF ({} bytes)", request.filename, byte_len);

        Ok(ConversionResult {
            artifact,
            display_name: display_name_for(request.filename),
            format: classification.format,
            byte_len,
        })
    }
}
