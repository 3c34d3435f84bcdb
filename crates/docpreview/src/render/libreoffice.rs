//! LibreOffice rendering backend.
//!
//! Converts documents, spreadsheets and presentations to PDF with LibreOffice's
//! headless mode (`soffice --headless --convert-to pdf`).
//!
//! # Features
//!
//! - **Isolated runs**: every call gets its own scratch directory and user
//!   profile, so concurrent conversions never share LibreOffice state
//! - **Timeout protection**: a hung conversion is killed after the configured timeout
//! - **Family options**: plain-text import, PDF/A-1b export, CSV sheets with
//!   gridlines and fitted columns
//! - **Error mapping**: password prompts become `PasswordProtected`, a missing
//!   binary becomes `MissingDependency`
//!
//! # System Requirement
//!
//! LibreOffice must be installed and `soffice` must be in PATH (or configured):
//! - **macOS**: `brew install --cask libreoffice`
//! - **Linux**: `apt install libreoffice` or `dnf install libreoffice`
//! - **Windows**: `winget install LibreOffice.LibreOffice`
//!
//! # Example
//!
//! ```rust,no_run
//! use docpreview::render::{LibreOfficeRenderer, Renderer, SourceDescriptor, options_for};
//! use docpreview::{PreviewConfig, SupportedFormat};
//!
//! # async fn example() -> docpreview::Result<()> {
//! let config = PreviewConfig::default();
//! let renderer = LibreOfficeRenderer::from_config(&config);
//!
//! let source = SourceDescriptor { format: SupportedFormat::Document, extension: "docx".to_string() };
//! let options = options_for(source.format, &source.extension, &config);
//! let pdf = renderer.render_to_pdf(&std::fs::read("report.docx")?, &source, &options).await?;
//! println!("Rendered {} bytes", pdf.len());
//! # Ok(())
//! # }
//! ```

use super::protection::{detect_password_protection, mentions_password};
use super::sheet::{parse_csv, write_flat_ods};
use super::{
    PdfCompliance, RenderOptions, Renderer, SheetLoadFormat, SourceDescriptor, TextLoadFormat, validate_pdf,
};
use crate::core::config::DEFAULT_CONVERSION_TIMEOUT;
use crate::{PreviewConfig, PreviewError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::env;
use std::fs as std_fs;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;
use tokio::time::{Duration, timeout};

const PDF_EXPORT: &str = "pdf";
const PDFA1B_EXPORT: &str = r#"pdf:writer_pdf_Export:{"SelectPdfVersion":{"type":"long","value":"1"}}"#;
const TEXT_IMPORT_FILTER: &str = "Text (encoded):UTF8,LF,,,";

/// RAII guard for automatic scratch directory cleanup
struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    async fn new(path: PathBuf) -> Result<Self> {
        fs::create_dir_all(&path).await?;
        Ok(Self { path })
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std_fs::remove_dir_all(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!("Failed to remove scratch directory {}: {}", self.path.display(), e);
        }
    }
}

fn libreoffice_install_message() -> String {
    "LibreOffice (soffice/libreoffice) is required to render previews. \
Install: macOS: 'brew install --cask libreoffice', \
Linux: 'apt install libreoffice', \
Windows: 'winget install LibreOffice.LibreOffice'. \
If LibreOffice is installed in a custom location, set libreoffice.binary in docpreview.toml \
or the DOCPREVIEW_LIBREOFFICE_PATH environment variable to the soffice executable."
        .to_string()
}

fn soffice_candidates(configured: Option<&Path>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    let mut push_candidate = |path: PathBuf| {
        if seen.insert(path.clone()) {
            candidates.push(path);
        }
    };

    if let Some(path) = configured {
        push_candidate(path.to_path_buf());
    }

    for var in ["DOCPREVIEW_LIBREOFFICE_PATH", "SOFFICE_PATH", "LIBREOFFICE_PATH"] {
        if let Some(value) = env::var_os(var).filter(|v| !v.is_empty()) {
            push_candidate(PathBuf::from(value));
        }
    }

    if cfg!(target_os = "macos") {
        push_candidate(PathBuf::from("/Applications/LibreOffice.app/Contents/MacOS/soffice"));
    }

    if cfg!(target_os = "windows") {
        push_candidate(PathBuf::from("C:\\Program Files\\LibreOffice\\program\\soffice.exe"));
    }

    if let Some(path_env) = env::var_os("PATH") {
        for dir in env::split_paths(&path_env) {
            push_candidate(dir.join("soffice"));
            push_candidate(dir.join("libreoffice"));
            push_candidate(dir.join("soffice.exe"));
        }
    }

    candidates
}

fn locate_soffice_binary(configured: Option<&Path>) -> Result<PathBuf> {
    for candidate in soffice_candidates(configured) {
        if let Ok(metadata) = std_fs::metadata(&candidate)
            && metadata.is_file()
        {
            return Ok(candidate);
        }
    }

    Err(PreviewError::MissingDependency(libreoffice_install_message()))
}

/// Check if LibreOffice is available and working.
///
/// `configured` takes precedence over environment variables and PATH.
pub async fn check_libreoffice_available(configured: Option<&Path>) -> Result<PathBuf> {
    let soffice_path = locate_soffice_binary(configured)?;

    let result = Command::new(&soffice_path).arg("--version").output().await;

    match result {
        Ok(output) if output.status.success() => Ok(soffice_path),
        Ok(_) => Err(PreviewError::MissingDependency(format!(
            "LibreOffice executable '{}' responded with a failure when checking '--version'. \
Please reinstall LibreOffice.",
            soffice_path.display()
        ))),
        Err(err) => Err(PreviewError::MissingDependency(format!(
            "LibreOffice executable '{}' could not be executed: {}. {help}",
            soffice_path.display(),
            err,
            help = libreoffice_install_message()
        ))),
    }
}

/// `file://` URL for an absolute path, as expected by `-env:UserInstallation`.
fn file_url(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    if raw.starts_with('/') {
        format!("file://{}", raw)
    } else {
        format!("file:///{}", raw)
    }
}

/// Export target passed to `--convert-to` for the requested profile.
pub fn export_filter(compliance: PdfCompliance) -> &'static str {
    match compliance {
        PdfCompliance::Default => PDF_EXPORT,
        PdfCompliance::PdfA1b => PDFA1B_EXPORT,
    }
}

/// One `soffice --convert-to` invocation.
struct SofficeJob<'a> {
    input_path: &'a Path,
    output_dir: &'a Path,
    profile_dir: &'a Path,
    import_filter: Option<&'a str>,
    export_filter: &'a str,
    timeout_seconds: u64,
}

async fn run_soffice(soffice_path: &Path, job: SofficeJob<'_>) -> Result<Vec<u8>> {
    let mut command = Command::new(soffice_path);
    command
        .arg(format!("-env:UserInstallation={}", file_url(job.profile_dir)))
        .arg("--headless")
        .arg("--norestore")
        .arg("--nolockcheck");
    if let Some(filter) = job.import_filter {
        command.arg(format!("--infilter={}", filter));
    }
    command
        .arg("--convert-to")
        .arg(job.export_filter)
        .arg("--outdir")
        .arg(job.output_dir)
        .arg(job.input_path)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|e| {
        PreviewError::conversion(format!(
            "Failed to execute LibreOffice at '{}': {}",
            soffice_path.display(),
            e
        ))
    })?;

    let child_id = child.id();

    let output = match timeout(Duration::from_secs(job.timeout_seconds), child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(PreviewError::conversion(format!("Failed to wait for LibreOffice: {}", e)));
        }
        Err(_) => {
            // wait_with_output was cancelled; kill_on_drop reaps the child
            return Err(PreviewError::conversion(format!(
                "LibreOffice conversion timed out after {} seconds (PID: {:?})",
                job.timeout_seconds, child_id
            )));
        }
    };

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let password_error = || {
        PreviewError::PasswordProtected(format!(
            "{} requires a password",
            job.input_path.file_name().unwrap_or_default().to_string_lossy()
        ))
    };

    if !output.status.success() {
        if mentions_password(&stderr) || mentions_password(&stdout) {
            return Err(password_error());
        }
        return Err(PreviewError::conversion(format!(
            "LibreOffice exited with code {}: {}",
            output.status.code().unwrap_or(-1),
            if !stderr.is_empty() { &stderr } else { &stdout }
        )));
    }

    let input_stem = job
        .input_path
        .file_stem()
        .ok_or_else(|| PreviewError::conversion("Invalid input file name"))?;
    let expected_output = job.output_dir.join(format!("{}.pdf", input_stem.to_string_lossy()));

    // soffice exits 0 when it cannot load the source; the missing file is the only signal
    let pdf = match fs::read(&expected_output).await {
        Ok(pdf) => pdf,
        Err(_) if mentions_password(&stderr) || mentions_password(&stdout) => return Err(password_error()),
        Err(e) => {
            return Err(PreviewError::conversion(format!(
                "LibreOffice did not produce a PDF ({}): {}",
                e,
                if !stderr.is_empty() { stderr.trim() } else { stdout.trim() }
            )));
        }
    };

    validate_pdf(&pdf)?;
    Ok(pdf)
}

/// Renderer driving a local LibreOffice installation.
#[derive(Debug, Clone)]
pub struct LibreOfficeRenderer {
    binary: Option<PathBuf>,
    scratch_root: PathBuf,
    timeout_seconds: u64,
}

impl Default for LibreOfficeRenderer {
    fn default() -> Self {
        Self {
            binary: None,
            scratch_root: env::temp_dir(),
            timeout_seconds: DEFAULT_CONVERSION_TIMEOUT,
        }
    }
}

impl LibreOfficeRenderer {
    pub fn from_config(config: &PreviewConfig) -> Self {
        Self {
            binary: config.libreoffice.binary.clone(),
            scratch_root: config.staging_dir(),
            timeout_seconds: config.conversion_timeout_secs,
        }
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    /// Write the source into `dir`, converting CSV to a prepared sheet when asked.
    ///
    /// Returns the input path and the import filter to pass to soffice.
    async fn stage_input(
        &self,
        dir: &Path,
        input: &[u8],
        source: &SourceDescriptor,
        options: &RenderOptions,
    ) -> Result<(PathBuf, Option<&'static str>)> {
        match options {
            RenderOptions::Document(doc) => {
                let path = dir.join(format!("input.{}", source.extension));
                fs::write(&path, input).await?;
                let filter = match doc.load_format {
                    TextLoadFormat::PlainText => Some(TEXT_IMPORT_FILTER),
                    TextLoadFormat::Auto => None,
                };
                Ok((path, filter))
            }
            RenderOptions::Worksheet(sheet) => match sheet.load_format {
                SheetLoadFormat::Csv => {
                    let parsed = parse_csv(input)?;
                    tracing::debug!(
                        "Prepared CSV sheet with {} rows, {} columns",
                        parsed.rows.len(),
                        parsed.column_count()
                    );
                    let fods = write_flat_ods(&[parsed], sheet)?;
                    let path = dir.join("input.fods");
                    fs::write(&path, fods).await?;
                    Ok((path, None))
                }
                SheetLoadFormat::Auto => {
                    let path = dir.join(format!("input.{}", source.extension));
                    fs::write(&path, input).await?;
                    Ok((path, None))
                }
            },
            RenderOptions::Presentation(_) => {
                let path = dir.join(format!("input.{}", source.extension));
                fs::write(&path, input).await?;
                Ok((path, None))
            }
        }
    }
}

#[async_trait]
impl Renderer for LibreOfficeRenderer {
    fn name(&self) -> &str {
        "libreoffice"
    }

    async fn render_to_pdf(
        &self,
        input: &[u8],
        source: &SourceDescriptor,
        options: &RenderOptions,
    ) -> Result<Vec<u8>> {
        if let Some(reason) = detect_password_protection(input) {
            return Err(PreviewError::PasswordProtected(format!(
                "{} source is an {}",
                source.extension, reason
            )));
        }

        let soffice_path = check_libreoffice_available(self.binary.as_deref()).await?;

        let unique_id = uuid::Uuid::new_v4();
        // RAII guard removes input, output and profile on every path
        let scratch = ScratchDir::new(self.scratch_root.join(format!("render_{}", unique_id))).await?;
        let output_dir = scratch.path.join("out");
        let profile_dir = scratch.path.join("profile");
        fs::create_dir_all(&output_dir).await?;

        let (input_path, import_filter) = self.stage_input(&scratch.path, input, source, options).await?;
        let export = export_filter(options.compliance());

        tracing::debug!(
            "Rendering .{} ({}) with LibreOffice, export filter '{}'",
            source.extension,
            source.format,
            export
        );

        run_soffice(
            &soffice_path,
            SofficeJob {
                input_path: &input_path,
                output_dir: &output_dir,
                profile_dir: &profile_dir,
                import_filter,
                export_filter: export,
                timeout_seconds: self.timeout_seconds,
            },
        )
        .await
    }
}
