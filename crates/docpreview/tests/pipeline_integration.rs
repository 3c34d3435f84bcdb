//! End-to-end tests for classification, rendering options and staging cleanup.

mod helpers;

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docpreview::{
    PreviewConfig, PreviewError, Previewer, Result, SupportedFormat, classify,
    render::{
        LibreOfficeRenderer, PdfCompliance, RenderOptions, Renderer, SheetLoadFormat, SourceDescriptor,
        check_libreoffice_available,
    },
};

/// Records every call and returns a tiny PDF.
#[derive(Default)]
struct RecordingRenderer {
    calls: Mutex<Vec<(SourceDescriptor, RenderOptions)>>,
}

#[async_trait]
impl Renderer for RecordingRenderer {
    fn name(&self) -> &str {
        "recording"
    }

    async fn render_to_pdf(&self, _input: &[u8], source: &SourceDescriptor, options: &RenderOptions) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push((source.clone(), options.clone()));
        Ok(b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n%%EOF\n".to_vec())
    }
}

fn config_in(dir: &Path) -> PreviewConfig {
    PreviewConfig {
        staging_dir: Some(dir.to_path_buf()),
        ..Default::default()
    }
}

fn staged_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[test]
fn test_classification_of_every_family() {
    for name in ["a.doc", "a.docx", "a.rtf", "a.odt", "a.txt"] {
        assert_eq!(classify(name).unwrap().format, SupportedFormat::Document, "{}", name);
    }
    for name in ["a.xls", "a.xlsx", "a.ods", "a.csv"] {
        assert_eq!(classify(name).unwrap().format, SupportedFormat::Worksheet, "{}", name);
    }
    for name in ["a.ppt", "a.PPTX", "dir/a.pptx"] {
        assert_eq!(classify(name).unwrap().format, SupportedFormat::Presentation, "{}", name);
    }
    for name in ["a.png", "a.pdf", "a.exe", "noextension", "trailing."] {
        assert!(matches!(classify(name), Err(PreviewError::UnsupportedFormat(_))), "{}", name);
    }
}

#[tokio::test]
async fn test_report_docx_default_profile() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = Arc::new(RecordingRenderer::default());
    let previewer = Previewer::new(config_in(dir.path()), renderer.clone()).unwrap();

    let result = previewer.convert_bytes(b"docx", "report.docx").await.unwrap();
    assert_eq!(result.format, SupportedFormat::Document);
    assert!(!result.read_bytes().await.unwrap().is_empty());
    assert_eq!(staged_files(dir.path()), 1);

    drop(result);
    assert_eq!(staged_files(dir.path()), 0);

    let calls = renderer.calls.lock().unwrap();
    assert_eq!(calls[0].1.compliance(), PdfCompliance::Default);
}

#[tokio::test]
async fn test_legal_odt_archival_profile() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = Arc::new(RecordingRenderer::default());
    let previewer = Previewer::new(config_in(dir.path()), renderer.clone()).unwrap();

    for name in ["legal.odt", "report.docx", "old.doc", "memo.rtf"] {
        previewer.convert_bytes(b"bytes", name).await.unwrap();
    }

    let calls = renderer.calls.lock().unwrap();
    let profiles: Vec<_> = calls.iter().map(|(_, options)| options.compliance()).collect();
    assert_eq!(
        profiles,
        vec![
            PdfCompliance::PdfA1b,
            PdfCompliance::Default,
            PdfCompliance::Default,
            PdfCompliance::Default
        ]
    );
}

#[tokio::test]
async fn test_budget_xlsx_default_export() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = Arc::new(RecordingRenderer::default());
    let previewer = Previewer::new(config_in(dir.path()), renderer.clone()).unwrap();

    let result = previewer.convert_bytes(b"xlsx", "budget.xlsx").await.unwrap();
    assert_eq!(result.format, SupportedFormat::Worksheet);
    assert_eq!(result.display_name, "budget.pdf");

    let calls = renderer.calls.lock().unwrap();
    match &calls[0].1 {
        RenderOptions::Worksheet(sheet) => {
            assert_eq!(sheet.load_format, SheetLoadFormat::Auto);
            assert!(!sheet.print_gridlines);
        }
        other => panic!("expected worksheet options, got {:?}", other),
    }
}

#[tokio::test]
async fn test_csv_gets_gridlines_and_auto_fit() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = Arc::new(RecordingRenderer::default());
    let previewer = Previewer::new(config_in(dir.path()), renderer.clone()).unwrap();

    previewer.convert_bytes(b"a,b\n1,2\n", "export.csv").await.unwrap();

    let calls = renderer.calls.lock().unwrap();
    match &calls[0].1 {
        RenderOptions::Worksheet(sheet) => {
            assert_eq!(sheet.load_format, SheetLoadFormat::Csv);
            assert!(sheet.print_gridlines);
            assert!(sheet.auto_fit_columns);
        }
        other => panic!("expected worksheet options, got {:?}", other),
    }
}

#[tokio::test]
async fn test_csv_can_be_removed_by_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.formats.worksheet.retain(|ext| ext != "csv");
    let previewer = Previewer::new(config, Arc::new(RecordingRenderer::default())).unwrap();

    let err = previewer.convert_bytes(b"a,b", "export.csv").await.unwrap_err();
    assert!(matches!(err, PreviewError::UnsupportedFormat(_)));
}

#[tokio::test]
async fn test_slides_ppt_presentation() {
    let dir = tempfile::tempdir().unwrap();
    let previewer = Previewer::new(config_in(dir.path()), Arc::new(RecordingRenderer::default())).unwrap();

    let result = previewer.convert_bytes(b"ppt", "slides.ppt").await.unwrap();
    assert_eq!(result.format, SupportedFormat::Presentation);
    assert!(result.byte_len > 0);
}

#[tokio::test]
async fn test_image_png_rejected_before_io() {
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("never-created");
    let renderer = Arc::new(RecordingRenderer::default());
    let previewer = Previewer::new(config_in(&staging), renderer.clone()).unwrap();

    let err = previewer.convert_bytes(b"\x89PNG", "image.png").await.unwrap_err();

    assert!(matches!(err, PreviewError::UnsupportedFormat(_)));
    assert!(renderer.calls.lock().unwrap().is_empty());
    assert!(!staging.exists());
}

/// Encrypted inputs are sniffed before LibreOffice is looked up, so these run
/// without an installation.
#[tokio::test]
async fn test_password_protected_in_every_family() {
    let dir = tempfile::tempdir().unwrap();
    let previewer = Previewer::with_libreoffice(config_in(dir.path())).unwrap();

    let fixtures = [
        ("secret.docx", helpers::encrypted_ooxml()),
        ("secret.doc", helpers::encrypted_doc()),
        ("secret.odt", helpers::encrypted_odf("application/vnd.oasis.opendocument.text")),
        ("secret.xlsx", helpers::encrypted_ooxml()),
        ("secret.xls", helpers::encrypted_xls()),
        ("secret.ods", helpers::encrypted_odf("application/vnd.oasis.opendocument.spreadsheet")),
        ("secret.pptx", helpers::encrypted_ooxml()),
        ("secret.ppt", helpers::encrypted_ppt()),
    ];

    for (name, bytes) in fixtures {
        let err = previewer.convert_bytes(&bytes, name).await.unwrap_err();
        assert!(matches!(err, PreviewError::PasswordProtected(_)), "{}: {}", name, err);
    }
    assert_eq!(staged_files(dir.path()), 0);
}

#[tokio::test]
async fn test_libreoffice_renders_plain_text() {
    if check_libreoffice_available(None).await.is_err() {
        println!("Skipping test: LibreOffice not available");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let previewer = Previewer::new(config.clone(), Arc::new(LibreOfficeRenderer::from_config(&config))).unwrap();

    let result = previewer
        .convert_bytes(b"first line\nsecond line\n", "notes.txt")
        .await
        .unwrap();
    let pdf = result.read_bytes().await.unwrap();
    assert!(pdf.starts_with(b"%PDF-"));

    drop(result);
    assert_eq!(staged_files(dir.path()), 0);
}

#[tokio::test]
async fn test_libreoffice_renders_csv() {
    if check_libreoffice_available(None).await.is_err() {
        println!("Skipping test: LibreOffice not available");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let previewer = Previewer::with_libreoffice(config_in(dir.path())).unwrap();

    let result = previewer
        .convert_bytes(b"name,amount\nrent,1200\nfood,350.5\n", "budget.csv")
        .await
        .unwrap();
    assert!(result.read_bytes().await.unwrap().starts_with(b"%PDF-"));
}
