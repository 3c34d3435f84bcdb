//! Family-specific option wiring.

use super::{
    DocumentOptions, GridlineStyle, PdfCompliance, PresentationOptions, RenderOptions, SheetLoadFormat,
    TextLoadFormat, WorksheetOptions,
};
use crate::PreviewConfig;
use crate::core::formats::SupportedFormat;

/// Build render options for a classified source.
///
/// Pure function of the family, the extension and the config; no state is
/// shared between calls.
///
/// - `txt` loads as plain text, other documents auto-detect.
/// - `odt` exports as PDF/A-1b (unless `document.odt_pdfa` is off), other
///   documents use the default profile.
/// - `csv` loads as delimited text with hairline gridlines and fitted columns.
/// - Other worksheets and all presentations use defaults.
pub fn options_for(format: SupportedFormat, extension: &str, config: &PreviewConfig) -> RenderOptions {
    match format {
        SupportedFormat::Document => {
            let load_format = if extension == "txt" {
                TextLoadFormat::PlainText
            } else {
                TextLoadFormat::Auto
            };
            let compliance = if extension == "odt" && config.document.odt_pdfa {
                PdfCompliance::PdfA1b
            } else {
                PdfCompliance::Default
            };
            RenderOptions::Document(DocumentOptions {
                load_format,
                compliance,
            })
        }
        SupportedFormat::Worksheet => {
            if extension == "csv" {
                let gridlines = config.worksheet.csv_gridlines;
                RenderOptions::Worksheet(WorksheetOptions {
                    load_format: SheetLoadFormat::Csv,
                    print_gridlines: gridlines,
                    gridline_style: if gridlines {
                        GridlineStyle::Hair
                    } else {
                        GridlineStyle::Default
                    },
                    auto_fit_columns: config.worksheet.csv_auto_fit_columns,
                })
            } else {
                RenderOptions::Worksheet(WorksheetOptions::default())
            }
        }
        SupportedFormat::Presentation => RenderOptions::Presentation(PresentationOptions::default()),
    }
}
