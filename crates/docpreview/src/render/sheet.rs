//! CSV to flat OpenDocument spreadsheet.
//!
//! Renderers that take spreadsheets but have no switch for print gridlines or
//! column fitting get a prepared `.fods` document instead of the raw CSV: the
//! page layout prints the grid, cells carry hairline borders and every column is
//! sized to its longest value.

use super::{GridlineStyle, WorksheetOptions};
use crate::{PreviewError, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

/// Default column width, in centimetres.
pub const DEFAULT_COLUMN_WIDTH_CM: f64 = 2.258;

const MIN_COLUMN_WIDTH_CM: f64 = 1.0;
const MAX_COLUMN_WIDTH_CM: f64 = 12.0;
const CM_PER_CHAR: f64 = 0.21;
const COLUMN_PADDING_CM: f64 = 0.3;
const MAX_FITTED_COLUMNS: usize = 1024;
const HAIRLINE_BORDER: &str = "0.06pt solid #000000";

/// One parsed sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Parse comma-delimited text into a single sheet.
///
/// Rows may have different lengths; there is no header row.
pub fn parse_csv(input: &[u8]) -> Result<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Sheet {
        name: "Sheet1".to_string(),
        rows,
    })
}

/// Column widths sized to the longest value in each column.
///
/// # Errors
///
/// Fails for sheets wider than the fitting limit; callers fall back to default
/// widths.
pub fn fit_columns(sheet: &Sheet) -> Result<Vec<f64>> {
    let columns = sheet.column_count();
    if columns > MAX_FITTED_COLUMNS {
        return Err(PreviewError::conversion(format!(
            "Cannot fit {} columns in sheet '{}' (limit {})",
            columns, sheet.name, MAX_FITTED_COLUMNS
        )));
    }

    let mut widest = vec![0usize; columns];
    for row in &sheet.rows {
        for (i, value) in row.iter().enumerate() {
            let chars = value.lines().map(|l| l.chars().count()).max().unwrap_or(0);
            widest[i] = widest[i].max(chars);
        }
    }

    Ok(widest
        .into_iter()
        .map(|chars| (chars as f64 * CM_PER_CHAR + COLUMN_PADDING_CM).clamp(MIN_COLUMN_WIDTH_CM, MAX_COLUMN_WIDTH_CM))
        .collect())
}

/// Render sheets as a flat ODF spreadsheet (`.fods`) honouring `options`.
pub fn write_flat_ods(sheets: &[Sheet], options: &WorksheetOptions) -> Result<Vec<u8>> {
    let layouts: Vec<Option<Vec<f64>>> = sheets
        .iter()
        .map(|sheet| {
            if !options.auto_fit_columns {
                return None;
            }
            match fit_columns(sheet) {
                Ok(widths) => Some(widths),
                Err(e) => {
                    tracing::warn!("Column auto-fit failed for sheet '{}': {}", sheet.name, e);
                    None
                }
            }
        })
        .collect();

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 1);

    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    emit(
        &mut writer,
        Event::Start(BytesStart::new("office:document").with_attributes([
            ("xmlns:office", "urn:oasis:names:tc:opendocument:xmlns:office:1.0"),
            ("xmlns:style", "urn:oasis:names:tc:opendocument:xmlns:style:1.0"),
            ("xmlns:table", "urn:oasis:names:tc:opendocument:xmlns:table:1.0"),
            ("xmlns:text", "urn:oasis:names:tc:opendocument:xmlns:text:1.0"),
            ("xmlns:fo", "urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0"),
            ("office:version", "1.2"),
            ("office:mimetype", "application/vnd.oasis.opendocument.spreadsheet"),
        ])),
    )?;

    write_styles(&mut writer, options, &layouts)?;

    emit(&mut writer, Event::Start(BytesStart::new("office:body")))?;
    emit(&mut writer, Event::Start(BytesStart::new("office:spreadsheet")))?;
    for (index, (sheet, widths)) in sheets.iter().zip(&layouts).enumerate() {
        write_table(&mut writer, index, sheet, widths.as_deref(), options)?;
    }
    emit(&mut writer, Event::End(BytesEnd::new("office:spreadsheet")))?;
    emit(&mut writer, Event::End(BytesEnd::new("office:body")))?;
    emit(&mut writer, Event::End(BytesEnd::new("office:document")))?;

    Ok(writer.into_inner())
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| PreviewError::conversion(format!("Failed to write spreadsheet XML: {}", e)))
}

fn empty(writer: &mut Writer<Vec<u8>>, element: BytesStart<'_>) -> Result<()> {
    emit(writer, Event::Empty(element))
}

fn format_cm(width: f64) -> String {
    format!("{:.3}cm", width)
}

fn write_styles(writer: &mut Writer<Vec<u8>>, options: &WorksheetOptions, layouts: &[Option<Vec<f64>>]) -> Result<()> {
    let print = if options.print_gridlines {
        "grid objects charts drawings zero-values"
    } else {
        "objects charts drawings zero-values"
    };

    emit(writer, Event::Start(BytesStart::new("office:automatic-styles")))?;

    emit(
        writer,
        Event::Start(BytesStart::new("style:page-layout").with_attributes([("style:name", "pm1")])),
    )?;
    empty(
        writer,
        BytesStart::new("style:page-layout-properties").with_attributes([("style:print", print)]),
    )?;
    emit(writer, Event::End(BytesEnd::new("style:page-layout")))?;

    emit(
        writer,
        Event::Start(BytesStart::new("style:style").with_attributes([
            ("style:name", "ta1"),
            ("style:family", "table"),
            ("style:master-page-name", "Default"),
        ])),
    )?;
    empty(
        writer,
        BytesStart::new("style:table-properties").with_attributes([("table:display", "true")]),
    )?;
    emit(writer, Event::End(BytesEnd::new("style:style")))?;

    write_column_style(writer, "co-default", DEFAULT_COLUMN_WIDTH_CM)?;
    for (sheet_index, widths) in layouts.iter().enumerate() {
        if let Some(widths) = widths {
            for (column, width) in widths.iter().enumerate() {
                write_column_style(writer, &column_style_name(sheet_index, column), *width)?;
            }
        }
    }

    let border = if options.print_gridlines && options.gridline_style == GridlineStyle::Hair {
        HAIRLINE_BORDER
    } else {
        "none"
    };
    emit(
        writer,
        Event::Start(
            BytesStart::new("style:style").with_attributes([("style:name", "ce1"), ("style:family", "table-cell")]),
        ),
    )?;
    empty(
        writer,
        BytesStart::new("style:table-cell-properties").with_attributes([("fo:border", border)]),
    )?;
    emit(writer, Event::End(BytesEnd::new("style:style")))?;

    emit(writer, Event::End(BytesEnd::new("office:automatic-styles")))?;

    emit(writer, Event::Start(BytesStart::new("office:master-styles")))?;
    empty(
        writer,
        BytesStart::new("style:master-page")
            .with_attributes([("style:name", "Default"), ("style:page-layout-name", "pm1")]),
    )?;
    emit(writer, Event::End(BytesEnd::new("office:master-styles")))
}

fn column_style_name(sheet: usize, column: usize) -> String {
    format!("co-{}-{}", sheet, column)
}

fn write_column_style(writer: &mut Writer<Vec<u8>>, name: &str, width: f64) -> Result<()> {
    emit(
        writer,
        Event::Start(
            BytesStart::new("style:style").with_attributes([("style:name", name), ("style:family", "table-column")]),
        ),
    )?;
    empty(
        writer,
        BytesStart::new("style:table-column-properties")
            .with_attributes([("style:column-width", format_cm(width).as_str())]),
    )?;
    emit(writer, Event::End(BytesEnd::new("style:style")))
}

fn write_table(
    writer: &mut Writer<Vec<u8>>,
    sheet_index: usize,
    sheet: &Sheet,
    widths: Option<&[f64]>,
    options: &WorksheetOptions,
) -> Result<()> {
    emit(
        writer,
        Event::Start(
            BytesStart::new("table:table")
                .with_attributes([("table:name", sheet.name.as_str()), ("table:style-name", "ta1")]),
        ),
    )?;

    let columns = sheet.column_count().max(1);
    match widths {
        Some(widths) => {
            for column in 0..widths.len() {
                let style = column_style_name(sheet_index, column);
                empty(
                    writer,
                    BytesStart::new("table:table-column").with_attributes([("table:style-name", style.as_str())]),
                )?;
            }
        }
        None => {
            let repeated = columns.to_string();
            empty(
                writer,
                BytesStart::new("table:table-column").with_attributes([
                    ("table:style-name", "co-default"),
                    ("table:number-columns-repeated", repeated.as_str()),
                ]),
            )?;
        }
    }

    for row in &sheet.rows {
        emit(writer, Event::Start(BytesStart::new("table:table-row")))?;
        for value in row {
            write_cell(writer, value, options)?;
        }
        emit(writer, Event::End(BytesEnd::new("table:table-row")))?;
    }

    emit(writer, Event::End(BytesEnd::new("table:table")))
}

fn write_cell(writer: &mut Writer<Vec<u8>>, value: &str, options: &WorksheetOptions) -> Result<()> {
    let trimmed = value.trim();
    let numeric = !trimmed.is_empty() && trimmed.parse::<f64>().is_ok_and(f64::is_finite);

    let mut cell = BytesStart::new("table:table-cell");
    if options.print_gridlines {
        cell.push_attribute(("table:style-name", "ce1"));
    }
    if value.is_empty() {
        return empty(writer, cell);
    }
    if numeric {
        cell.push_attribute(("office:value-type", "float"));
        cell.push_attribute(("office:value", trimmed));
    } else {
        cell.push_attribute(("office:value-type", "string"));
    }

    emit(writer, Event::Start(cell))?;
    for line in value.lines() {
        emit(writer, Event::Start(BytesStart::new("text:p")))?;
        emit(writer, Event::Text(BytesText::new(line)))?;
        emit(writer, Event::End(BytesEnd::new("text:p")))?;
    }
    emit(writer, Event::End(BytesEnd::new("table:table-cell")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::SheetLoadFormat;

    fn csv_options() -> WorksheetOptions {
        WorksheetOptions {
            load_format: SheetLoadFormat::Csv,
            print_gridlines: true,
            gridline_style: GridlineStyle::Hair,
            auto_fit_columns: true,
        }
    }

    fn render(csv: &str, options: &WorksheetOptions) -> String {
        let sheet = parse_csv(csv.as_bytes()).unwrap();
        String::from_utf8(write_flat_ods(&[sheet], options).unwrap()).unwrap()
    }

    #[test]
    fn test_parse_csv_flexible_rows() {
        let sheet = parse_csv(b"name,amount\nrent,1200\nnote\n").unwrap();
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.rows[0], vec!["name", "amount"]);
        assert_eq!(sheet.rows[2], vec!["note"]);
        assert_eq!(sheet.column_count(), 2);
    }

    #[test]
    fn test_parse_csv_quoted_fields() {
        let sheet = parse_csv(b"\"Smith, J\",\"line1\nline2\"\n").unwrap();
        assert_eq!(sheet.rows[0][0], "Smith, J");
        assert_eq!(sheet.rows[0][1], "line1\nline2");
    }

    #[test]
    fn test_fit_columns_follows_longest_value() {
        let sheet = parse_csv(b"a,a much longer header value\nbb,c\n").unwrap();
        let widths = fit_columns(&sheet).unwrap();

        assert_eq!(widths.len(), 2);
        assert_eq!(widths[0], MIN_COLUMN_WIDTH_CM);
        assert!(widths[1] > widths[0]);
        assert!(widths[1] <= MAX_COLUMN_WIDTH_CM);
    }

    #[test]
    fn test_fit_columns_rejects_very_wide_sheet() {
        let sheet = Sheet {
            name: "Wide".to_string(),
            rows: vec![vec!["x".to_string(); MAX_FITTED_COLUMNS + 1]],
        };
        assert!(fit_columns(&sheet).is_err());
    }

    #[test]
    fn test_gridlines_and_hairline_borders() {
        let xml = render("a,b\n1,2\n", &csv_options());

        assert!(xml.contains(r#"style:print="grid objects charts drawings zero-values""#));
        assert!(xml.contains(r#"fo:border="0.06pt solid #000000""#));
        assert!(xml.contains(r#"table:style-name="ce1""#));
    }

    #[test]
    fn test_auto_fit_emits_per_column_styles() {
        let xml = render("short,a considerably longer value\n", &csv_options());

        assert!(xml.contains(r#"style:name="co-0-0""#));
        assert!(xml.contains(r#"style:name="co-0-1""#));
        assert!(!xml.contains("table:number-columns-repeated"));
    }

    #[test]
    fn test_auto_fit_failure_falls_back_to_default_widths() {
        let wide = vec!["x"; MAX_FITTED_COLUMNS + 1].join(",");
        let xml = render(&wide, &csv_options());

        assert!(xml.contains(r#"table:number-columns-repeated="1025""#));
        assert!(xml.contains(r#"table:style-name="co-default""#));
    }

    #[test]
    fn test_without_gridlines() {
        let options = WorksheetOptions {
            print_gridlines: false,
            gridline_style: GridlineStyle::Default,
            auto_fit_columns: false,
            ..csv_options()
        };
        let xml = render("a,b\n", &options);

        assert!(xml.contains(r#"style:print="objects charts drawings zero-values""#));
        assert!(xml.contains(r#"fo:border="none""#));
        assert!(!xml.contains(r#"table:style-name="ce1""#));
    }

    #[test]
    fn test_numeric_and_text_cells() {
        let xml = render("label,42.5\n", &csv_options());

        assert!(xml.contains(r#"office:value-type="float" office:value="42.5""#));
        assert!(xml.contains(r#"office:value-type="string""#));
        assert!(xml.contains("<text:p>label</text:p>"));
    }

    #[test]
    fn test_markup_is_escaped() {
        let xml = render("<b>&co</b>\n", &csv_options());
        assert!(xml.contains("&lt;b&gt;&amp;co&lt;/b&gt;"));
    }
}
