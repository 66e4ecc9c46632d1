// File: ./src/loader.rs
//! Byte sources -> [`Document`].
//!
//! Registration exports are HTML (often saved with a `.doc`/`.xls`
//! extension); timetables are spreadsheets or CSV.
use crate::error::{Error, Result};
use crate::table::{Document, HtmlTable, Row, clean_cell};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use scraper::{ElementRef, Html, Selector};
use std::io::Cursor;
use tracing::debug;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Parses an HTML document into its tables, in document order.
///
/// For each `<table>` the first row holding a `<th>` is the header row and
/// the rows after it are data. Tables without header cells are kept (with an
/// empty header) so table indices match the document.
pub fn load_html(bytes: &[u8]) -> Result<Document> {
    let text = std::str::from_utf8(strip_bom(bytes))
        .map_err(|e| Error::MalformedDocument(format!("html is not utf-8: {}", e)))?;
    let document = Html::parse_document(text);
    let table_selector = Selector::parse("table")
        .map_err(|e| Error::MalformedDocument(format!("selector: {:?}", e)))?;

    let mut tables = Vec::new();
    for table in document.select(&table_selector) {
        let rows = direct_rows(table);
        let header_index = rows
            .iter()
            .position(|r| direct_cells(*r).iter().any(|c| c.value().name() == "th"));

        let html_table = match header_index {
            Some(index) => HtmlTable {
                header: row_text(rows[index]),
                rows: rows[index + 1..].iter().map(|r| row_text(*r)).collect(),
            },
            None => HtmlTable::default(),
        };
        tables.push(html_table);
    }
    debug!(tables = tables.len(), "html document loaded");
    Ok(Document::Tables(tables))
}

/// Parses the first sheet of a workbook (xlsx, xls, ods) or a CSV file into
/// a header-less grid. The format is picked from the leading bytes.
pub fn load_grid(bytes: &[u8]) -> Result<Document> {
    let rows = if is_workbook(bytes) {
        workbook_rows(bytes)?
    } else {
        csv_rows(strip_bom(bytes))?
    };
    debug!(rows = rows.len(), "grid document loaded");
    Ok(Document::Grid(rows))
}

/// Picks [`load_grid`] for workbooks and [`load_html`] for markup, falling
/// back to CSV for anything else.
pub fn load_document(bytes: &[u8]) -> Result<Document> {
    if is_workbook(bytes) || !looks_like_html(bytes) {
        load_grid(bytes)
    } else {
        load_html(bytes)
    }
}

fn is_workbook(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC)
}

fn looks_like_html(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(4096)];
    String::from_utf8_lossy(head).to_ascii_lowercase().contains("<table")
}

fn workbook_rows(bytes: &[u8]) -> Result<Vec<Row>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::MalformedDocument("workbook has no sheets".into()))??;

    Ok(range
        .rows()
        .map(|cells| cells.iter().map(cell_text).collect())
        .collect())
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => clean_cell(s),
        Data::Int(i) => Some(i.to_string()),
        // Whole numbers come back as floats from most sheets
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", *f as i64)),
        other => clean_cell(&other.to_string()),
    }
}

fn csv_rows(bytes: &[u8]) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(clean_cell).collect());
    }
    Ok(rows)
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// `<tr>` children of a table, looking through `thead`/`tbody`/`tfoot` but
/// not into nested tables.
fn direct_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|e| e.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

fn direct_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| matches!(e.value().name(), "td" | "th"))
        .collect()
}

fn row_text(row: ElementRef<'_>) -> Row {
    direct_cells(row)
        .into_iter()
        .map(|cell| clean_cell(&cell.text().collect::<String>()))
        .collect()
}
