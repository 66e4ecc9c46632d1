//! In-memory tabular documents and the heuristics that find data in them.
//!
//! Loaders produce a [`Document`]; a [`LayoutStrategy`] turns it into one
//! clean [`Table`] keyed by a target header label. The default strategy,
//! [`SniffingLayout`], finds the header by exact label match and trims the
//! columns to the first contiguous run of named headers.
pub mod locate;
pub mod normalize;

pub use locate::{LocatedTable, TablePosition, locate};
pub use normalize::normalize;

use crate::error::Result;
use tracing::debug;

/// One row of cells. `None` is a blank cell.
pub type Row = Vec<Option<String>>;

/// A `<table>` from an HTML document: its header row and its data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlTable {
    pub header: Row,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    /// Labeled tables, in document order (HTML exports).
    Tables(Vec<HtmlTable>),
    /// Header-less grid of rows (first spreadsheet sheet).
    Grid(Vec<Row>),
}

/// A table with a resolved header row. Every row is exactly as wide as the
/// header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Row,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(headers: Row, rows: Vec<Row>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[Option<String>] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first column whose header equals `label` exactly.
    pub fn column(&self, label: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.as_deref() == Some(label))
    }

    /// Drops column `index` and everything after it, header and rows alike.
    pub fn truncate_columns(&mut self, index: usize) {
        self.headers.truncate(index);
        for row in &mut self.rows {
            row.truncate(index);
        }
    }
}

/// Strategy for pulling one data table out of a document.
///
/// Alternate document shapes get their own implementation; aggregation only
/// ever sees the resulting [`Table`].
pub trait LayoutStrategy {
    fn locate(&self, document: &Document, label: &str) -> Result<LocatedTable>;

    fn normalize(&self, table: Table) -> Table;

    fn extract(&self, document: &Document, label: &str) -> Result<Table> {
        let located = self.locate(document, label)?;
        let width = located.table.width();
        let table = self.normalize(located.table);
        debug!(
            label,
            position = ?located.position,
            columns = table.width(),
            dropped = width.saturating_sub(table.width()),
            rows = table.len(),
            "table located"
        );
        Ok(table)
    }
}

/// Exact-label header sniffing followed by contiguous-column trimming.
#[derive(Debug, Clone, Copy, Default)]
pub struct SniffingLayout;

impl LayoutStrategy for SniffingLayout {
    fn locate(&self, document: &Document, label: &str) -> Result<LocatedTable> {
        locate(document, label)
    }

    fn normalize(&self, table: Table) -> Table {
        normalize(table)
    }
}

/// Trims and blanks a raw cell value.
pub(crate) fn clean_cell(raw: &str) -> Option<String> {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() { None } else { Some(text) }
}
