use super::{Document, Row, Table};
use crate::error::{Error, Result};

/// Where the header was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TablePosition {
    /// Index of the matching table in an HTML document.
    Table(usize),
    /// Index of the header row in a grid.
    HeaderRow(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedTable {
    pub position: TablePosition,
    pub table: Table,
}

/// Finds the table whose header contains a cell equal to `label`.
///
/// A table that matches but has no data rows is returned as an empty table;
/// only a missing header is an error.
pub fn locate(document: &Document, label: &str) -> Result<LocatedTable> {
    let found = match document {
        Document::Tables(tables) => tables
            .iter()
            .position(|t| contains_label(&t.header, label))
            .map(|index| LocatedTable {
                position: TablePosition::Table(index),
                table: Table::new(tables[index].header.clone(), tables[index].rows.clone()),
            }),
        Document::Grid(rows) => rows
            .iter()
            .position(|row| contains_label(row, label))
            .map(|index| LocatedTable {
                position: TablePosition::HeaderRow(index),
                table: Table::new(rows[index].clone(), rows[index + 1..].to_vec()),
            }),
    };
    found.ok_or_else(|| Error::HeaderNotFound {
        label: label.to_string(),
    })
}

fn contains_label(row: &Row, label: &str) -> bool {
    row.iter().any(|cell| cell.as_deref() == Some(label))
}
