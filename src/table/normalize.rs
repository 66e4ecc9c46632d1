use super::Table;

/// Trims `table` to its first contiguous run of named columns.
///
/// Starting at the first column with a header, the first blank header marks
/// the end of the data region: that column and every column after it are
/// dropped, header and rows alike, even if later columns are named and
/// populated.
pub fn normalize(mut table: Table) -> Table {
    let headers = table.headers();
    let Some(first_named) = headers.iter().position(Option::is_some) else {
        return table;
    };
    let first_gap = headers[first_named..]
        .iter()
        .position(Option::is_none)
        .map(|offset| first_named + offset);

    if let Some(cut) = first_gap {
        table.truncate_columns(cut);
    }
    table
}
