use crate::rooms::normalize_cell;
use crate::spreadsheet::CellGrid;

/// Only this many leading rows are searched for the header
pub const HEADER_SCAN_ROWS: usize = 20;
/// Header position of the legacy report layout, used when no header is found
pub const DEFAULT_HEADER_ROW: usize = 3;

const HEADER_MARKER: &str = "объект недвиж";

/// Where the column titles are and whether they were actually found there.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HeaderRow {
    pub index: usize,
    pub detected: bool,
}

/// Finds the first row among the leading rows with a cell mentioning the real-estate object
/// column, falling back to [`DEFAULT_HEADER_ROW`].
pub fn locate_header(grid: &CellGrid) -> HeaderRow {
    let detected = grid
        .rows()
        .take(HEADER_SCAN_ROWS)
        .position(|row| row.iter().any(|cell| is_header_cell(normalize_cell(cell.as_deref()))));
    match detected {
        Some(index) => HeaderRow { index, detected: true },
        None => HeaderRow {
            index: DEFAULT_HEADER_ROW,
            detected: false,
        },
    }
}

fn is_header_cell(text: &str) -> bool {
    !text.is_empty() && text.to_lowercase().contains(HEADER_MARKER)
}
