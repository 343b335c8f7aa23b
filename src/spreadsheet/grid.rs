/// Rows of cell text, indexed 0-based and row-major exactly as in the worksheet.
///
/// Rows may be ragged and empty rows are kept, so row indices line up with the sheet a person
/// looks at. A cell is `None` when the file stores nothing for it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CellGrid {
    rows: Vec<Vec<Option<String>>>,
}

impl CellGrid {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> CellGrid {
        CellGrid { rows }
    }

    /// Builds a grid from plain text rows, mostly for fixtures.
    pub fn from_rows<I, R, S>(rows: I) -> CellGrid
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|cell| Some(cell.into())).collect())
            .collect();
        CellGrid { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Widest row length
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn row(&self, index: usize) -> Option<&[Option<String>]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<String>]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Text of a cell; `None` when the row or column does not exist or the cell is absent.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// Stores a value, growing the grid as needed.
    pub(crate) fn set(&mut self, row: usize, col: usize, value: String) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, None);
        }
        cells[col] = Some(value);
    }
}
