//! # Spreadsheet Decoding Module
//!
//! Reads the first worksheet of an uploaded Excel workbook into a [`CellGrid`] of plain text.
//! Two container formats are understood:
//!
//! - `.xlsx`: SpreadsheetML parts inside a ZIP package
//! - `.xls`: BIFF8 records inside an OLE compound file
//!
//! Cell values are kept as the text stored in the file: numbers are not reformatted, dates stay
//! serial numbers, formulas contribute their cached result. Interpreting that text is the job of
//! the room extractor.
pub mod grid;
pub mod html;
pub(crate) mod reference;
pub(crate) mod xls;
pub(crate) mod xlsx;

pub use grid::CellGrid;

use crate::error::ErrorContext;
use crate::error::RoomPlanError;
use crate::helpers::reader::SourceReader;
use crate::spreadsheet::xls::XlsSpreadsheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::path::Path;
use thiserror::Error;

/// Errors raised while opening a workbook, before any cell is read.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// File extension is neither `xls` nor `xlsx`
    #[error("Cannot detect spreadsheet format for '{0}'")]
    UnsupportedFormat(String),

    /// Workbook is encrypted and cannot be read without a password
    #[error("Spreadsheet '{0}' is password protected")]
    PasswordProtected(String),

    /// Workbook has no worksheet
    #[error("Spreadsheet '{0}' contains no worksheet")]
    EmptyWorkbook(String),

    /// A part the package structure refers to is missing
    #[error("Spreadsheet part '{0}' is missing")]
    MissingPart(String),

    /// A row or cell reference lies beyond the last row or column Excel allows
    #[error("Cell reference '{0}' is outside the worksheet")]
    OutOfRange(String),
}

/// Container formats accepted for upload
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WorkbookFormat {
    /// Excel 97-2003 binary workbook
    Xls,
    /// Excel 2007+ workbook
    Xlsx,
}

impl WorkbookFormat {
    /// Detects the format from the file extension, case-insensitively.
    pub fn from_file_name(file_name: &str) -> Option<WorkbookFormat> {
        let extension = Path::new(file_name).extension()?.to_str()?;
        match extension.to_ascii_lowercase().as_str() {
            "xls" => Some(WorkbookFormat::Xls),
            "xlsx" => Some(WorkbookFormat::Xlsx),
            _ => None,
        }
    }

    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Xls => "xls",
            Self::Xlsx => "xlsx",
        }
    }
}

/// Common interface of the two workbook readers.
pub(crate) trait Spreadsheet {
    /// Returns the file name used in error messages
    fn name(&self) -> String;

    /// Names of the worksheets in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Reads the first worksheet into a dense grid
    fn read_first_sheet(&mut self) -> Result<CellGrid, RoomPlanError>;
}

/// Reads the first worksheet of a workbook on disk.
pub fn read_grid(path: &Path) -> Result<CellGrid, RoomPlanError> {
    let file_name = path.to_string_lossy().into_owned();
    let format = WorkbookFormat::from_file_name(&file_name)
        .ok_or_else(|| SpreadsheetError::UnsupportedFormat(file_name.clone()))?;
    let reader = SourceReader::open(path)?;
    decode(format, &file_name, reader)
}

/// Reads the first worksheet of a workbook received in memory; `file_name` selects the format.
pub fn read_grid_from_bytes(file_name: &str, bytes: Vec<u8>) -> Result<CellGrid, RoomPlanError> {
    let format = WorkbookFormat::from_file_name(file_name)
        .ok_or_else(|| SpreadsheetError::UnsupportedFormat(file_name.to_owned()))?;
    decode(format, file_name, SourceReader::from_bytes(bytes))
}

fn decode(format: WorkbookFormat, file_name: &str, reader: SourceReader) -> Result<CellGrid, RoomPlanError> {
    let mut spreadsheet: Box<dyn Spreadsheet> = match format {
        WorkbookFormat::Xls => Box::new(XlsSpreadsheet::open(file_name, reader)?),
        WorkbookFormat::Xlsx => Box::new(XlsxSpreadsheet::open(file_name, reader)?),
    };
    log::debug!(
        "Opened {} workbook '{}' with sheets {:?}",
        format.extension(),
        spreadsheet.name(),
        spreadsheet.sheet_names()
    );
    let grid = spreadsheet
        .read_first_sheet()
        .context(format!("Cannot read first sheet of '{}'", file_name))?;
    log::debug!("Decoded {} rows from '{}'", grid.row_count(), file_name);
    Ok(grid)
}
