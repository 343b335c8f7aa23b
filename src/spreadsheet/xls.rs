use crate::error::RoomPlanError;
use crate::helpers::biff8::Biff8Reader;
use crate::helpers::cfb::CompoundFile;
use crate::helpers::reader::SourceReader;
use crate::match_biff8_record;
use crate::spreadsheet::grid::CellGrid;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use thiserror::Error;

// BIFF8 record types
const FORMULA: u16 = 6;
const EOF: u16 = 10;
const FILE_PASS: u16 = 47;
const CODE_PAGE: u16 = 66;
const BOUND_SHEET8: u16 = 133;
const MUL_RK: u16 = 189;
const SST: u16 = 252;
const LABEL_SST: u16 = 253;
const NUMBER: u16 = 515;
const LABEL: u16 = 516;
const BOOL_ERR: u16 = 517;
const STRING: u16 = 519;
const ARRAY: u16 = 545;
const TABLE: u16 = 566;
const RK: u16 = 638;
const SHR_FMLA: u16 = 1212;
const BOF: u16 = 2057;

const CODE_PAGE_UTF16: u16 = 1200;
const SHEET_TYPE_WORKSHEET: u8 = 0;

/// Errors specific to the BIFF8 cell records
#[derive(Error, Debug)]
pub enum XlsError {
    #[error("Invalid Formula value '{0:#018x}'")]
    FormulaValueError(u64),

    #[error("Shared string '{0}' is out of range")]
    SharedStringIndexError(usize),
}

/// An Excel 97-2003 workbook
pub(crate) struct XlsSpreadsheet {
    name: String,
    reader: Biff8Reader,
    shared_strings: Vec<String>,
    /// Sheets in workbook order as (name, BOF position, sheet type)
    sheets: Vec<(String, usize, u8)>,
}

impl XlsSpreadsheet {
    /// Opens the compound file and reads the workbook globals
    pub(crate) fn open(file_name: &str, mut source: SourceReader) -> Result<XlsSpreadsheet, RoomPlanError> {
        let cfb = CompoundFile::open(&mut source)?;
        // Excel 5 files name the stream "Book"
        let stream = match cfb.read("Workbook")? {
            Some(stream) => stream,
            None => cfb
                .read("Book")?
                .ok_or_else(|| SpreadsheetError::EmptyWorkbook(file_name.to_owned()))?,
        };
        XlsSpreadsheet::parse(file_name, stream)
    }

    /// Reads the globals substream: encryption, code page, shared strings and sheet list
    fn parse(file_name: &str, stream: Vec<u8>) -> Result<XlsSpreadsheet, RoomPlanError> {
        let mut reader = Biff8Reader::new(stream);
        let mut shared_strings = Vec::new();
        let mut sheets: Vec<(String, usize, u8)> = Vec::new();
        match_biff8_record!(reader => {
            EOF => break,
            FILE_PASS => Err(SpreadsheetError::PasswordProtected(file_name.to_owned()))?,
            CODE_PAGE => {
                let code_page = reader.read_u16()?;
                if code_page != CODE_PAGE_UTF16 {
                    match codepage::to_encoding(code_page) {
                        Some(encoding) => reader.encoding = Some(encoding),
                        None => log::warn!("Unknown code page {} in '{}', assuming Latin-1", code_page, file_name),
                    }
                }
            }
            SST => shared_strings = load_shared_strings(&mut reader)?,
            BOUND_SHEET8 => {
                let pointer = reader.read_usize()?;
                reader.skip(1)?; // hsState
                let kind = reader.read_u8()?;
                let sheet_name = reader.read_short_xl_unicode_string()?;
                sheets.push((sheet_name, pointer, kind));
            }
        });
        if sheets.is_empty() {
            Err(SpreadsheetError::EmptyWorkbook(file_name.to_owned()))?
        }
        Ok(XlsSpreadsheet {
            name: file_name.to_owned(),
            reader,
            shared_strings,
            sheets,
        })
    }

    fn read_cell(&mut self, tag: u16) -> Result<Option<String>, RoomPlanError> {
        let reader = &mut self.reader;
        reader.skip(2)?; // ixfe
        let value = match tag {
            NUMBER => reader.read_f64()?.to_string(),
            RK => reader.read_rk_number()?,
            LABEL => reader.read_xl_unicode_string()?,
            LABEL_SST => {
                let index = reader.read_usize()?;
                self.shared_strings
                    .get(index)
                    .cloned()
                    .ok_or(XlsError::SharedStringIndexError(index))?
            }
            BOOL_ERR => {
                let value = reader.read_u8()?;
                let is_error = reader.read_u8()? != 0;
                if is_error { to_error_value(value).to_owned() } else { value.to_string() }
            }
            _ => return read_formula_result(reader),
        };
        Ok(Some(value))
    }
}

impl Spreadsheet for XlsSpreadsheet {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _, _)| name.to_owned()).collect()
    }

    /// Reads the first worksheet; chart and macro sheets listed before it are passed over
    fn read_first_sheet(&mut self) -> Result<CellGrid, RoomPlanError> {
        let pointer = self
            .sheets
            .iter()
            .find(|(_, _, kind)| *kind == SHEET_TYPE_WORKSHEET)
            .or_else(|| self.sheets.first())
            .map(|(_, pointer, _)| *pointer)
            .ok_or_else(|| SpreadsheetError::EmptyWorkbook(self.name.to_owned()))?;

        let mut grid = CellGrid::default();
        self.reader.goto(pointer);
        self.reader.next()?; // BOF
        while let Some(tag) = self.reader.next()? {
            match tag {
                BOF | EOF => break,
                MUL_RK => {
                    let row = self.reader.read_u16()? as usize;
                    let col_lower_bound = self.reader.read_u16()? as usize;
                    let col_upper_bound = self.reader.get_u16_back(2)? as usize;
                    for col in col_lower_bound..=col_upper_bound {
                        self.reader.skip(2)?; // ixfe
                        let value = self.reader.read_rk_number()?;
                        grid.set(row, col, value);
                    }
                }
                BOOL_ERR | NUMBER | RK | LABEL_SST | LABEL | FORMULA => {
                    let row = self.reader.read_u16()? as usize;
                    let col = self.reader.read_u16()? as usize;
                    if let Some(value) = self.read_cell(tag)?.filter(|value| !value.is_empty()) {
                        grid.set(row, col, value);
                    }
                }
                _ => (),
            }
        }
        Ok(grid)
    }
}

fn load_shared_strings(reader: &mut Biff8Reader) -> Result<Vec<String>, RoomPlanError> {
    reader.skip(4)?; // cstTotal
    let count = reader.read_usize()?;
    let mut shared_strings: Vec<String> = Vec::with_capacity(count.min(65536));
    for _ in 0..count {
        shared_strings.push(reader.read_xl_unicode_rich_extended_string()?);
    }
    Ok(shared_strings)
}

/// Cached result of a FORMULA record. String results live in the STRING record that follows,
/// possibly after SHRFMLA, ARRAY or TABLE records.
fn read_formula_result(reader: &mut Biff8Reader) -> Result<Option<String>, RoomPlanError> {
    let formula = reader.read_u64()?;
    let is_number = (formula & 0xFFFF_0000_0000_0000) != 0xFFFF_0000_0000_0000;
    if is_number {
        return Ok(Some(f64::from_bits(formula).to_string()));
    }
    let value = match formula & 0xFF {
        0 => {
            let mut value = None;
            while let Some(kind) = reader.next()? {
                match kind {
                    SHR_FMLA | ARRAY | TABLE => continue,
                    STRING => value = Some(reader.read_xl_unicode_string()?),
                    _ => (),
                }
                break;
            }
            Some(value.ok_or(XlsError::FormulaValueError(formula))?)
        }
        1 => Some(if (formula & 0xFF_0000) > 0 { "1" } else { "0" }.to_owned()),
        2 => Some(to_error_value(((formula >> 16) & 0xFF) as u8).to_owned()),
        3 => None,
        _ => Err(XlsError::FormulaValueError(formula))?,
    };
    Ok(value)
}

fn to_error_value(value: u8) -> &'static str {
    match value {
        0x00 => "#NULL!",
        0x07 => "#DIV/0!",
        0x0F => "#VALUE!",
        0x17 => "#REF!",
        0x1D => "#NAME?",
        0x24 => "#NUM!",
        0x2A => "#N/A",
        0x2B => "#GETTING_DATA",
        _ => "#ERROR!",
    }
}
