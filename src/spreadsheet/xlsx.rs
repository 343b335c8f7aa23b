use crate::error::RoomPlanError;
use crate::helpers::cfb::is_compound_file;
use crate::helpers::cfb::CompoundFile;
use crate::helpers::reader::SourceReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::match_xml_events;
use crate::spreadsheet::grid::CellGrid;
use crate::spreadsheet::reference::in_bounds;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::reference::MAX_ROWS;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Seek;
use std::io::SeekFrom;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

// Local names of the SpreadsheetML elements that matter here
const TAG_RELATIONSHIP: &[u8] = b"Relationship";
const TAG_SHEET: &[u8] = b"sheet";
const TAG_SHARED_STRING_ITEM: &[u8] = b"si";
const TAG_PHONETIC_TEXT: &[u8] = b"rPh";
const TAG_TEXT: &[u8] = b"t";
const TAG_ROW: &[u8] = b"row";
const TAG_CELL: &[u8] = b"c";
const TAG_INLINE_STRING: &[u8] = b"is";
const TAG_VALUE: &[u8] = b"v";

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELATIONSHIPS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// How the text inside `<v>` is to be read
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ValueKind {
    /// Index into the shared string table
    Shared,
    /// Text taken as-is: numbers, booleans, formula strings, inline strings
    Literal,
}

/// An Excel 2007+ workbook
pub(crate) struct XlsxSpreadsheet {
    name: String,
    zip: ZipArchive<SourceReader>,
    /// Worksheets in workbook order as (name, part path)
    sheets: Vec<(String, String)>,
}

impl XlsxSpreadsheet {
    /// Opens the package and lists its worksheets
    pub(crate) fn open(file_name: &str, mut reader: SourceReader) -> Result<XlsxSpreadsheet, RoomPlanError> {
        if is_password_protected(&mut reader)? {
            Err(SpreadsheetError::PasswordProtected(file_name.to_owned()))?;
        }
        reader.seek(SeekFrom::Start(0))?;

        let mut zip = ZipArchive::new(reader)?;
        let sheets = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::EmptyWorkbook(file_name.to_owned()))?
        }
        Ok(XlsxSpreadsheet {
            name: file_name.to_owned(),
            zip,
            sheets,
        })
    }

    fn load_shared_strings(&mut self) -> Result<Vec<String>, RoomPlanError> {
        let mut shared_strings = Vec::<String>::new();
        let mut reader = match xml_part(&mut self.zip, SHARED_STRINGS_PART)? {
            Some(reader) => reader,
            None => return Ok(shared_strings),
        };
        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == TAG_SHARED_STRING_ITEM => {
                let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
                shared_strings.push(string);
            }
        });
        Ok(shared_strings)
    }
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    fn read_first_sheet(&mut self) -> Result<CellGrid, RoomPlanError> {
        let zip_path = match self.sheets.first() {
            Some((_, zip_path)) => zip_path.to_owned(),
            None => Err(SpreadsheetError::EmptyWorkbook(self.name.to_owned()))?,
        };
        let shared_strings = self.load_shared_strings()?;

        let mut grid = CellGrid::default();
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = ValueKind::Literal;
        let mut value = String::new();
        let mut reader = xml_part(&mut self.zip, &zip_path)?
            .ok_or_else(|| SpreadsheetError::MissingPart(zip_path.to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == TAG_ROW => {
                if let Some(r) = event.get_attribute_value("r")? {
                    if let Ok(index) = r.parse::<usize>() {
                        if index > MAX_ROWS {
                            Err(SpreadsheetError::OutOfRange(format!("row {r}")))?
                        }
                        row_count = index.saturating_sub(1);
                    }
                }
                col_count = 0;
            }
            Event::End(event) if event.local_name().as_ref() == TAG_ROW => {
                row_count += 1;
                col_count = 0;
            }
            Event::Start(event) if event.local_name().as_ref() == TAG_CELL => {
                let reference = event.get_attribute_value("r")?;
                (row, col) = reference
                    .as_deref()
                    .and_then(reference_to_index)
                    .unwrap_or((row_count, col_count));
                if !in_bounds(row, col) {
                    let reference = reference.map(|r| r.into_owned()).unwrap_or_default();
                    Err(SpreadsheetError::OutOfRange(reference))?
                }
                col_count = col + 1;
                kind = match event.get_attribute_value("t")?.as_deref() {
                    Some("s") => ValueKind::Shared,
                    _ => ValueKind::Literal,
                };
                value.clear();
            }
            Event::Start(event) if event.local_name().as_ref() == TAG_INLINE_STRING => {
                kind = ValueKind::Literal;
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if event.local_name().as_ref() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if event.local_name().as_ref() == TAG_CELL => {
                let text = match kind {
                    ValueKind::Shared => value
                        .trim()
                        .parse::<usize>()
                        .ok()
                        .and_then(|index| shared_strings.get(index))
                        .cloned(),
                    ValueKind::Literal => Some(std::mem::take(&mut value)),
                };
                if let Some(text) = text.filter(|text| !text.is_empty()) {
                    grid.set(row, col, text);
                }
                value.clear();
            }
        });
        Ok(grid)
    }
}

/// Lists worksheets from `xl/workbook.xml`, resolving each `r:id` through the relationships part
fn load_workbook(zip: &mut ZipArchive<SourceReader>) -> Result<Vec<(String, String)>, RoomPlanError> {
    let relationships = load_relationships(zip)?;
    let mut reader = xml_part(zip, WORKBOOK_PART)?
        .ok_or_else(|| SpreadsheetError::MissingPart(WORKBOOK_PART.to_owned()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_SHEET => {
            let name = event.get_attribute_value("name")?;
            let id = event.get_attribute_value("id")?;
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    sheets.push((name.into_owned(), path.to_owned()));
                }
            }
        }
    });
    Ok(sheets)
}

/// Maps relationship ids to worksheet part paths
fn load_relationships(zip: &mut ZipArchive<SourceReader>) -> Result<HashMap<String, String>, RoomPlanError> {
    let mut reader = xml_part(zip, WORKBOOK_RELATIONSHIPS_PART)?
        .ok_or_else(|| SpreadsheetError::MissingPart(WORKBOOK_RELATIONSHIPS_PART.to_owned()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.into_owned(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Opens a package part for XML reading. Names match case-insensitively and either slash works,
/// since some writers emit `xl\worksheets\Sheet1.xml`.
fn xml_part<'a>(
    zip: &'a mut ZipArchive<SourceReader>,
    name: &str,
) -> Result<Option<XmlReader<BufReader<ZipFile<'a, SourceReader>>>>, RoomPlanError> {
    let wanted = name.replace('\\', "/");
    let Some(stored) = zip
        .file_names()
        .find(|stored| stored.replace('\\', "/").eq_ignore_ascii_case(&wanted))
        .map(str::to_owned)
    else {
        return Ok(None);
    };
    match zip.by_name(&stored) {
        Ok(file) => Ok(Some(XmlReader::new(BufReader::new(file)))),
        Err(ZipError::FileNotFound) => Ok(None),
        Err(error) => Err(error)?,
    }
}

/// Relationship targets are relative to `xl/` unless they start with `/`
fn to_zip_path(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_owned()
    } else if target.starts_with("xl/") {
        target.to_owned()
    } else {
        format!("xl/{target}")
    }
}

/// Encrypted packages are compound files holding an `EncryptedPackage` stream
fn is_password_protected(reader: &mut SourceReader) -> Result<bool, RoomPlanError> {
    if !is_compound_file(reader)? {
        return Ok(false);
    }
    let protected = CompoundFile::open(reader)
        .map(|cfb| cfb.exists("EncryptedPackage"))
        .unwrap_or(false);
    Ok(protected)
}

/// Collects the text of an element up to `end_tag`, skipping phonetic runs.
/// With `is_text_content` every text node counts, otherwise only `<t>` children.
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: &[u8],
    is_text_content: bool,
) -> Result<String, RoomPlanError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.local_name().as_ref() == end_tag => break,
        Event::Start(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.local_name().as_ref() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.local_name().as_ref() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn package(sheet: &str, shared_strings: Option<&str>) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        let mut parts = vec![
            (
                WORKBOOK_PART,
                r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="План" sheetId="1" r:id="rId1"/><sheet name="Второй" sheetId="2" r:id="rId2"/></sheets></workbook>"#.to_owned(),
            ),
            (
                WORKBOOK_RELATIONSHIPS_PART,
                r#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/></Relationships>"#.to_owned(),
            ),
            ("xl/worksheets/sheet1.xml", sheet.to_owned()),
            ("xl/worksheets/sheet2.xml", "<worksheet><sheetData/></worksheet>".to_owned()),
        ];
        if let Some(shared_strings) = shared_strings {
            parts.push((SHARED_STRINGS_PART, shared_strings.to_owned()));
        }
        for (name, content) in parts {
            zip.start_file(name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn read(bytes: Vec<u8>) -> CellGrid {
        let mut spreadsheet = XlsxSpreadsheet::open("test.xlsx", SourceReader::from_bytes(bytes)).unwrap();
        assert_eq!(spreadsheet.sheet_names(), vec!["План", "Второй"]);
        spreadsheet.read_first_sheet().unwrap()
    }

    #[test]
    fn reads_shared_inline_and_numeric_cells() {
        let shared = r#"<sst><si><t>Объект недвижимости</t></si><si><r><t>№ </t></r><r><t>12</t></r><rPh><t>ignored</t></rPh></si></sst>"#;
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" t="inlineStr"><is><t>Арендатор</t></is></c></row>
            <row r="3"><c r="A3" t="s"><v>1</v></c><c r="B3"><v>25.5</v></c><c r="C3" t="str"><f>B3*2</f><v>51</v></c></row>
        </sheetData></worksheet>"#;
        let grid = read(package(sheet, Some(shared)));

        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.cell(0, 0), Some("Объект недвижимости"));
        assert_eq!(grid.cell(0, 1), None);
        assert_eq!(grid.cell(0, 2), Some("Арендатор"));
        assert_eq!(grid.row(1), Some(&[][..]));
        assert_eq!(grid.cell(2, 0), Some("№ 12"));
        assert_eq!(grid.cell(2, 1), Some("25.5"));
        assert_eq!(grid.cell(2, 2), Some("51"));
    }

    #[test]
    fn cells_without_references_follow_row_order() {
        let sheet = r#"<worksheet><sheetData><row><c t="inlineStr"><is><t>a</t></is></c><c><v>1</v></c></row><row><c><v>2</v></c></row></sheetData></worksheet>"#;
        let grid = read(package(sheet, None));
        assert_eq!(grid, CellGrid::from_rows([vec!["a", "1"], vec!["2"]]));
    }

    fn read_err(sheet: &str) -> RoomPlanError {
        let mut spreadsheet = XlsxSpreadsheet::open("test.xlsx", SourceReader::from_bytes(package(sheet, None))).unwrap();
        spreadsheet.read_first_sheet().err().unwrap()
    }

    #[test]
    fn references_beyond_the_sheet_are_rejected() {
        let error = read_err(r#"<worksheet><sheetData><row><c r="ZZZZZZZZZZ1"><v>1</v></c></row></sheetData></worksheet>"#);
        assert!(matches!(error, RoomPlanError::Spreadsheet(SpreadsheetError::OutOfRange(ref r)) if r == "ZZZZZZZZZZ1"));

        let error = read_err(r#"<worksheet><sheetData><row><c r="A99999999999"><v>1</v></c></row></sheetData></worksheet>"#);
        assert!(matches!(error, RoomPlanError::Spreadsheet(SpreadsheetError::OutOfRange(_))));

        let error = read_err(r#"<worksheet><sheetData><row r="99999999999"><c><v>1</v></c></row></sheetData></worksheet>"#);
        assert!(matches!(error, RoomPlanError::Spreadsheet(SpreadsheetError::OutOfRange(ref r)) if r == "row 99999999999"));
    }

    #[test]
    fn last_cell_of_the_sheet_is_accepted() {
        let sheet = r#"<worksheet><sheetData><row r="1048576"><c r="B1048576"><v>7</v></c></row></sheetData></worksheet>"#;
        let grid = read(package(sheet, None));
        assert_eq!(grid.row_count(), 1_048_576);
        assert_eq!(grid.cell(1_048_575, 1), Some("7"));
    }

    #[test]
    fn missing_workbook_part_is_reported() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("hello.txt", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"hi").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let error = XlsxSpreadsheet::open("test.xlsx", SourceReader::from_bytes(bytes)).err().unwrap();
        assert!(matches!(error, RoomPlanError::Spreadsheet(SpreadsheetError::MissingPart(_))));
    }

    #[test]
    fn part_names_ignore_case_and_slashes() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("XL\\Workbook.xml", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"<workbook/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let mut zip = ZipArchive::new(SourceReader::from_bytes(bytes)).unwrap();
        assert!(xml_part(&mut zip, WORKBOOK_PART).unwrap().is_some());
        assert!(xml_part(&mut zip, SHARED_STRINGS_PART).unwrap().is_none());
    }

    #[test]
    fn normalizes_relationship_targets() {
        assert_eq!(to_zip_path("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("/xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
    }
}
