#![allow(dead_code)]

use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const BIFF_BOF: u16 = 0x0809;
const BIFF_EOF: u16 = 0x000A;
const BIFF_BOUND_SHEET8: u16 = 0x0085;
const BIFF_NUMBER: u16 = 0x0203;
const BIFF_LABEL: u16 = 0x0204;

/// A small rent report laid out the way the facility team keeps it
pub fn rent_report() -> Vec<Vec<&'static str>> {
    vec![
        vec!["Отчёт по аренде"],
        vec!["на 01.03.2024"],
        vec![],
        vec!["Объект недвижимости", "Контрагент", "Договор", "Сумма", "Статус", "Площадь, м2", "Площадь по договору"],
        vec!["Подвал"],
        vec!["Помещение № 1 подвал", "", "", "", "Свободно", "40"],
        vec!["1 этаж"],
        vec!["Помещение № 12а строение 7/1", "ООО «Ромашка»", "1/23", "10000", "В аренде", "25,5", "26"],
        vec!["Помещение № 14", "ИП Иванов", "2/24", "5000", "", "18"],
        vec!["Итого по этажу", "", "", "15000"],
        vec!["2 этаж"],
        vec!["Помещение № 21", "ООО Склад", "3/24", "7000", "Свободно", "30"],
    ]
}

/// `.xlsx` package whose first sheet holds `rows` as inline strings
pub fn xlsx_workbook(rows: &[Vec<&str>]) -> Vec<u8> {
    let mut sheet = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#);
    for (r, row) in rows.iter().enumerate() {
        sheet.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate().filter(|(_, value)| !value.is_empty()) {
            let reference = format!("{}{}", (b'A' + c as u8) as char, r + 1);
            if value.parse::<f64>().is_ok() {
                sheet.push_str(&format!(r#"<c r="{reference}"><v>{value}</v></c>"#));
            } else {
                sheet.push_str(&format!(r#"<c r="{reference}" t="inlineStr"><is><t>{}</t></is></c>"#, escape(value)));
            }
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let parts = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#.to_owned(),
        ),
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Аренда" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_owned(),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_owned(),
        ),
        ("xl/worksheets/sheet1.xml", sheet),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        zip.start_file(name, SimpleFileOptions::default()).expect("start part");
        zip.write_all(content.as_bytes()).expect("write part");
    }
    zip.finish().expect("finish package").into_inner()
}

/// `.xls` compound file whose only worksheet holds `rows`; numeric text becomes NUMBER records
pub fn xls_workbook(rows: &[Vec<&str>]) -> Vec<u8> {
    let stream = workbook_stream(rows);
    let mut ole = cfb::CompoundFile::create(Cursor::new(Vec::new())).expect("create cfb");
    {
        let mut workbook = ole.create_stream("Workbook").expect("Workbook stream");
        workbook.write_all(&stream).expect("write Workbook stream");
    }
    ole.into_inner().into_inner()
}

fn workbook_stream(rows: &[Vec<&str>]) -> Vec<u8> {
    let mut sheet = Vec::new();
    record(&mut sheet, BIFF_BOF, &[0u8; 16]);
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate().filter(|(_, value)| !value.is_empty()) {
            let mut data = Vec::new();
            data.extend_from_slice(&(r as u16).to_le_bytes());
            data.extend_from_slice(&(c as u16).to_le_bytes());
            data.extend_from_slice(&0u16.to_le_bytes());
            match value.parse::<f64>() {
                Ok(number) => {
                    data.extend_from_slice(&number.to_le_bytes());
                    record(&mut sheet, BIFF_NUMBER, &data);
                }
                Err(_) => {
                    data.extend(utf16_string(value, true));
                    record(&mut sheet, BIFF_LABEL, &data);
                }
            }
        }
    }
    record(&mut sheet, BIFF_EOF, &[]);

    let globals = |sheet_offset: u32| {
        let mut out = Vec::new();
        record(&mut out, BIFF_BOF, &[0u8; 16]);
        let mut bound_sheet = sheet_offset.to_le_bytes().to_vec();
        bound_sheet.extend_from_slice(&[0, 0]);
        bound_sheet.extend(utf16_string("Аренда", false));
        record(&mut out, BIFF_BOUND_SHEET8, &bound_sheet);
        record(&mut out, BIFF_EOF, &[]);
        out
    };
    let offset = globals(0).len() as u32;
    let mut stream = globals(offset);
    stream.extend(sheet);
    stream
}

fn record(out: &mut Vec<u8>, kind: u16, data: &[u8]) {
    out.extend_from_slice(&kind.to_le_bytes());
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
}

/// XLUnicodeString (16-bit length) or ShortXLUnicodeString (8-bit length), stored as UTF-16
fn utf16_string(text: &str, long: bool) -> Vec<u8> {
    let units: Vec<u16> = text.encode_utf16().collect();
    let mut bytes = if long {
        (units.len() as u16).to_le_bytes().to_vec()
    } else {
        vec![units.len() as u8]
    };
    bytes.push(0x01);
    bytes.extend(units.iter().flat_map(|unit| unit.to_le_bytes()));
    bytes
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
