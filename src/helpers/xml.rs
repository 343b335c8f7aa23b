//! XML parsing utilities for the SpreadsheetML parts of an `.xlsx` package.
//! Provides a reader wrapper and helper traits for attribute and text processing.

use crate::error::RoomPlanError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),
}

/// XML reader wrapper configured for spreadsheet parts: lenient end names, empty elements
/// expanded into start/end pairs, and text kept untrimmed.
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event, `None` at end of document
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, RoomPlanError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(RoomPlanError::Xml(error)),
        }
    }
}

/// Attribute lookup on start tags, matched on the local name so that prefixed
/// attributes such as `r:id` are found by `"id"`.
pub(crate) trait XmlNodeHelper<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, RoomPlanError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, RoomPlanError> {
        for attribute in self.attributes() {
            let attribute = attribute?;
            if attribute.key.local_name().as_ref() == name.as_bytes() {
                return Ok(Some(attribute.unescape_value()?));
            }
        }
        Ok(None)
    }
}

/// Helper trait for building text content out of entity and character references
pub(crate) trait XmlTextContextHelper {
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), RoomPlanError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), RoomPlanError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }
        Ok(())
    }
}

/// Drives an [`XmlReader`] to the end of the document, dispatching each event to the given
/// match arms; unmatched events are ignored and `break` leaves the loop early.
#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn attribute_lookup_ignores_prefix() {
        let xml = r#"<sheet name="Лист1" r:id="rId3"/>"#;
        let mut reader = XmlReader::new(Cursor::new(xml.as_bytes()));
        let mut found = None;
        while let Some(event) = reader.next().unwrap() {
            if let Event::Start(start) = event {
                let name = start.get_attribute_value("name").unwrap().map(|v| v.into_owned());
                let id = start.get_attribute_value("id").unwrap().map(|v| v.into_owned());
                found = name.zip(id);
            }
        }
        assert_eq!(found, Some(("Лист1".to_owned(), "rId3".to_owned())));
    }

    #[test]
    fn text_collects_character_references() {
        let xml = "<t>A&amp;B&#1055;&#x44F;</t>";
        let mut reader = XmlReader::new(Cursor::new(xml.as_bytes()));
        let mut text = String::new();
        let result: Result<(), RoomPlanError> = (|| {
            match_xml_events!(reader => {
                Event::Text(event) => text.push_str(&event.xml_content()?),
                Event::GeneralRef(event) => text.push_bytes_ref(&event)?,
            });
            Ok(())
        })();
        result.unwrap();
        assert_eq!(text, "A&BПя");
    }
}
