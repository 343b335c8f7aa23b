//! Microsoft Office Binary Interchange File Format (BIFF8)
//! Record reader for the `Workbook` stream of Excel 97-2003 files.
//! Records longer than 8224 bytes are split into CONTINUE records; the reader presents a record
//! and its continuations as one logical payload.

use crate::error::RoomPlanError;
use crate::helpers::bytes::to_f64;
use crate::helpers::bytes::to_u16;
use crate::helpers::bytes::to_u32;
use crate::helpers::bytes::to_u64;
use crate::helpers::bytes::to_usize;
use encoding_rs::Encoding;
use thiserror::Error;

const CONTINUE: u16 = 60;

/// Errors specific to BIFF8 format parsing
#[derive(Error, Debug)]
pub enum Biff8Error {
    #[error("Fewer than {0} bytes remaining")]
    NoEnoughDataError(usize),
}

/// Reader for BIFF8 records
pub(crate) struct Biff8Reader {
    /// Legacy code page for 8-bit strings; `None` means Latin-1 as BIFF8 prescribes
    pub(crate) encoding: Option<&'static Encoding>,
    buffer: Vec<u8>,
    pointer: usize,              // Next record position in buffer
    chunks: Vec<(usize, usize)>, // Current record chunks (start, end)
    index: usize,                // Current chunk index
    offset: usize,               // Offset within current chunk
}

impl Biff8Reader {
    pub(crate) fn new(data: Vec<u8>) -> Biff8Reader {
        Biff8Reader {
            encoding: None,
            buffer: data,
            pointer: 0,
            chunks: Vec::new(),
            index: 0,
            offset: 0,
        }
    }

    /// Reads the next record type and prepares its payload (including continuations)
    /// Returns None when no more records are available
    pub(crate) fn next(&mut self) -> Result<Option<u16>, RoomPlanError> {
        if self.pointer + 4 > self.buffer.len() {
            return Ok(None);
        }
        self.index = 0;
        self.offset = 0;
        self.chunks.clear();

        let kind = self.get_u16_at(self.pointer)?;
        self.push_chunk()?;
        while self.pointer + 4 <= self.buffer.len() && self.get_u16_at(self.pointer)? == CONTINUE {
            self.push_chunk()?;
        }
        Ok(Some(kind))
    }

    fn push_chunk(&mut self) -> Result<(), RoomPlanError> {
        let size = self.get_u16_at(self.pointer + 2)? as usize;
        let lower = self.pointer + 4;
        let upper = (lower + size).min(self.buffer.len());
        self.pointer = lower + size;
        self.chunks.push((lower, upper));
        Ok(())
    }

    /// Moves to an absolute stream position, e.g. a sheet's BOF from BOUNDSHEET8
    pub(crate) fn goto(&mut self, pointer: usize) {
        self.pointer = pointer;
        self.chunks.clear();
    }

    /// Reads exactly `length` bytes, returning an error if insufficient data
    fn read_extract(&mut self, length: usize) -> Result<&[u8], RoomPlanError> {
        let (source, target) = self.advance(length);
        if target - source == length {
            Ok(&self.buffer[source..target])
        } else {
            Err(Biff8Error::NoEnoughDataError(length))?
        }
    }

    /// Consumes up to `length` bytes without crossing into the next chunk
    fn advance(&mut self, length: usize) -> (usize, usize) {
        if let Some((lower, upper)) = self.chunks.get(self.index).copied() {
            let source = upper.min(lower + self.offset);
            let target = upper.min(source + length);
            if source < upper {
                if target == upper {
                    self.index += 1;
                    self.offset = 0;
                } else {
                    self.offset += target - source;
                }
                return (source, target);
            }
        }
        (0, 0)
    }

    pub(crate) fn skip(&mut self, length: usize) -> Result<(), RoomPlanError> {
        if length > 0 {
            self.read_extract(length)?;
        }
        Ok(())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, RoomPlanError> {
        self.read_extract(1).map(|data| data[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, RoomPlanError> {
        self.read_extract(2).map(to_u16)
    }

    /// Gets a 16-bit value counted back from the end of the current record
    pub(crate) fn get_u16_back(&self, offset: usize) -> Result<u16, RoomPlanError> {
        let mut offset = offset;
        for (lower, upper) in self.chunks.iter().rev() {
            if *lower + offset <= *upper {
                return self.get_u16_at(*upper - offset);
            }
            offset -= *upper - *lower;
        }
        Err(Biff8Error::NoEnoughDataError(2))?
    }

    fn get_u16_at(&self, index: usize) -> Result<u16, RoomPlanError> {
        if index + 2 <= self.buffer.len() {
            Ok(to_u16(&self.buffer[index..index + 2]))
        } else {
            Err(Biff8Error::NoEnoughDataError(2))?
        }
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, RoomPlanError> {
        self.read_extract(4).map(to_u32)
    }

    pub(crate) fn read_usize(&mut self) -> Result<usize, RoomPlanError> {
        self.read_extract(4).map(to_usize)
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, RoomPlanError> {
        self.read_extract(8).map(to_u64)
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64, RoomPlanError> {
        self.read_extract(8).map(to_f64)
    }

    /// Reads an RK number: a 30-bit integer or the high bits of a double, optionally scaled by 1/100
    pub(crate) fn read_rk_number(&mut self) -> Result<String, RoomPlanError> {
        let value = self.read_u32()?;
        let is_percentage = (value & 0x01) != 0;
        let is_integer = (value & 0x02) != 0;

        if is_integer && !is_percentage {
            return Ok(((value as i32) >> 2).to_string());
        }
        let mut number = if is_integer {
            ((value as i32) >> 2) as f64
        } else {
            f64::from_bits(((value & 0xFFFF_FFFC) as u64) << 32)
        };
        if is_percentage {
            number /= 100.0;
        }
        Ok(number.to_string())
    }

    /// ShortXLUnicodeString: 1-byte character count
    pub(crate) fn read_short_xl_unicode_string(&mut self) -> Result<String, RoomPlanError> {
        let mut string = String::new();
        let chars = self.read_u8()? as usize;
        let flag = self.read_u8()?;
        self.read_chars_into(chars, flag, &mut string)?;
        Ok(string)
    }

    /// XLUnicodeString: 2-byte character count
    pub(crate) fn read_xl_unicode_string(&mut self) -> Result<String, RoomPlanError> {
        let mut string = String::new();
        let chars = self.read_u16()? as usize;
        let flag = self.read_u8()?;
        self.read_chars_into(chars, flag, &mut string)?;
        Ok(string)
    }

    /// XLUnicodeRichExtendedString as stored in the SST. Characters may continue into the next
    /// CONTINUE record, which restarts with its own option byte; formatting runs and phonetic
    /// data follow the last character and are skipped.
    pub(crate) fn read_xl_unicode_rich_extended_string(&mut self) -> Result<String, RoomPlanError> {
        let mut string = String::new();
        let mut remaining = self.read_u16()? as usize;
        let flag = self.read_u8()?;
        let rich_runs = if (flag & 0x8) > 0 { self.read_u16()? as usize } else { 0 };
        let phonetic_size = if (flag & 0x4) > 0 { self.read_usize()? } else { 0 };
        remaining -= self.read_chars_into(remaining, flag, &mut string)?;
        while remaining > 0 {
            let flag = self.read_u8()?;
            let chars = self.read_chars_into(remaining, flag, &mut string)?;
            if chars == 0 {
                Err(Biff8Error::NoEnoughDataError(remaining))?;
            }
            remaining -= chars;
        }
        self.skip(4 * rich_runs)?;
        self.skip(phonetic_size)?;
        Ok(string)
    }

    /// Decodes up to `chars` characters from the current chunk, returning how many were read
    fn read_chars_into(&mut self, chars: usize, flag: u8, content: &mut String) -> Result<usize, RoomPlanError> {
        let is_high_byte = (flag & 0x1) > 0;
        let expected = if is_high_byte { chars << 1 } else { chars };
        let encoding = self.encoding;
        let (source, target) = self.advance(expected);
        let bytes = &self.buffer[source..target];
        if is_high_byte {
            let (string, _, _) = encoding_rs::UTF_16LE.decode(bytes);
            content.push_str(&string);
            Ok(bytes.len() >> 1)
        } else {
            match encoding {
                Some(encoding) => content.push_str(&encoding.decode(bytes).0),
                None => content.extend(bytes.iter().map(|byte| *byte as char)),
            }
            Ok(bytes.len())
        }
    }
}

#[macro_export]
macro_rules! match_biff8_record {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(kind) = $reader.next()? {
            match kind {
                $($arms)*
                _ => (),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(out: &mut Vec<u8>, kind: u16, data: &[u8]) {
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(&(data.len() as u16).to_le_bytes());
        out.extend_from_slice(data);
    }

    #[test]
    fn reads_records_in_order() {
        let mut stream = Vec::new();
        record(&mut stream, 0x0809, &[0u8; 16]);
        record(&mut stream, 0x000A, &[]);
        let mut reader = Biff8Reader::new(stream);
        assert_eq!(reader.next().unwrap(), Some(0x0809));
        assert_eq!(reader.next().unwrap(), Some(0x000A));
        assert_eq!(reader.next().unwrap(), None);
    }

    #[test]
    fn joins_string_split_by_continue() {
        // "№ 12" as UTF-16, first two characters in the record, the rest in a CONTINUE
        let text: Vec<u16> = "№ 12".encode_utf16().collect();
        let mut payload = Vec::new();
        payload.extend_from_slice(&(text.len() as u16).to_le_bytes());
        payload.push(0x01);
        payload.extend(text[..2].iter().flat_map(|unit| unit.to_le_bytes()));
        let mut continuation = vec![0x00];
        continuation.extend(text[2..].iter().map(|unit| *unit as u8));

        let mut stream = Vec::new();
        record(&mut stream, 0x00FC, &payload);
        record(&mut stream, CONTINUE, &continuation);
        let mut reader = Biff8Reader::new(stream);
        assert_eq!(reader.next().unwrap(), Some(0x00FC));
        assert_eq!(reader.read_xl_unicode_rich_extended_string().unwrap(), "№ 12");
        assert_eq!(reader.next().unwrap(), None);
    }

    #[test]
    fn decodes_rk_numbers() {
        let mut stream = Vec::new();
        let integer = (150u32 << 2) | 0x02;
        let percent = (150u32 << 2) | 0x03;
        let double = ((2.5f64.to_bits() >> 32) as u32) & 0xFFFF_FFFC;
        let mut payload = Vec::new();
        for word in [integer, percent, double] {
            payload.extend_from_slice(&word.to_le_bytes());
        }
        record(&mut stream, 0x027E, &payload);
        let mut reader = Biff8Reader::new(stream);
        reader.next().unwrap();
        assert_eq!(reader.read_rk_number().unwrap(), "150");
        assert_eq!(reader.read_rk_number().unwrap(), "1.5");
        assert_eq!(reader.read_rk_number().unwrap(), "2.5");
    }

    #[test]
    fn short_payload_is_an_error() {
        let mut stream = Vec::new();
        record(&mut stream, 0x0203, &[1, 0]);
        let mut reader = Biff8Reader::new(stream);
        reader.next().unwrap();
        assert_eq!(reader.read_u16().unwrap(), 1);
        assert!(reader.read_u16().is_err());
    }
}
