use crate::error::RoomPlanError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::path::Path;

/// A reader over a workbook either on disk or already held in memory (a fresh upload)
pub(crate) enum SourceReader {
    /// Local file reader
    File(BufReader<File>),
    /// In-memory upload buffer
    Memory(Cursor<Vec<u8>>),
}

impl SourceReader {
    /// Opens a local file for reading
    pub(crate) fn open(path: &Path) -> Result<SourceReader, RoomPlanError> {
        let file = File::open(path)?;
        Ok(SourceReader::File(BufReader::new(file)))
    }

    /// Wraps bytes that were received without touching the disk
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> SourceReader {
        SourceReader::Memory(Cursor::new(bytes))
    }
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            SourceReader::File(reader) => reader.read(buf),
            SourceReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for SourceReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            SourceReader::File(reader) => reader.seek(pos),
            SourceReader::Memory(reader) => reader.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::SeekFrom;

    #[test]
    fn test_open_local_file() {
        let result = SourceReader::open(Path::new("Cargo.toml"));
        assert!(result.is_ok(), "Failed to open local file: {:?}", result.err());

        let result = SourceReader::open(Path::new("non_existent_file.xlsx"));
        assert!(result.is_err(), "Should fail to open non-existent file");
    }

    #[test]
    fn test_memory_reader_seeks() {
        let mut reader = SourceReader::from_bytes(b"PK\x03\x04rest".to_vec());
        assert_eq!(reader.seek(SeekFrom::End(0)).unwrap(), 8);
        reader.seek(SeekFrom::Start(4)).unwrap();
        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "rest");
    }
}
