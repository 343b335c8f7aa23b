//! OLE Compound File Binary (CFB) reader.
//! Just enough of the container format to pull the `Workbook` stream out of a legacy `.xls`
//! file and to recognise encrypted `.xlsx` packages, which are stored as compound files too.

use crate::error::RoomPlanError;
use crate::helpers::bytes::to_u16;
use crate::helpers::bytes::to_u64;
use crate::helpers::bytes::to_usize;
use crate::helpers::bytes::to_usize_iter;
use encoding_rs::UTF_16LE;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use thiserror::Error;

const SIGNATURE: u64 = 0xE11A_B1A1_E011_CFD0;
const HEADER_SIZE: usize = 512;
const DIRECTORY_ENTRY_SIZE: usize = 128;
const MINI_SECTOR_SIZE: usize = 64;
const MINI_STREAM_CUTOFF: usize = 4096;
// Anything above this is FREESECT / ENDOFCHAIN / FATSECT / DIFSECT
const MAX_REGULAR_SECTOR: usize = 0xFFFF_FFFA;

const ENTRY_UNALLOCATED: u8 = 0;
const ENTRY_ROOT: u8 = 5;

/// Errors specific to Compound File Binary format parsing
#[derive(Error, Debug)]
pub enum CfbError {
    #[error("The file is corrupted or has an invalid CFB structure")]
    FileFormatError,

    #[error("Invalid OLE signature (not an office document?)")]
    OleSignatureError,

    #[error("Invalid Sector size '2 ^ {1}' for major version '{0}'")]
    SectorSizeError(u16, u16),

    #[error("Sector '{0}' is outside of the file")]
    SectorOutOfRangeError(usize),

    #[error("Sector chain starting at '{0}' does not terminate")]
    SectorChainError(usize),

    #[error("The number of file allocation table sectors is wrong: expect '{0}', actual '{1}'")]
    FileAllocationTableError(usize, usize),

    #[error("Empty Root directory")]
    RootDirectoryError,
}

/// Peeks at the signature without loading the file; the position is restored afterwards
pub(crate) fn is_compound_file<RS: Read + Seek>(reader: &mut RS) -> Result<bool, RoomPlanError> {
    let position = reader.stream_position()?;
    let mut signature = [0u8; 8];
    let matched = match reader.read_exact(&mut signature) {
        Ok(()) => to_u64(&signature) == SIGNATURE,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => false,
        Err(e) => Err(e)?,
    };
    reader.seek(SeekFrom::Start(position))?;
    Ok(matched)
}

/// A fully loaded compound file: directory entries by name plus the two allocation tables
pub(crate) struct CompoundFile {
    entries: HashMap<String, Entry>,
    file_allocation_table: Vec<usize>,
    sectors: Sectors,
    mini_file_allocation_table: Vec<usize>,
    mini_sectors: Sectors,
}

impl CompoundFile {
    /// Reads the whole container into memory and indexes its directory
    pub(crate) fn open<RS: Read + Seek>(reader: &mut RS) -> Result<CompoundFile, RoomPlanError> {
        let size = reader.seek(SeekFrom::End(0))? as usize;
        if size < HEADER_SIZE {
            Err(CfbError::FileFormatError)?;
        }
        reader.seek(SeekFrom::Start(0))?;
        let mut data = vec![0u8; size];
        reader.read_exact(&mut data)?;

        let header = Header::parse(&data[..HEADER_SIZE])?;
        let sector_size = header.sector_size()?;
        // Header occupies the first sector slot, whatever the sector size
        let sectors = Sectors { data, size: sector_size, offset: sector_size };

        let file_allocation_table = load_file_allocation_table(&sectors, &header)?;
        let entries = load_entries(&file_allocation_table, &sectors, &header)?;
        let mini_file_allocation_table = if header.mini_fat_count > 0 {
            let bytes = read_chain(&file_allocation_table, &sectors, header.mini_fat_start)?;
            to_usize_iter(&bytes).collect()
        } else {
            Vec::new()
        };
        let mini_data = match entries.values().find(|entry| entry.kind == ENTRY_ROOT) {
            Some(root) => {
                let mut bytes = read_chain(&file_allocation_table, &sectors, root.start)?;
                bytes.truncate(root.size);
                bytes
            }
            None => Vec::new(),
        };

        Ok(CompoundFile {
            entries,
            file_allocation_table,
            sectors,
            mini_file_allocation_table,
            mini_sectors: Sectors { data: mini_data, size: MINI_SECTOR_SIZE, offset: 0 },
        })
    }

    /// Checks if a stream or storage with the given name exists
    pub(crate) fn exists(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Reads a whole stream, `None` when no entry has that name
    pub(crate) fn read(&self, name: &str) -> Result<Option<Vec<u8>>, RoomPlanError> {
        let Some(entry) = self.entries.get(name) else {
            return Ok(None);
        };
        let mut bytes = if entry.size < MINI_STREAM_CUTOFF {
            read_chain(&self.mini_file_allocation_table, &self.mini_sectors, entry.start)?
        } else {
            read_chain(&self.file_allocation_table, &self.sectors, entry.start)?
        };
        bytes.truncate(entry.size);
        Ok(Some(bytes))
    }
}

/// Collects the FAT from the sectors listed in the header DIFAT and any chained DIFAT sectors
fn load_file_allocation_table(sectors: &Sectors, header: &Header) -> Result<Vec<usize>, RoomPlanError> {
    let mut double_indirect = header.difat.clone();
    let mut index = header.difat_start;
    let mut hops = 0usize;
    while index <= MAX_REGULAR_SECTOR {
        hops += 1;
        if hops > header.difat_count.max(1) + sectors.count() {
            Err(CfbError::SectorChainError(header.difat_start))?;
        }
        double_indirect.extend(to_usize_iter(sectors.get(index)?));
        // Last word of a DIFAT sector points at the next one
        index = double_indirect.pop().unwrap_or(usize::MAX);
    }

    let mut file_allocation_table = Vec::<usize>::new();
    let mut count = 0usize;
    for index in double_indirect.into_iter().filter(|index| *index <= MAX_REGULAR_SECTOR) {
        file_allocation_table.extend(to_usize_iter(sectors.get(index)?));
        count += 1;
    }
    if count != header.fat_count {
        Err(CfbError::FileAllocationTableError(header.fat_count, count))?
    }
    Ok(file_allocation_table)
}

fn load_entries(
    file_allocation_table: &[usize],
    sectors: &Sectors,
    header: &Header,
) -> Result<HashMap<String, Entry>, RoomPlanError> {
    let bytes = read_chain(file_allocation_table, sectors, header.directory_start)?;
    let entries: HashMap<String, Entry> = bytes
        .chunks_exact(DIRECTORY_ENTRY_SIZE)
        .map(|chunk| Entry::parse(chunk, header.major_version))
        .filter(|(_, entry)| entry.kind != ENTRY_UNALLOCATED)
        .collect();
    if entries.is_empty() {
        Err(CfbError::RootDirectoryError)?
    }
    Ok(entries)
}

/// Follows an allocation chain from `start` and concatenates the visited sectors
fn read_chain(table: &[usize], sectors: &Sectors, start: usize) -> Result<Vec<u8>, RoomPlanError> {
    let mut content: Vec<u8> = Vec::new();
    let mut index = start;
    let mut hops = 0usize;
    while index <= MAX_REGULAR_SECTOR {
        hops += 1;
        if hops > table.len() {
            Err(CfbError::SectorChainError(start))?;
        }
        content.extend_from_slice(sectors.get(index)?);
        index = *table.get(index).ok_or(CfbError::SectorOutOfRangeError(index))?;
    }
    Ok(content)
}

/// Fixed-size sectors laid out back to back after `offset` bytes
struct Sectors {
    data: Vec<u8>,
    size: usize,
    offset: usize,
}

impl Sectors {
    fn get(&self, index: usize) -> Result<&[u8], RoomPlanError> {
        let lower = index
            .checked_mul(self.size)
            .and_then(|position| position.checked_add(self.offset))
            .filter(|position| *position < self.data.len())
            .ok_or(CfbError::SectorOutOfRangeError(index))?;
        let upper = self.data.len().min(lower + self.size);
        Ok(&self.data[lower..upper])
    }

    fn count(&self) -> usize {
        self.data.len().saturating_sub(self.offset) / self.size
    }
}

/// The fields of the 512-byte header this reader relies on
struct Header {
    major_version: u16,
    sector_shift: u16,
    fat_count: usize,
    directory_start: usize,
    mini_fat_start: usize,
    mini_fat_count: usize,
    difat_start: usize,
    difat_count: usize,
    /// First 109 FAT sector locations, stored inline in the header
    difat: Vec<usize>,
}

impl Header {
    fn parse(data: &[u8]) -> Result<Header, RoomPlanError> {
        if to_u64(&data[0..8]) != SIGNATURE {
            Err(CfbError::OleSignatureError)?;
        }
        Ok(Header {
            major_version: to_u16(&data[26..28]),
            sector_shift: to_u16(&data[30..32]),
            fat_count: to_usize(&data[44..48]),
            directory_start: to_usize(&data[48..52]),
            mini_fat_start: to_usize(&data[60..64]),
            mini_fat_count: to_usize(&data[64..68]),
            difat_start: to_usize(&data[68..72]),
            difat_count: to_usize(&data[72..76]),
            difat: to_usize_iter(&data[76..HEADER_SIZE]).collect(),
        })
    }

    fn sector_size(&self) -> Result<usize, RoomPlanError> {
        match (self.major_version, self.sector_shift) {
            (3, 0x0009) => Ok(512),
            // Version 4 pads the header out to a full 4096-byte sector with zeroes
            (4, 0x000C) => Ok(4096),
            (major, shift) => Err(CfbError::SectorSizeError(major, shift))?,
        }
    }
}

/// Directory entry of a stream or storage
#[derive(Debug)]
struct Entry {
    kind: u8,
    start: usize,
    size: usize,
}

impl Entry {
    fn parse(bytes: &[u8], major_version: u16) -> (String, Entry) {
        let length = (to_u16(&bytes[64..66]) as usize).min(64);
        let (name, _, _) = UTF_16LE.decode(&bytes[..length]);
        let name = match name.find('\0') {
            Some(position) => name[..position].to_owned(),
            None => name.into_owned(),
        };
        let size = to_u64(&bytes[120..128]);
        // Version 3 writers may leave garbage in the high half of the size
        let size = if major_version == 3 { size & 0xFFFF_FFFF } else { size };
        let entry = Entry {
            kind: bytes[66],
            start: to_usize(&bytes[116..120]),
            size: size as usize,
        };
        (name, entry)
    }
}
