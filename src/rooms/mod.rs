//! # Room Extraction Module
//!
//! Turns a hand-maintained rent report into room records for the floor plans.
//!
//! The report has no fixed schema. The header row is found by its "Объект недвижимости" title,
//! columns are matched by title, floors come from banner rows such as "3 этаж" or "Подвал" above
//! the rooms, and room and building numbers are read out of free-text labels like
//! "Помещение № 12а строение 7/1".
pub mod columns;
pub mod extractor;
pub mod floor;
pub mod header;
pub mod lookup;
pub mod record;

pub use extractor::extract;
pub use lookup::find_room;
pub use lookup::normalize_room_number;
pub use record::Floor;
pub use record::RoomRecord;

/// Cell text with surrounding whitespace removed; absent cells read as empty.
pub(crate) fn normalize_cell(cell: Option<&str>) -> &str {
    cell.map(str::trim).unwrap_or("")
}
