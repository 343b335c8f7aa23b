use crate::rooms::columns::resolve_columns;
use crate::rooms::columns::ColumnMap;
use crate::rooms::columns::ColumnRole;
use crate::rooms::floor::resolve_floor;
use crate::rooms::header::locate_header;
use crate::rooms::normalize_cell;
use crate::rooms::record::RoomRecord;
use crate::spreadsheet::CellGrid;
use regex::Regex;
use std::sync::LazyLock;

/// Building assumed when the label does not name one
pub const DEFAULT_BUILDING: &str = "19";

static ROOM_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"№\s*([0-9]+[А-Яа-я]?)").expect("Hardcode regex pattern"));
static BUILDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)строение\s+([0-9]+)(?:/([0-9]+))?").expect("Hardcode regex pattern"));
static OCCUPIED_STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)аренд|занят").expect("Hardcode regex pattern"));

/// Turns a worksheet into room records, in sheet order.
///
/// Never fails: a sheet without a usable object column, or without any room rows, gives an
/// empty list.
pub fn extract(grid: &CellGrid) -> Vec<RoomRecord> {
    let header = locate_header(grid);
    let columns = grid.row(header.index).map(resolve_columns).unwrap_or_default();
    log::debug!(
        "Header row {} ({}), columns {:?}",
        header.index,
        if header.detected { "detected" } else { "assumed" },
        columns
    );

    let Some(object_col) = columns.get(ColumnRole::Object) else {
        log::info!("No object column in header row {}, nothing to extract", header.index);
        return Vec::new();
    };
    let rooms: Vec<RoomRecord> = (header.index + 1..grid.row_count())
        .filter_map(|row| extract_row(grid, &columns, object_col, row))
        .collect();
    log::debug!("Extracted {} rooms from {} rows", rooms.len(), grid.row_count());
    rooms
}

fn extract_row(grid: &CellGrid, columns: &ColumnMap, object_col: usize, row: usize) -> Option<RoomRecord> {
    let label = normalize_cell(grid.cell(row, object_col));
    if label.is_empty() || is_section_row(label) {
        return None;
    }
    let number = ROOM_NUMBER.captures(label)?.get(1)?.as_str().to_owned();
    let building = parse_building(label);
    let floor = resolve_floor(grid, object_col, row, label);

    let read = |role: ColumnRole| {
        columns
            .get(role)
            .map(|col| normalize_cell(grid.cell(row, col)))
            .unwrap_or("")
    };
    let tenant = read(ColumnRole::Tenant);
    let occupied = is_occupied(read(ColumnRole::Status), tenant);
    let when_occupied = |text: &str| (occupied && !text.is_empty()).then(|| text.to_owned());
    let when_present = |text: &str| (!text.is_empty()).then(|| text.to_owned());

    Some(RoomRecord {
        number,
        building,
        floor,
        tenant: when_occupied(tenant),
        contract: when_occupied(read(ColumnRole::Contract)),
        rent: when_occupied(read(ColumnRole::Rent)),
        area: when_present(read(ColumnRole::Area)),
        contract_area: when_present(read(ColumnRole::ContractArea)),
    })
}

/// Floor banners, totals and anything without a room number sign
fn is_section_row(label: &str) -> bool {
    let lower = label.to_lowercase();
    lower.contains("этаж") || lower.contains("итого") || !lower.contains('№')
}

/// `строение 7` gives "7", `строение 7/1` gives "7-1"
fn parse_building(label: &str) -> String {
    match BUILDING.captures(label) {
        Some(captures) => match (captures.get(1), captures.get(2)) {
            (Some(first), Some(second)) => format!("{}-{}", first.as_str(), second.as_str()),
            (Some(first), None) => first.as_str().to_owned(),
            _ => DEFAULT_BUILDING.to_owned(),
        },
        None => DEFAULT_BUILDING.to_owned(),
    }
}

/// A status, when given, decides alone; otherwise a named tenant means occupied.
fn is_occupied(status: &str, tenant: &str) -> bool {
    if status.is_empty() {
        !tenant.is_empty()
    } else {
        OCCUPIED_STATUS.is_match(status)
    }
}
