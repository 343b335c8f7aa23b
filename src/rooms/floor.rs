use crate::rooms::normalize_cell;
use crate::rooms::record::Floor;
use crate::spreadsheet::CellGrid;
use regex::Regex;
use std::sync::LazyLock;

/// "№ 5 подв." style labels that name the basement right after the room number
static BASEMENT_ROOM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)№\s*[0-9]+[А-Яа-я]?\s+подв").expect("Hardcode regex pattern"));

/// One pattern per floor: the digit stands right before "этаж" and is not part of a longer number
static FLOOR_BANNERS: LazyLock<[(Floor, Regex); 5]> = LazyLock::new(|| {
    Floor::ALL.map(|floor| {
        let pattern = format!(r"(?:^|[^0-9]){}\s*этаж", floor.level());
        (floor, Regex::new(&pattern).expect("Hardcode regex pattern"))
    })
});

/// Floor of the room labelled `label` at `row`.
///
/// A basement mention in the label itself wins. Otherwise the object column is scanned upwards,
/// nearest row first, for the closest floor banner; rows that say "этаж" without a usable digit
/// are passed over. Without any banner the room is on the first floor.
pub fn resolve_floor(grid: &CellGrid, object_col: usize, row: usize, label: &str) -> Floor {
    if is_basement_label(label) {
        return Floor::Basement;
    }
    scan_floor_banners(grid, object_col, row).unwrap_or_default()
}

fn is_basement_label(label: &str) -> bool {
    let lower = label.to_lowercase();
    lower.contains("подвал") || lower.contains("цоколь") || BASEMENT_ROOM.is_match(label)
}

fn scan_floor_banners(grid: &CellGrid, object_col: usize, row: usize) -> Option<Floor> {
    for previous in (0..row).rev() {
        let text = normalize_cell(grid.cell(previous, object_col));
        if text.is_empty() {
            continue;
        }
        let lower = text.to_lowercase();
        if lower.contains("подвал") {
            return Some(Floor::Basement);
        }
        if lower.contains("этаж") {
            let banner = FLOOR_BANNERS
                .iter()
                .find(|(_, pattern)| pattern.is_match(&lower))
                .map(|(floor, _)| *floor);
            if banner.is_some() {
                return banner;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(cells: &[&str]) -> CellGrid {
        CellGrid::from_rows(cells.iter().map(|cell| vec![*cell]))
    }

    #[test]
    fn basement_in_own_label() {
        let grid = column(&["2 этаж", "x"]);
        assert_eq!(resolve_floor(&grid, 0, 1, "№ 3 Подвал"), Floor::Basement);
        assert_eq!(resolve_floor(&grid, 0, 1, "№ 3 цокольный"), Floor::Basement);
        assert_eq!(resolve_floor(&grid, 0, 1, "№ 3б  подв."), Floor::Basement);
        assert_eq!(resolve_floor(&grid, 0, 1, "№ 3"), Floor::Second);
    }

    #[test]
    fn nearest_banner_wins() {
        let grid = column(&["Подвал", "№ 1", "", "3 этаж", "№ 5", "", "№ 6"]);
        assert_eq!(resolve_floor(&grid, 0, 1, "№ 1"), Floor::Basement);
        assert_eq!(resolve_floor(&grid, 0, 4, "№ 5"), Floor::Third);
        assert_eq!(resolve_floor(&grid, 0, 6, "№ 6"), Floor::Third);
    }

    #[test]
    fn banner_without_digit_is_passed_over() {
        let grid = column(&["4 этаж", "Итого по этажу", "Цокольный этаж", "№ 9"]);
        assert_eq!(resolve_floor(&grid, 0, 3, "№ 9"), Floor::Fourth);
    }

    #[test]
    fn digit_must_not_be_part_of_longer_number() {
        let grid = column(&["12 этаж", "№ 9"]);
        assert_eq!(resolve_floor(&grid, 0, 1, "№ 9"), Floor::First);
        let grid = column(&["2 этаж", "Этаж 3", "№ 9"]);
        assert_eq!(resolve_floor(&grid, 0, 2, "№ 9"), Floor::Second);
    }

    #[test]
    fn lower_digits_are_tried_first() {
        let grid = column(&["3 этаж / 2 этаж", "№ 1"]);
        assert_eq!(resolve_floor(&grid, 0, 1, "№ 1"), Floor::Second);
    }

    #[test]
    fn defaults_to_first_floor() {
        let grid = column(&["Объект недвижимости", "№ 7"]);
        assert_eq!(resolve_floor(&grid, 0, 1, "№ 7"), Floor::First);
        assert_eq!(resolve_floor(&grid, 5, 1, "№ 7"), Floor::First);
    }
}
