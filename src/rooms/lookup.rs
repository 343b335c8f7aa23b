use crate::rooms::record::Floor;
use crate::rooms::record::RoomRecord;

/// Canonical form of a room number for comparisons.
///
/// Keeps digits and Latin or Cyrillic letters, lowercases, and folds the Latin letters people
/// type for their Cyrillic look-alikes (`a b c d e o`) into `а б в д е о`.
pub fn normalize_room_number(number: &str) -> String {
    number
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || ('А'..='я').contains(c))
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'a' => 'а',
            'b' => 'б',
            'c' => 'в',
            'd' => 'д',
            'e' => 'е',
            'o' => 'о',
            _ => c,
        })
        .collect()
}

/// First room in `rooms` on the given building and floor whose number matches `number`.
/// `building` may carry a `building-` prefix.
pub fn find_room<'a>(rooms: &'a [RoomRecord], building: &str, floor: Floor, number: &str) -> Option<&'a RoomRecord> {
    let building = building.trim();
    let building = building.strip_prefix("building-").unwrap_or(building);
    let number = normalize_room_number(number);
    rooms
        .iter()
        .find(|room| room.building == building && room.floor == floor && normalize_room_number(&room.number) == number)
}
