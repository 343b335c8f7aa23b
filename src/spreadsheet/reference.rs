//! A1-style cell references

/// Rows in an Excel 2007+ worksheet
pub(crate) const MAX_ROWS: usize = 1_048_576;
/// Columns in an Excel 2007+ worksheet (`A`..`XFD`)
pub(crate) const MAX_COLUMNS: usize = 16_384;

/// Whether a 0-based position fits in a worksheet
pub(crate) fn in_bounds(row: usize, col: usize) -> bool {
    row < MAX_ROWS && col < MAX_COLUMNS
}

/// Converts a reference such as `"B3"` (or `"$B$3"`) to a 0-based `(row, col)` pair.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.trim().replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let col = letters
        .chars()
        .try_fold(0usize, |acc, c| {
            let value = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
            acc.checked_mul(26)?.checked_add(value)
        })?;
    let row = digits.parse::<usize>().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}
