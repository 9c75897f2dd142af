//! A1 樣式儲存格參照與 0-based (列, 欄) 互轉

/// Excel 工作表上限
pub(crate) const MAX_ROWS: usize = 1_048_576;
pub(crate) const MAX_COLUMNS: usize = 16_384;

pub(crate) fn column_name(mut col: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", column_name(col), row + 1)
}

pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let col = letters.chars().try_fold(0usize, |acc, c| {
        acc.checked_mul(26)?
            .checked_add(c.to_ascii_uppercase() as usize - 'A' as usize + 1)
    })?;
    let row = digits.parse::<usize>().ok()?;
    if row == 0 || row > MAX_ROWS || col > MAX_COLUMNS {
        return None;
    }
    Some((row - 1, col - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_references() {
        assert_eq!(index_to_reference(0, 0), "A1");
        assert_eq!(index_to_reference(9, 25), "Z10");
        assert_eq!(index_to_reference(0, 26), "AA1");
        assert_eq!(index_to_reference(1, 701), "ZZ2");
        assert_eq!(index_to_reference(1, 702), "AAA2");

        assert_eq!(reference_to_index("A1"), Some((0, 0)));
        assert_eq!(reference_to_index("AA12"), Some((11, 26)));
        assert_eq!(reference_to_index("zz2"), Some((1, 701)));
        assert_eq!(reference_to_index("12"), None);
        assert_eq!(reference_to_index("B0"), None);
    }

    #[test]
    fn test_references_beyond_sheet_limits() {
        assert_eq!(reference_to_index("XFD1048576"), Some((1_048_575, 16_383)));
        assert_eq!(reference_to_index("XFE1"), None);
        assert_eq!(reference_to_index("A1048577"), None);
        assert_eq!(reference_to_index("A4000000000"), None);
        assert_eq!(reference_to_index("AAAAAAAAAAAAAAAA1"), None);
        assert_eq!(reference_to_index("A99999999999999999999999"), None);
    }
}
