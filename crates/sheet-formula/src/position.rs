use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Upper bound on addressable rows, exclusive.
pub const MAX_ROWS: i32 = 16_384;
/// Upper bound on addressable columns, exclusive.
pub const MAX_COLS: i32 = 16_384;

/// A cell address: zero-based row and column.
///
/// Total ordering by `(row, col)`, suitable for use as a map key and for
/// the position-ordered deduplication `CellBody::referenced` performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    /// Sentinel distinguishable from every valid position, produced by
    /// [`Position::parse`] on malformed or out-of-range text.
    pub const INVALID: Position = Position { row: -1, col: -1 };

    pub fn new(row: i32, col: i32) -> Self {
        Position { row, col }
    }

    pub fn is_valid(&self) -> bool {
        (0..MAX_ROWS).contains(&self.row) && (0..MAX_COLS).contains(&self.col)
    }

    /// Parses an A1-style address (one or more letters, then one or more
    /// digits). Returns [`Position::INVALID`] on any malformed or
    /// out-of-range input; this is a total function, not a `Result`, so
    /// that the formula parser can embed a reference node unconditionally
    /// and let `Sheet::lookup_number` raise `FormulaError::Ref` uniformly.
    pub fn parse(text: &str) -> Position {
        let Some(caps) = address_re().captures(text) else {
            return Position::INVALID;
        };
        let letters = &caps["letters"];
        let digits = &caps["digits"];

        let Some(col) = column_index(letters) else {
            return Position::INVALID;
        };
        let Ok(row_number) = digits.parse::<i64>() else {
            return Position::INVALID;
        };
        let Some(row) = row_number.checked_sub(1) else {
            return Position::INVALID;
        };
        if row < 0 || row > i32::MAX as i64 || col > i32::MAX as i64 {
            return Position::INVALID;
        }

        let pos = Position::new(row as i32, col as i32);
        if pos.is_valid() { pos } else { Position::INVALID }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row + 1)
    }
}

/// The minimal printable bounding rectangle of a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub rows: i32,
    pub cols: i32,
}

fn address_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Za-z]+)(?<digits>[0-9]+)$")
            .expect("position regex must compile")
    })
}

/// Base-26 column letters to a zero-based index, `A`=0, `AA`=26.
fn column_index(letters: &str) -> Option<i64> {
    let mut col: i64 = 0;
    for b in letters.bytes() {
        let upper = b.to_ascii_uppercase();
        let digit = (upper - b'A') as i64 + 1;
        col = col.checked_mul(26)?.checked_add(digit)?;
    }
    col.checked_sub(1)
}

/// Zero-based column index to base-26 letters, the inverse of [`column_index`].
fn column_letters(col: i32) -> String {
    let mut out = Vec::new();
    let mut n = col as i64 + 1;
    while n > 0 {
        n -= 1;
        out.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    out.reverse();
    String::from_utf8(out).expect("column letters are ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_addresses() {
        assert_eq!(Position::parse("A1"), Position::new(0, 0));
        assert_eq!(Position::parse("B1"), Position::new(0, 1));
        assert_eq!(Position::parse("A2"), Position::new(1, 0));
    }

    #[test]
    fn parses_multi_letter_columns() {
        assert_eq!(Position::parse("Z1"), Position::new(0, 25));
        assert_eq!(Position::parse("AA1"), Position::new(0, 26));
        assert_eq!(Position::parse("AB1"), Position::new(0, 27));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert_eq!(Position::parse(""), Position::INVALID);
        assert_eq!(Position::parse("1A"), Position::INVALID);
        assert_eq!(Position::parse("A0"), Position::INVALID);
        assert_eq!(Position::parse("A"), Position::INVALID);
        assert_eq!(Position::parse("1"), Position::INVALID);
        assert_eq!(Position::parse("A1B"), Position::INVALID);
    }

    #[test]
    fn rejects_out_of_range_addresses() {
        assert_eq!(Position::parse("A99999999999"), Position::INVALID);
    }

    #[test]
    fn displays_round_trip() {
        for text in ["A1", "B1", "Z1", "AA1", "AB10", "ZZ100"] {
            let pos = Position::parse(text);
            assert!(pos.is_valid());
            assert_eq!(pos.to_string(), text);
        }
    }

    #[test]
    fn total_ordering_is_row_major() {
        assert!(Position::new(0, 1) < Position::new(1, 0));
        assert!(Position::new(0, 0) < Position::new(0, 1));
    }
}
