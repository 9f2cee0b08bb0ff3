//! Cell reference parsing and formatting.
//!
//! Provides bidirectional conversion between spreadsheet-style cell references
//! (e.g., "A1", "B2", "AA100") and zero-indexed column/row coordinates, plus
//! rectangular ranges like "A1:B5".
//!
//! # Examples
//!
//! ```
//! use cellflow_engine::engine::CellRef;
//!
//! let cell = CellRef::from_str("B3").unwrap();
//! assert_eq!(cell.col, 1);  // 0-indexed
//! assert_eq!(cell.row, 2);
//! assert_eq!(cell.to_string(), "B3");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A reference to a cell by column and row indices (0-indexed).
///
/// This is the canonical cell key: two textual addresses that decode to the
/// same coordinates compare and hash equal.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(col: usize, row: usize) -> CellRef {
        CellRef { row, col }
    }

    /// Parse a cell reference from spreadsheet notation (e.g., "A1", "B2", "AA10").
    /// Returns None if the input is not a well-formed upper-case address.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Option<CellRef> {
        Self::parse_a1(name)
    }

    fn parse_a1(name: &str) -> Option<CellRef> {
        let caps = address_re().captures(name)?;
        let letters = &caps["letters"];
        let numbers = &caps["numbers"];

        let mut col_acc = 0usize;
        for c in letters.bytes() {
            let digit = (c - b'A') as usize + 1;
            col_acc = col_acc.checked_mul(26)?.checked_add(digit)?;
        }
        let col = col_acc.checked_sub(1)?;

        let row = numbers.parse::<usize>().ok()?.checked_sub(1)?;

        Some(CellRef::new(col, row))
    }

    /// Convert column index to spreadsheet-style letters (0 -> A, 25 -> Z, 26 -> AA).
    pub fn col_to_letters(col: usize) -> String {
        let mut result = String::new();
        let mut n = col as u128 + 1;
        while n > 0 {
            n -= 1;
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        result
    }
}

fn address_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Z]+)(?<numbers>[0-9]+)$")
            .expect("cell address regex must compile")
    })
}

impl std::str::FromStr for CellRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_a1(s).ok_or_else(|| format!("Invalid cell reference: {}", s))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CellRef::col_to_letters(self.col), self.row + 1)
    }
}

/// A rectangular block of cells such as `A1:B5`.
///
/// Either endpoint may be the top-left corner; [`CellRange::normalized`]
/// sorts them out.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    pub fn new(start: CellRef, end: CellRef) -> CellRange {
        CellRange { start, end }
    }

    /// Parse `A1:B5` style text. Returns None unless both endpoints are valid.
    pub fn parse(text: &str) -> Option<CellRange> {
        let (start, end) = text.split_once(':')?;
        Some(CellRange::new(
            CellRef::from_str(start)?,
            CellRef::from_str(end)?,
        ))
    }

    /// Returns `(min_col, max_col, min_row, max_row)`.
    pub fn normalized(&self) -> (usize, usize, usize, usize) {
        (
            self.start.col.min(self.end.col),
            self.start.col.max(self.end.col),
            self.start.row.min(self.end.row),
            self.start.row.max(self.end.row),
        )
    }

    pub fn width(&self) -> usize {
        let (min_col, max_col, _, _) = self.normalized();
        max_col - min_col + 1
    }

    pub fn height(&self) -> usize {
        let (_, _, min_row, max_row) = self.normalized();
        max_row - min_row + 1
    }

    /// Number of cells covered, or None if it does not fit in `usize`.
    pub fn cell_count(&self) -> Option<usize> {
        self.width().checked_mul(self.height())
    }

    /// The covered cells grouped by column, each column top-to-bottom.
    pub fn columns(&self) -> impl Iterator<Item = Vec<CellRef>> + '_ {
        let (min_col, max_col, min_row, max_row) = self.normalized();
        (min_col..=max_col).map(move |col| {
            (min_row..=max_row)
                .map(|row| CellRef::new(col, row))
                .collect()
        })
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}
