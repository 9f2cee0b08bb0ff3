//! Cell data structures for the spreadsheet grid.
//!
//! - [`Cell`] - What the user typed (`raw_value`) and what the engine shows (`display_value`)
//! - [`Grid`] - Sparse storage for cells (backed by `DashMap`)

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::cell_ref::CellRef;

/// Marker written to a cell whose formula closes a reference cycle.
pub const CIRCULAR_MARKER: &str = "#CIRCULAR";
/// Marker written to a cell whose formula failed for any other reason.
pub const ERROR_MARKER: &str = "#ERROR";

/// A cell in the spreadsheet grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// User-entered text. A formula iff it starts with `=`.
    pub raw_value: String,
    /// Last computed result, or an echo of `raw_value` for non-formula cells.
    pub display_value: String,
}

impl Cell {
    /// Create a cell from user input.
    ///
    /// Non-formula input is echoed into `display_value` straight away; formula
    /// cells start blank until the recalculation pass fills them in.
    pub fn from_input(input: &str) -> Cell {
        let display_value = if input.starts_with('=') {
            String::new()
        } else {
            input.to_string()
        };
        Cell {
            raw_value: input.to_string(),
            display_value,
        }
    }

    pub fn is_formula(&self) -> bool {
        self.raw_value.starts_with('=')
    }

    /// The formula body without the leading `=`.
    pub fn formula(&self) -> Option<&str> {
        self.raw_value.strip_prefix('=')
    }

    /// Numeric reading of the display value, used when the cell is a range
    /// member. Blank and non-numeric text read as None.
    pub fn numeric_value(&self) -> Option<f64> {
        parse_number(&self.display_value)
    }
}

/// Parse a display string as a number.
///
/// Non-finite values are only recognised in the exact spellings the
/// formatter produces (`Infinity`, `-Infinity`, `NaN`); labels such as `inf`
/// or `nan` stay text.
pub fn parse_number(text: &str) -> Option<f64> {
    match text.trim() {
        "" => None,
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        trimmed if trimmed.chars().any(|c| c.is_alphabetic() && c != 'e' && c != 'E') => None,
        trimmed => trimmed.parse::<f64>().ok(),
    }
}

/// Sparse grid storage. Absent key means an empty cell.
pub type Grid = DashMap<CellRef, Cell>;

/// Snapshot a cell's display value. Absent cells read as None.
///
/// The `DashMap` guard is dropped before returning, so callers may write to
/// the grid afterwards.
pub fn display_of(grid: &Grid, cell_ref: &CellRef) -> Option<String> {
    grid.get(cell_ref).map(|cell| cell.display_value.clone())
}
