//! Spreadsheet engine API.
//!
//! This module provides the core computation engine for the spreadsheet:
//!
//! - [`Cell`], [`Grid`] - Data structures for cell storage
//! - [`CellRef`], [`CellRange`] - Reference parsing (A1 notation ↔ col/row indices)
//! - [`parse_formula`] - Formula text to expression tree
//! - [`DependencyGraph`] - Which cells must be recomputed when another changes
//! - [`detect_cycle`], [`find_closing_cycle`] - Circular dependency detection
//! - [`Resolver`] - Substitute references and rebuild a cell's edges
//! - [`evaluate`] - Compute a resolved formula
//! - [`update_cell`], [`recalculate_all`] - Recalculation passes
//! - [`format_number`], [`format_value`] - Format values for display
//! - [`function_help`] - Names and descriptions of the built-in functions

mod cell;
mod cell_ref;
mod config;
mod cycle;
mod deps;
mod error;
mod eval;
mod format;
mod formula;
mod recalc;
mod resolve;

pub use crate::builtins::function_help;
pub use cell::{CIRCULAR_MARKER, Cell, ERROR_MARKER, Grid, display_of, parse_number};
pub use cell_ref::{CellRange, CellRef};
pub use config::{DEFAULT_MAX_RANGE_CELLS, EngineConfig, RecalcOrder};
pub use cycle::{detect_cycle, find_closing_cycle};
pub use deps::{DependencyGraph, EvaluationStack};
pub use error::{EngineError, ErrorKind, Result};
pub use eval::{Value, evaluate};
pub use format::{format_number, format_value};
pub use formula::{
    BinaryOp, Expr, MAX_NESTING_DEPTH, MAX_TREE_DEPTH, UnaryOp, parse_formula,
};
pub use recalc::{RecalcReport, Recalculated, recalculate_all, update_cell};
pub use resolve::{Resolved, Resolver, resolve_all};
