//! Error types for formula resolution and evaluation.

use thiserror::Error;

use super::cell::{CIRCULAR_MARKER, ERROR_MARKER};
use super::cell_ref::CellRef;

/// The two reportable failure kinds a formula cell can end up in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    CircularReference,
    Evaluation,
}

/// Errors that can occur while resolving or evaluating a formula.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Circular reference through {cell}: {}", format_path(.cycle))]
    CircularReference { cell: CellRef, cycle: Vec<CellRef> },

    #[error("Parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Value is not a number: {0:?}")]
    NotANumber(String),

    #[error("Range {range} covers more than {limit} cells")]
    RangeTooLarge { range: String, limit: usize },

    #[error("{function}: {message}")]
    InvalidArguments { function: String, message: String },

    #[error("Array shapes do not match for {0}")]
    ShapeMismatch(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::CircularReference { .. } => ErrorKind::CircularReference,
            _ => ErrorKind::Evaluation,
        }
    }

    pub fn is_circular(&self) -> bool {
        self.kind() == ErrorKind::CircularReference
    }

    /// The display marker written into a cell that failed with this error.
    pub fn marker(&self) -> &'static str {
        match self.kind() {
            ErrorKind::CircularReference => CIRCULAR_MARKER,
            ErrorKind::Evaluation => ERROR_MARKER,
        }
    }

    pub(crate) fn invalid_args(function: &str, message: impl Into<String>) -> EngineError {
        EngineError::InvalidArguments {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

fn format_path(cycle: &[CellRef]) -> String {
    cycle
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub type Result<T> = std::result::Result<T, EngineError>;
