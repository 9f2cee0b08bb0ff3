//! Error types for Cellflow core.

use thiserror::Error;

/// Errors that can occur outside a single formula's evaluation.
#[derive(Error, Debug)]
pub enum CellflowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid cell reference: {0:?}")]
    InvalidReference(String),
}

pub type Result<T> = std::result::Result<T, CellflowError>;
