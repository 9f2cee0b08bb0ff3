//! cellflow-core - UI-agnostic document model + engine configuration.

pub mod config;
pub mod document;
pub mod error;

pub use config::{default_config_path, load_config, parse_config};
pub use document::Document;
pub use error::{CellflowError, Result};

pub use cellflow_engine::engine::{CellRef, EngineConfig, RecalcOrder, RecalcReport};
