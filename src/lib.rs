//! Cellflow - spreadsheet formula engine.
//!
//! - [`engine`] - References, dependency graph, cycle detection, formula
//!   resolution, evaluation and recalculation
//! - [`Document`] - One open sheet: its grid, its graph and its settings

pub use cellflow_core::{
    CellflowError, Document, Result, default_config_path, load_config, parse_config,
};
pub use cellflow_engine::engine;
pub use cellflow_engine::engine::{CellRef, EngineConfig, RecalcOrder, RecalcReport};
