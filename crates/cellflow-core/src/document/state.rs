use std::path::Path;

use cellflow_engine::engine::{DependencyGraph, EngineConfig, Grid};

use tracing::warn;

use crate::config::load_config;

/// UI-agnostic document state for the spreadsheet.
///
/// Each open document owns its own grid and dependency graph; nothing is
/// shared between documents.
pub struct Document {
    /// The spreadsheet grid
    pub grid: Grid,
    /// Reverse dependency map: cell -> cells whose formulas reference it
    pub graph: DependencyGraph,
    pub config: EngineConfig,
}

impl Document {
    /// Create an empty document with the default engine configuration.
    ///
    /// This constructor is side-effect free: it does not touch the filesystem.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an empty document with `config`. Unusable settings fall back
    /// to their defaults with a logged warning.
    pub fn with_config(mut config: EngineConfig) -> Self {
        for warning in config.sanitize() {
            warn!("{}", warning);
        }
        Document {
            grid: Grid::new(),
            graph: DependencyGraph::new(),
            config,
        }
    }

    /// Create an empty document configured from `engine.toml`.
    /// Returns any configuration warnings alongside the document.
    pub fn with_config_file(config_file: Option<&Path>) -> (Self, Vec<String>) {
        let (config, warnings) = load_config(config_file);
        (Self::with_config(config), warnings)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
