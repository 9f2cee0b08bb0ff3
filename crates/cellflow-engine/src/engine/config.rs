//! Tunables for a recalculation pass.

use serde::{Deserialize, Serialize};

/// Upper bound on the number of cells a single range may expand to.
pub const DEFAULT_MAX_RANGE_CELLS: usize = 1_000_000;

/// Order in which the affected cells of an edit are recomputed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecalcOrder {
    /// Precedents before dependents (Kahn's algorithm over the affected set).
    #[default]
    Topological,
    /// Breadth-first discovery order. Diamond-shaped chains may read a
    /// precedent before it has been recomputed in the same pass.
    Discovery,
}

/// Engine settings shared by every recalculation in a document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub recalc_order: RecalcOrder,
    pub max_range_cells: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            recalc_order: RecalcOrder::default(),
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
        }
    }
}

impl EngineConfig {
    /// Replace settings the engine cannot run with by their defaults.
    /// Returns a warning for each replacement.
    pub fn sanitize(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.max_range_cells == 0 {
            warnings.push("max_range_cells must be at least 1; using the default".to_string());
            self.max_range_cells = DEFAULT_MAX_RANGE_CELLS;
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_zero_range_limit() {
        let mut config = EngineConfig {
            max_range_cells: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.sanitize().len(), 1);
        assert_eq!(config.max_range_cells, DEFAULT_MAX_RANGE_CELLS);
        assert!(config.sanitize().is_empty());
    }

    #[test]
    fn test_sanitize_keeps_valid_settings() {
        let mut config = EngineConfig {
            recalc_order: RecalcOrder::Discovery,
            max_range_cells: 1,
        };
        assert!(config.sanitize().is_empty());
        assert_eq!(config.max_range_cells, 1);
        assert_eq!(config.recalc_order, RecalcOrder::Discovery);
    }
}
