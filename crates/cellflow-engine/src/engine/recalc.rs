//! Recalculation after an edit.
//!
//! [`update_cell`] is called once the edited cell's `raw_value` has been
//! written. It recomputes the edited cell and everything downstream of it,
//! writing either the formatted result or an error marker into each formula
//! cell's `display_value`. A failure in one cell never stops the others.

use tracing::{debug, trace};

use super::cell::Grid;
use super::cell_ref::CellRef;
use super::config::EngineConfig;
use super::deps::{DependencyGraph, EvaluationStack};
use super::error::EngineError;
use super::eval::evaluate;
use super::format::format_value;
use super::resolve::Resolver;

/// Outcome of recomputing one formula cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Recalculated {
    pub cell: CellRef,
    /// The new display value, or the error behind the marker that was written.
    pub outcome: Result<String, EngineError>,
}

/// Every formula cell recomputed by one pass, in visit order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecalcReport {
    pub cells: Vec<Recalculated>,
}

impl RecalcReport {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn outcome_of(&self, cell: &CellRef) -> Option<&Result<String, EngineError>> {
        self.cells
            .iter()
            .rev()
            .find(|r| r.cell == *cell)
            .map(|r| &r.outcome)
    }

    pub fn errors(&self) -> impl Iterator<Item = (&CellRef, &EngineError)> {
        self.cells
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (&r.cell, e)))
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}

/// Recompute `cell` and every cell that transitively depends on it.
pub fn update_cell(
    cell: &CellRef,
    grid: &Grid,
    graph: &mut DependencyGraph,
    config: &EngineConfig,
) -> RecalcReport {
    let is_formula = grid.get(cell).is_some_and(|c| c.is_formula());
    if !is_formula {
        graph.clear_outgoing(cell);
    }

    let order = graph.recalc_order(cell, config.recalc_order);
    debug!(cell = %cell, affected = order.len() - 1, "recalculating");

    let mut stack = EvaluationStack::new();
    let mut report = RecalcReport::default();
    for target in &order {
        if let Some(done) = recompute(target, grid, graph, &mut stack, config) {
            report.cells.push(done);
        }
    }
    report
}

/// Rebuild every edge and recompute every formula cell from scratch, as
/// after loading a document.
///
/// Formulas are first resolved in row-major order to rediscover the graph,
/// then evaluated with precedents ahead of dependents.
pub fn recalculate_all(
    grid: &Grid,
    graph: &mut DependencyGraph,
    config: &EngineConfig,
) -> RecalcReport {
    graph.clear();

    let mut formulas: Vec<(CellRef, String)> = grid
        .iter()
        .filter_map(|entry| {
            entry
                .value()
                .formula()
                .map(|f| (entry.key().clone(), f.to_string()))
        })
        .collect();
    formulas.sort_by_key(|(cell, _)| (cell.row, cell.col));
    debug!(formulas = formulas.len(), "rebuilding dependency graph");

    let stack = EvaluationStack::new();
    for (cell, formula) in &formulas {
        let discovered = Resolver::new(grid, graph, &stack)
            .with_max_range_cells(config.max_range_cells)
            .resolve_all(formula, cell);
        if let Err(e) = discovered {
            trace!(cell = %cell, error = %e, "formula failed during discovery");
        }
    }

    let order = graph.topological_sort(formulas.into_iter().map(|(cell, _)| cell).collect());
    let mut stack = EvaluationStack::new();
    let mut report = RecalcReport::default();
    for target in &order {
        if let Some(done) = recompute(target, grid, graph, &mut stack, config) {
            report.cells.push(done);
        }
    }
    report
}

/// Resolve, evaluate and store one cell. Non-formula cells are skipped.
fn recompute(
    cell: &CellRef,
    grid: &Grid,
    graph: &mut DependencyGraph,
    stack: &mut EvaluationStack,
    config: &EngineConfig,
) -> Option<Recalculated> {
    let formula = grid
        .get(cell)
        .and_then(|c| c.formula().map(str::to_string))?;

    stack.push(cell);
    let outcome = Resolver::new(grid, graph, stack)
        .with_max_range_cells(config.max_range_cells)
        .resolve_all(&formula, cell)
        .and_then(|resolved| evaluate(&resolved))
        .map(|value| format_value(&value));
    stack.pop(cell);

    let display = match &outcome {
        Ok(text) => {
            trace!(cell = %cell, value = %text, "recomputed");
            text.clone()
        }
        Err(e) => {
            debug!(cell = %cell, error = %e, "formula failed");
            e.marker().to_string()
        }
    };
    if let Some(mut entry) = grid.get_mut(cell) {
        entry.display_value = display;
    }

    Some(Recalculated {
        cell: cell.clone(),
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CIRCULAR_MARKER, Cell, ERROR_MARKER, RecalcOrder};

    fn r(name: &str) -> CellRef {
        CellRef::from_str(name).unwrap()
    }

    struct Sheet {
        grid: Grid,
        graph: DependencyGraph,
        config: EngineConfig,
    }

    impl Sheet {
        fn new() -> Self {
            Sheet {
                grid: Grid::new(),
                graph: DependencyGraph::new(),
                config: EngineConfig::default(),
            }
        }

        fn set(&mut self, name: &str, raw: &str) -> RecalcReport {
            self.grid.insert(r(name), Cell::from_input(raw));
            update_cell(&r(name), &self.grid, &mut self.graph, &self.config)
        }

        fn show(&self, name: &str) -> String {
            self.grid
                .get(&r(name))
                .map(|c| c.display_value.clone())
                .unwrap_or_default()
        }
    }

    #[test]
    fn test_plain_value_echoes() {
        let mut sheet = Sheet::new();
        let report = sheet.set("A1", "hello");
        assert_eq!(sheet.show("A1"), "hello");
        assert!(report.is_empty());
    }

    #[test]
    fn test_chain_propagates() {
        let mut sheet = Sheet::new();
        sheet.set("A1", "5");
        sheet.set("A2", "=A1 * 2");
        sheet.set("A3", "=A2 + 1");
        assert_eq!(sheet.show("A3"), "11");

        let report = sheet.set("A1", "7");
        assert_eq!(sheet.show("A2"), "14");
        assert_eq!(sheet.show("A3"), "15");
        assert_eq!(report.len(), 2);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_self_reference_is_marked_circular() {
        let mut sheet = Sheet::new();
        let report = sheet.set("A1", "=A1 + 1");
        assert_eq!(sheet.show("A1"), CIRCULAR_MARKER);
        assert!(matches!(
            report.outcome_of(&r("A1")),
            Some(Err(EngineError::CircularReference { .. }))
        ));
    }

    #[test]
    fn test_indirect_cycle_marks_both_cells() {
        let mut sheet = Sheet::new();
        sheet.set("A1", "=A2");
        sheet.set("A2", "=A1");
        assert_eq!(sheet.show("A2"), CIRCULAR_MARKER);
        assert_eq!(sheet.show("A1"), CIRCULAR_MARKER);
    }

    #[test]
    fn test_breaking_a_cycle_recovers() {
        let mut sheet = Sheet::new();
        sheet.set("A1", "=A2");
        sheet.set("A2", "=A1");
        sheet.set("A2", "3");
        assert_eq!(sheet.show("A2"), "3");
        assert_eq!(sheet.show("A1"), "3");
    }

    #[test]
    fn test_errors_do_not_stop_siblings() {
        let mut sheet = Sheet::new();
        sheet.set("A1", "1");
        sheet.set("B1", "=A1 + FOO(1)");
        sheet.set("C1", "=A1 + 1");
        let report = sheet.set("A1", "2");
        assert_eq!(sheet.show("B1"), ERROR_MARKER);
        assert_eq!(sheet.show("C1"), "3");
        assert_eq!(report.errors().count(), 1);
    }

    #[test]
    fn test_error_marker_flows_downstream() {
        let mut sheet = Sheet::new();
        sheet.set("A1", "=1 +");
        sheet.set("A2", "=A1 * 2");
        assert_eq!(sheet.show("A1"), ERROR_MARKER);
        assert_eq!(sheet.show("A2"), ERROR_MARKER);
    }

    #[test]
    fn test_replacing_formula_with_value_drops_edges() {
        let mut sheet = Sheet::new();
        sheet.set("A1", "1");
        sheet.set("B1", "=A1");
        assert!(sheet.graph.dependents_of(&r("A1")).contains(&r("B1")));
        sheet.set("B1", "9");
        assert!(sheet.graph.is_empty());
    }

    #[test]
    fn test_diamond_reads_fresh_values_in_topological_order() {
        let mut sheet = Sheet::new();
        sheet.set("A1", "1");
        sheet.set("A2", "=A1 + 1");
        sheet.set("A3", "=A1 + A2");
        sheet.set("A1", "10");
        assert_eq!(sheet.show("A2"), "11");
        assert_eq!(sheet.show("A3"), "21");
    }

    #[test]
    fn test_discovery_order_is_available() {
        let mut sheet = Sheet::new();
        sheet.config.recalc_order = RecalcOrder::Discovery;
        sheet.set("A1", "1");
        sheet.set("A2", "=A1 + 1");
        sheet.set("A3", "=A2 * 2");
        sheet.set("A1", "4");
        assert_eq!(sheet.show("A3"), "10");
    }

    #[test]
    fn test_recalculate_all_rebuilds_graph() {
        let grid = Grid::new();
        grid.insert(r("A3"), Cell::from_input("=A2 + 1"));
        grid.insert(r("A2"), Cell::from_input("=A1 * 2"));
        grid.insert(r("A1"), Cell::from_input("5"));
        grid.insert(r("B1"), Cell::from_input("=B1"));
        let mut graph = DependencyGraph::new();

        let report = recalculate_all(&grid, &mut graph, &EngineConfig::default());

        assert_eq!(report.len(), 3);
        assert_eq!(grid.get(&r("A2")).unwrap().display_value, "10");
        assert_eq!(grid.get(&r("A3")).unwrap().display_value, "11");
        assert_eq!(grid.get(&r("B1")).unwrap().display_value, CIRCULAR_MARKER);
        assert!(graph.dependents_of(&r("A2")).contains(&r("A3")));
    }
}
