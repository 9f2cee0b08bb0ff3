//! Formula resolution.
//!
//! Resolution turns a parsed formula into an evaluator-ready tree while
//! rebuilding the formula cell's dependency edges:
//!
//! 1. clear the cell's outgoing edges;
//! 2. expand every range into a column-major nested array of numbers;
//! 3. substitute every single-cell reference with the precedent's current
//!    display value;
//! 4. translate function names to their evaluator spelling.
//!
//! Every referenced cell passes both circular-reference checks before its
//! value is used. The first failure aborts resolution of the cell.

use std::collections::HashMap;
use std::fmt;

use crate::builtins::{self, Arity};

use super::cell::{Grid, display_of, parse_number};
use super::cell_ref::{CellRange, CellRef};
use super::config::DEFAULT_MAX_RANGE_CELLS;
use super::cycle::find_closing_cycle;
use super::deps::{DependencyGraph, EvaluationStack};
use super::error::{EngineError, Result};
use super::format::format_number;
use super::formula::{BinaryOp, Expr, UnaryOp, parse_formula};

/// A formula with every reference replaced by a value.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    Number(f64),
    /// A precedent whose display value is not numeric, kept verbatim.
    Text(String),
    Array(Vec<Resolved>),
    Name(String),
    Group(Box<Resolved>),
    Unary {
        op: UnaryOp,
        operand: Box<Resolved>,
    },
    Binary {
        left: Box<Resolved>,
        op: BinaryOp,
        right: Box<Resolved>,
    },
    /// `name` is the evaluator spelling for known built-ins.
    Call {
        name: String,
        args: Vec<Resolved>,
    },
}

impl fmt::Display for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Number(n) => write!(f, "{}", format_number(*n)),
            Resolved::Text(s) | Resolved::Name(s) => write!(f, "{}", s),
            Resolved::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Resolved::Group(inner) => write!(f, "({})", inner),
            Resolved::Unary { op, operand } => match op {
                UnaryOp::Minus => write!(f, "-{}", operand),
                UnaryOp::Plus => write!(f, "+{}", operand),
            },
            Resolved::Binary { left, op, right } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Resolved::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Resolves formulas for one document against its grid and graph.
pub struct Resolver<'a> {
    grid: &'a Grid,
    graph: &'a mut DependencyGraph,
    stack: &'a EvaluationStack,
    max_range_cells: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(grid: &'a Grid, graph: &'a mut DependencyGraph, stack: &'a EvaluationStack) -> Self {
        Resolver {
            grid,
            graph,
            stack,
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
        }
    }

    pub fn with_max_range_cells(mut self, limit: usize) -> Self {
        self.max_range_cells = limit;
        self
    }

    /// Resolve `formula` (without the leading `=`) as the formula of `current`.
    pub fn resolve_all(&mut self, formula: &str, current: &CellRef) -> Result<Resolved> {
        self.graph.clear_outgoing(current);

        let expr = parse_formula(formula)?;

        let mut ranges: HashMap<&CellRange, Resolved> = HashMap::new();
        for range in expr.ranges() {
            if !ranges.contains_key(range) {
                let value = self.expand_range(range, current)?;
                ranges.insert(range, value);
            }
        }

        let mut cells: HashMap<&CellRef, Resolved> = HashMap::new();
        for cell in expr.cell_refs() {
            if !cells.contains_key(cell) {
                self.record(current, cell)?;
                cells.insert(cell, self.cell_value(cell));
            }
        }

        Ok(substitute(&expr, &ranges, &cells))
    }

    fn expand_range(&mut self, range: &CellRange, current: &CellRef) -> Result<Resolved> {
        match range.cell_count() {
            Some(count) if count <= self.max_range_cells => {}
            _ => {
                return Err(EngineError::RangeTooLarge {
                    range: range.to_string(),
                    limit: self.max_range_cells,
                });
            }
        }

        let mut columns = Vec::with_capacity(range.width());
        for column in range.columns() {
            let mut values = Vec::with_capacity(column.len());
            for cell in &column {
                self.record(current, cell)?;
                let n = self
                    .grid
                    .get(cell)
                    .and_then(|c| c.numeric_value())
                    .unwrap_or(0.0);
                values.push(Resolved::Number(n));
            }
            columns.push(Resolved::Array(values));
        }
        Ok(Resolved::Array(columns))
    }

    /// Run both circular-reference checks for `current -> target` and keep
    /// the edge.
    fn record(&mut self, current: &CellRef, target: &CellRef) -> Result<()> {
        if self.stack.contains(target) {
            return Err(EngineError::CircularReference {
                cell: current.clone(),
                cycle: vec![target.clone(), current.clone()],
            });
        }

        self.graph.add_edge(current, target);
        if let Some(cycle) = find_closing_cycle(self.graph, current, target) {
            tracing::trace!(cell = %current, via = %target, "reference closes a cycle");
            return Err(EngineError::CircularReference {
                cell: current.clone(),
                cycle,
            });
        }
        Ok(())
    }

    fn cell_value(&self, cell: &CellRef) -> Resolved {
        match display_of(self.grid, cell) {
            None => Resolved::Number(0.0),
            Some(text) if text.trim().is_empty() => Resolved::Number(0.0),
            Some(text) => match parse_number(&text) {
                Some(n) => Resolved::Number(n),
                None => Resolved::Text(text),
            },
        }
    }
}

fn substitute(
    expr: &Expr,
    ranges: &HashMap<&CellRange, Resolved>,
    cells: &HashMap<&CellRef, Resolved>,
) -> Resolved {
    let sub = |e: &Expr| substitute(e, ranges, cells);
    match expr {
        Expr::Number(n) => Resolved::Number(*n),
        Expr::Array(items) => Resolved::Array(items.iter().map(sub).collect()),
        Expr::Cell(cell) => cells
            .get(cell)
            .cloned()
            .unwrap_or(Resolved::Number(0.0)),
        Expr::Range(range) => ranges
            .get(range)
            .cloned()
            .unwrap_or_else(|| Resolved::Array(Vec::new())),
        Expr::Name(name) => Resolved::Name(name.clone()),
        Expr::Group(inner) => Resolved::Group(Box::new(sub(inner))),
        Expr::Unary { op, operand } => Resolved::Unary {
            op: *op,
            operand: Box::new(sub(operand)),
        },
        Expr::Binary { left, op, right } => Resolved::Binary {
            left: Box::new(sub(left)),
            op: *op,
            right: Box::new(sub(right)),
        },
        Expr::Call { name, args } => {
            let Some(builtin) = builtins::lookup(name) else {
                return Resolved::Call {
                    name: name.clone(),
                    args: args.iter().map(sub).collect(),
                };
            };
            let mut resolved: Vec<Resolved> = args.iter().map(sub).collect();
            if builtin.arity == Arity::PairedSeries
                && let [Expr::Range(range)] = args.as_slice()
                && range.width() > 1
                && let Some(Resolved::Array(columns)) = resolved.pop()
            {
                resolved = columns;
            }
            Resolved::Call {
                name: builtin.eval_name.to_string(),
                args: resolved,
            }
        }
    }
}

/// Resolve a formula outside of a recalculation pass and return the
/// evaluator-ready text. Edges for `current` are rebuilt in `graph`.
pub fn resolve_all(
    formula: &str,
    grid: &Grid,
    graph: &mut DependencyGraph,
    current: &CellRef,
) -> Result<String> {
    let stack = EvaluationStack::new();
    Resolver::new(grid, graph, &stack)
        .resolve_all(formula, current)
        .map(|resolved| resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Cell;

    fn r(name: &str) -> CellRef {
        CellRef::from_str(name).unwrap()
    }

    fn grid(cells: &[(&str, &str)]) -> Grid {
        let grid = Grid::new();
        for (name, raw) in cells {
            grid.insert(r(name), Cell::from_input(raw));
        }
        grid
    }

    fn resolve(formula: &str, grid: &Grid, current: &str) -> Result<String> {
        let mut graph = DependencyGraph::new();
        resolve_all(formula, grid, &mut graph, &r(current))
    }

    #[test]
    fn test_resolves_simple_cell_reference() {
        let g = grid(&[("A1", "10")]);
        assert_eq!(resolve("A1", &g, "A2").unwrap(), "10");
    }

    #[test]
    fn test_resolves_multiple_cell_references() {
        let g = grid(&[("A1", "5"), ("A2", "3")]);
        assert_eq!(resolve("A1 + A2", &g, "A3").unwrap(), "5 + 3");
    }

    #[test]
    fn test_translates_function_names() {
        let g = Grid::new();
        assert_eq!(resolve("SUM(1, 2, 3)", &g, "A1").unwrap(), "sum(1, 2, 3)");
        assert_eq!(
            resolve("MEDIAN(1, 2) + VARIANCE(3, 4)", &g, "A1").unwrap(),
            "median(1, 2) + variance(3, 4)"
        );
    }

    #[test]
    fn test_single_column_range_is_nested() {
        let g = grid(&[("A1", "1"), ("A2", "2"), ("A3", "3")]);
        assert_eq!(resolve("A1:A3", &g, "A4").unwrap(), "[[1,2,3]]");
        assert_eq!(resolve("SUM(A1:A3)", &g, "A4").unwrap(), "sum([[1,2,3]])");
    }

    #[test]
    fn test_rectangular_range_is_column_major() {
        let g = grid(&[("A1", "1"), ("B1", "2"), ("A2", "3"), ("B2", "4")]);
        assert_eq!(resolve("A1:B2", &g, "C1").unwrap(), "[[1,3],[2,4]]");
        assert_eq!(resolve("B2:A1", &g, "C1").unwrap(), "[[1,3],[2,4]]");
    }

    #[test]
    fn test_range_non_numeric_and_absent_cells_read_zero() {
        let g = grid(&[("A1", "hello"), ("A3", "7")]);
        assert_eq!(resolve("A1:A3", &g, "B1").unwrap(), "[[0,0,7]]");
    }

    #[test]
    fn test_corr_single_range_splits_into_columns() {
        let g = grid(&[("A1", "1"), ("B1", "2")]);
        assert_eq!(resolve("CORR(A1:B1)", &g, "C1").unwrap(), "corr([1], [2])");
        assert_eq!(
            resolve("COV(A1:A1, B1:B1)", &g, "C1").unwrap(),
            "cov([[1]], [[2]])"
        );
    }

    #[test]
    fn test_empty_cells_resolve_to_zero() {
        let g = Grid::new();
        assert_eq!(resolve("A1", &g, "A2").unwrap(), "0");
    }

    #[test]
    fn test_text_precedent_is_kept_verbatim() {
        let g = grid(&[("A1", "hello")]);
        assert_eq!(resolve("A1 + 1", &g, "A2").unwrap(), "hello + 1");
    }

    #[test]
    fn test_parentheses_survive_resolution() {
        let g = grid(&[("A1", "2")]);
        assert_eq!(resolve("(A1 + 1) * -3", &g, "B1").unwrap(), "(2 + 1) * -3");
    }

    #[test]
    fn test_self_reference_is_circular() {
        let g = grid(&[("A1", "=A1")]);
        let err = resolve("A1", &g, "A1").unwrap_err();
        assert!(err.is_circular());
    }

    #[test]
    fn test_self_reference_inside_range_is_circular() {
        let g = Grid::new();
        let err = resolve("SUM(A1:A3)", &g, "A2").unwrap_err();
        assert!(err.is_circular());
    }

    #[test]
    fn test_reentrant_reference_is_circular() {
        let g = grid(&[("A1", "=B1")]);
        let mut graph = DependencyGraph::new();
        let mut stack = EvaluationStack::new();
        stack.push(&r("A1"));
        let err = Resolver::new(&g, &mut graph, &stack)
            .resolve_all("B1 + A1", &r("A1"))
            .unwrap_err();
        assert!(err.is_circular());
    }

    #[test]
    fn test_edges_match_current_formula() {
        let g = grid(&[("A1", "1"), ("B1", "2")]);
        let mut graph = DependencyGraph::new();
        resolve_all("A1 + B1", &g, &mut graph, &r("C1")).unwrap();
        assert!(graph.dependents_of(&r("A1")).contains(&r("C1")));
        assert!(graph.dependents_of(&r("B1")).contains(&r("C1")));

        resolve_all("B1 * 2", &g, &mut graph, &r("C1")).unwrap();
        assert!(graph.dependents_of(&r("A1")).is_empty());
        assert!(graph.dependents_of(&r("B1")).contains(&r("C1")));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let g = grid(&[("A1", "1"), ("A2", "2"), ("B1", "4")]);
        let mut graph = DependencyGraph::new();
        let first = resolve_all("SUM(A1:A2) + B1", &g, &mut graph, &r("C1")).unwrap();
        let edges_after_first = graph.clone();
        let second = resolve_all("SUM(A1:A2) + B1", &g, &mut graph, &r("C1")).unwrap();
        assert_eq!(first, second);
        assert_eq!(graph.len(), 3);
        for cell in ["A1", "A2", "B1"] {
            assert_eq!(
                graph.dependents_of(&r(cell)),
                edges_after_first.dependents_of(&r(cell))
            );
        }
    }

    #[test]
    fn test_range_too_large_is_an_error() {
        let g = Grid::new();
        let mut graph = DependencyGraph::new();
        let stack = EvaluationStack::new();
        let err = Resolver::new(&g, &mut graph, &stack)
            .with_max_range_cells(4)
            .resolve_all("SUM(A1:A5)", &r("B1"))
            .unwrap_err();
        assert!(matches!(err, EngineError::RangeTooLarge { limit: 4, .. }));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_parse_failure_still_clears_old_edges() {
        let g = Grid::new();
        let mut graph = DependencyGraph::new();
        resolve_all("A1", &g, &mut graph, &r("B1")).unwrap();
        assert!(resolve_all("A1 +", &g, &mut graph, &r("B1")).is_err());
        assert!(graph.is_empty());
    }
}
