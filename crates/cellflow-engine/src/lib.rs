//! cellflow_engine - Spreadsheet formula engine: references, dependencies,
//! cycle detection and recalculation.

pub(crate) mod builtins;
pub mod engine;

#[cfg(test)]
mod tests {
    use crate::engine::*;

    fn r(name: &str) -> CellRef {
        CellRef::from_str(name).unwrap()
    }

    fn set(grid: &Grid, graph: &mut DependencyGraph, name: &str, raw: &str) -> RecalcReport {
        grid.insert(r(name), Cell::from_input(raw));
        update_cell(&r(name), grid, graph, &EngineConfig::default())
    }

    fn show(grid: &Grid, name: &str) -> String {
        display_of(grid, &r(name)).unwrap_or_default()
    }

    #[test]
    fn test_from_str_single_letter_columns() {
        let a1 = r("A1");
        assert_eq!((a1.col, a1.row), (0, 0));
        let z1 = r("Z1");
        assert_eq!((z1.col, z1.row), (25, 0));
    }

    #[test]
    fn test_from_str_multi_letter_columns() {
        assert_eq!(r("AA1").col, 26);
        assert_eq!(r("AZ1").col, 51);
        assert_eq!(r("BA1").col, 52);
    }

    #[test]
    fn test_from_str_invalid_inputs() {
        assert!(CellRef::from_str("").is_none());
        assert!(CellRef::from_str("123").is_none());
        assert!(CellRef::from_str("ABC").is_none());
        assert!(CellRef::from_str("A0").is_none());
        assert!(CellRef::from_str("1A").is_none());
        assert!(CellRef::from_str("a1").is_none());
    }

    #[test]
    fn test_range_functions_evaluation() {
        let grid = Grid::new();
        let mut graph = DependencyGraph::new();
        set(&grid, &mut graph, "A1", "2");
        set(&grid, &mut graph, "A2", "4");
        set(&grid, &mut graph, "A3", "6");
        set(&grid, &mut graph, "B1", "=SUM(A1:A3)");
        set(&grid, &mut graph, "B2", "=MEAN(A1:A3)");
        set(&grid, &mut graph, "B3", "=MEDIAN(A1:A3) + MAX(A1:A3) - MIN(A1:A3)");
        assert_eq!(show(&grid, "B1"), "12");
        assert_eq!(show(&grid, "B2"), "4");
        assert_eq!(show(&grid, "B3"), "8");

        set(&grid, &mut graph, "A2", "10");
        assert_eq!(show(&grid, "B1"), "18");
        assert_eq!(show(&grid, "B2"), "6");
    }

    #[test]
    fn test_corr_over_two_column_range() {
        let grid = Grid::new();
        let mut graph = DependencyGraph::new();
        for (row, (x, y)) in [(1, 2), (2, 4), (3, 7)].iter().enumerate() {
            set(&grid, &mut graph, &format!("A{}", row + 1), &x.to_string());
            set(&grid, &mut graph, &format!("B{}", row + 1), &y.to_string());
        }
        set(&grid, &mut graph, "C1", "=CORR(A1:B3)");
        set(&grid, &mut graph, "C2", "=CORR(A1:A3, B1:B3)");
        let split: f64 = show(&grid, "C1").parse().unwrap();
        let paired: f64 = show(&grid, "C2").parse().unwrap();
        assert!((split - paired).abs() < 1e-12);
        assert!(split > 0.9 && split < 1.0);
    }

    #[test]
    fn test_range_over_formula_cells_follows_updates() {
        let grid = Grid::new();
        let mut graph = DependencyGraph::new();
        set(&grid, &mut graph, "A1", "1");
        set(&grid, &mut graph, "A2", "=A1 * 10");
        set(&grid, &mut graph, "A3", "=SUM(A1:A2)");
        assert_eq!(show(&grid, "A3"), "11");
        set(&grid, &mut graph, "A1", "2");
        assert_eq!(show(&grid, "A3"), "22");
    }

    #[test]
    fn test_range_result_renders_as_array() {
        let grid = Grid::new();
        let mut graph = DependencyGraph::new();
        set(&grid, &mut graph, "A1", "1");
        set(&grid, &mut graph, "A2", "2");
        set(&grid, &mut graph, "B1", "=A1:A2 * 3");
        assert_eq!(show(&grid, "B1"), "[[3, 6]]");
    }

    #[test]
    fn test_detect_cycle_after_recalc() {
        let grid = Grid::new();
        let mut graph = DependencyGraph::new();
        set(&grid, &mut graph, "A1", "=B1");
        set(&grid, &mut graph, "B1", "=C1");
        let report = set(&grid, &mut graph, "C1", "=A1");
        assert!(report.has_errors());
        assert!(detect_cycle(&graph, &r("A1")).is_some());
        for name in ["A1", "B1", "C1"] {
            assert_eq!(show(&grid, name), CIRCULAR_MARKER);
        }
    }
}
