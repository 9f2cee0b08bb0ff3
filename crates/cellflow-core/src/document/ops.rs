use cellflow_engine::engine::{
    Cell, CellRef, RecalcReport, display_of, recalculate_all, update_cell,
};
use tracing::debug;

use super::Document;
use crate::error::{CellflowError, Result};

impl Document {
    /// Set cell contents from user input and recompute everything downstream.
    ///
    /// Empty input clears the cell.
    pub fn set_cell(&mut self, cell_ref: CellRef, input: &str) -> RecalcReport {
        if input.is_empty() {
            return self.clear_cell(&cell_ref);
        }
        self.grid.insert(cell_ref.clone(), Cell::from_input(input));
        update_cell(&cell_ref, &self.grid, &mut self.graph, &self.config)
    }

    /// [`Document::set_cell`] addressed by 0-indexed column `x` and row `y`.
    pub fn set_cell_at(&mut self, x: usize, y: usize, input: &str) -> RecalcReport {
        self.set_cell(CellRef::new(x, y), input)
    }

    /// [`Document::set_cell`] addressed by an `A1`-style name.
    pub fn set_cell_named(&mut self, name: &str, input: &str) -> Result<RecalcReport> {
        let cell_ref = CellRef::from_str(name)
            .ok_or_else(|| CellflowError::InvalidReference(name.to_string()))?;
        Ok(self.set_cell(cell_ref, input))
    }

    /// Remove a cell. Its dependents are recomputed and now read it as `0`.
    pub fn clear_cell(&mut self, cell_ref: &CellRef) -> RecalcReport {
        self.grid.remove(cell_ref);
        update_cell(cell_ref, &self.grid, &mut self.graph, &self.config)
    }

    pub fn display_value(&self, cell_ref: &CellRef) -> Option<String> {
        display_of(&self.grid, cell_ref)
    }

    pub fn raw_value(&self, cell_ref: &CellRef) -> Option<String> {
        self.grid.get(cell_ref).map(|cell| cell.raw_value.clone())
    }

    /// Every cell that would be recomputed after `cell_ref` changes.
    pub fn affected_cells(&self, cell_ref: &CellRef) -> Vec<CellRef> {
        self.graph.affected_cells(cell_ref)
    }

    /// Drop every cell and every dependency edge.
    pub fn reset(&mut self) {
        debug!(cells = self.grid.len(), "resetting document");
        self.grid.clear();
        self.graph.clear();
    }

    /// Replace the document contents with `cells` and recompute every
    /// formula. Empty inputs are skipped.
    pub fn load_cells<I, S>(&mut self, cells: I) -> RecalcReport
    where
        I: IntoIterator<Item = (CellRef, S)>,
        S: AsRef<str>,
    {
        self.reset();
        for (cell_ref, input) in cells {
            let input = input.as_ref();
            if !input.is_empty() {
                self.grid.insert(cell_ref, Cell::from_input(input));
            }
        }
        self.recalculate_all()
    }

    /// Rebuild the dependency graph and recompute every formula cell.
    pub fn recalculate_all(&mut self) -> RecalcReport {
        recalculate_all(&self.grid, &mut self.graph, &self.config)
    }
}
