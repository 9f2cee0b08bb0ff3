//! Dependency tracking between formula cells.
//!
//! The graph is stored in the reverse of the textual reference direction:
//! for every precedent cell it keeps the set of cells whose formulas refer to
//! it. That is the direction walked when a precedent changes and everything
//! downstream must be recomputed.
//!
//! One [`DependencyGraph`] belongs to one open document. The
//! [`EvaluationStack`] lives only for the duration of a single recalculation
//! pass and is threaded explicitly into resolution.

use std::collections::{HashMap, HashSet, VecDeque};

use super::cell_ref::CellRef;
use super::config::RecalcOrder;

/// Reverse dependency map: precedent -> cells that depend on it.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    dependents: HashMap<CellRef, HashSet<CellRef>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `dependent` references `precedent`. Idempotent.
    pub fn add_edge(&mut self, dependent: &CellRef, precedent: &CellRef) {
        self.dependents
            .entry(precedent.clone())
            .or_default()
            .insert(dependent.clone());
    }

    /// Remove `cell` from every dependent set, dropping sets that become empty.
    pub fn clear_outgoing(&mut self, cell: &CellRef) {
        self.dependents.retain(|_, deps| {
            deps.remove(cell);
            !deps.is_empty()
        });
    }

    /// Direct dependents of `cell` (empty if none).
    pub fn dependents_of(&self, cell: &CellRef) -> HashSet<CellRef> {
        self.dependents.get(cell).cloned().unwrap_or_default()
    }

    pub(crate) fn dependents_iter<'a>(
        &'a self,
        cell: &CellRef,
    ) -> impl Iterator<Item = &'a CellRef> + 'a {
        self.dependents.get(cell).into_iter().flatten()
    }

    /// Every cell reachable from `cell` along dependent edges, each exactly
    /// once, in breadth-first discovery order. `cell` itself only appears if
    /// the graph loops back to it.
    pub fn affected_cells(&self, cell: &CellRef) -> Vec<CellRef> {
        let mut affected = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([cell.clone()]);

        while let Some(current) = queue.pop_front() {
            for dep in self.sorted_dependents(&current) {
                if seen.insert(dep.clone()) {
                    affected.push(dep.clone());
                    queue.push_back(dep);
                }
            }
        }

        affected
    }

    /// The cells to revisit after `trigger` changed: `trigger` first, then its
    /// affected set in the requested order.
    ///
    /// Topological order uses Kahn's algorithm restricted to the affected
    /// subgraph; cells still blocked afterwards sit on a cycle and are
    /// appended in discovery order so they get reported rather than skipped.
    pub fn recalc_order(&self, trigger: &CellRef, order: RecalcOrder) -> Vec<CellRef> {
        let affected = self.affected_cells(trigger);
        let mut cells = Vec::with_capacity(affected.len() + 1);
        cells.push(trigger.clone());
        cells.extend(affected.into_iter().filter(|c| c != trigger));

        match order {
            RecalcOrder::Discovery => cells,
            RecalcOrder::Topological => self.topological_sort(cells),
        }
    }

    /// Order `cells` so precedents come before dependents, considering only
    /// edges between members. Cells left on a cycle keep their input order.
    pub(crate) fn topological_sort(&self, cells: Vec<CellRef>) -> Vec<CellRef> {
        let members: HashSet<&CellRef> = cells.iter().collect();
        let mut in_degree: HashMap<&CellRef, usize> = cells.iter().map(|c| (c, 0)).collect();

        for cell in &cells {
            for dep in self.dependents_iter(cell) {
                if dep != cell
                    && let Some(deg) = in_degree.get_mut(dep)
                {
                    *deg += 1;
                }
            }
        }

        let mut queue: VecDeque<&CellRef> = cells.iter().filter(|c| in_degree[c] == 0).collect();
        let mut sorted: Vec<CellRef> = Vec::with_capacity(cells.len());
        let mut placed: HashSet<&CellRef> = HashSet::new();

        while let Some(cell) = queue.pop_front() {
            placed.insert(cell);
            sorted.push(cell.clone());
            for dep in self.sorted_dependents(cell) {
                if dep == *cell || !members.contains(&dep) {
                    continue;
                }
                if let Some((key, deg)) = in_degree.get_key_value(&dep).map(|(k, d)| (*k, *d)) {
                    let next = deg - 1;
                    in_degree.insert(key, next);
                    if next == 0 {
                        queue.push_back(key);
                    }
                }
            }
        }

        sorted.extend(cells.iter().filter(|c| !placed.contains(c)).cloned());
        sorted
    }

    /// Dependents in a stable order so traversals are deterministic.
    fn sorted_dependents(&self, cell: &CellRef) -> Vec<CellRef> {
        let mut deps: Vec<CellRef> = self.dependents_iter(cell).cloned().collect();
        deps.sort();
        deps
    }

    /// Drop every edge (document reload).
    pub fn clear(&mut self) {
        self.dependents.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.dependents.is_empty()
    }

    /// Number of distinct (dependent, precedent) edges.
    pub fn len(&self) -> usize {
        self.dependents.values().map(HashSet::len).sum()
    }

    /// Every precedent `cell` currently references.
    pub fn precedents_of(&self, cell: &CellRef) -> HashSet<CellRef> {
        self.dependents
            .iter()
            .filter(|(_, deps)| deps.contains(cell))
            .map(|(prec, _)| prec.clone())
            .collect()
    }
}

/// Cells currently mid-resolution within one recalculation pass.
#[derive(Debug, Default)]
pub struct EvaluationStack {
    active: HashSet<CellRef>,
}

impl EvaluationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cell: &CellRef) {
        self.active.insert(cell.clone());
    }

    pub fn pop(&mut self, cell: &CellRef) {
        self.active.remove(cell);
    }

    pub fn contains(&self, cell: &CellRef) -> bool {
        self.active.contains(cell)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
