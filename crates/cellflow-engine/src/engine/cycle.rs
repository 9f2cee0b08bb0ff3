//! Circular dependency detection for formula cells.
//!
//! When a formula is resolved, every reference it makes is recorded as an
//! edge and then checked: if the referenced cell can reach the referencing
//! cell again along dependent edges, the edge closes a cycle (e.g., A1
//! references B1, B1 references C1, C1 references A1). Depth-first search
//! finds such cycles before they can cause infinite evaluation loops.
//!
//! The search is iterative so that long dependency chains cannot exhaust the
//! call stack.

use std::collections::HashSet;

use super::cell_ref::CellRef;
use super::deps::DependencyGraph;

/// Detect a cycle reachable from `start` by following dependent edges.
///
/// Returns the cycle trimmed to begin at the repeated cell, with that cell
/// repeated at the end (e.g. `[B1, C1, B1]`), or None if every path from
/// `start` terminates.
pub fn detect_cycle(graph: &DependencyGraph, start: &CellRef) -> Option<Vec<CellRef>> {
    search(graph, vec![start.clone()], |_| true)
}

/// Check whether the edge "`dependent` references `precedent`", already
/// recorded in `graph`, closes a cycle.
///
/// The walk starts at `precedent` and steps through `dependent` first; only a
/// path that comes back to one of the two counts, so unrelated cycles further
/// downstream do not implicate `dependent`.
pub fn find_closing_cycle(
    graph: &DependencyGraph,
    dependent: &CellRef,
    precedent: &CellRef,
) -> Option<Vec<CellRef>> {
    if dependent == precedent {
        return Some(vec![precedent.clone(), precedent.clone()]);
    }
    search(
        graph,
        vec![precedent.clone(), dependent.clone()],
        |repeated| repeated == precedent || repeated == dependent,
    )
}

fn search(
    graph: &DependencyGraph,
    mut path: Vec<CellRef>,
    accept: impl Fn(&CellRef) -> bool,
) -> Option<Vec<CellRef>> {
    let mut on_path: HashSet<CellRef> = path.iter().cloned().collect();
    let mut explored: HashSet<CellRef> = HashSet::new();
    let mut frames = match path.last() {
        Some(tip) => vec![children(graph, tip)],
        None => return None,
    };

    loop {
        let next = match frames.last_mut() {
            Some(frame) => frame.next(),
            None => return None,
        };

        match next {
            Some(next) => {
                if on_path.contains(&next) {
                    if accept(&next) {
                        let pos = path.iter().position(|c| *c == next).unwrap_or_default();
                        let mut cycle = path[pos..].to_vec();
                        cycle.push(next);
                        return Some(cycle);
                    }
                    continue;
                }
                if explored.contains(&next) {
                    continue;
                }
                on_path.insert(next.clone());
                frames.push(children(graph, &next));
                path.push(next);
            }
            None => {
                frames.pop();
                if let Some(done) = path.pop() {
                    on_path.remove(&done);
                    explored.insert(done);
                }
            }
        }
    }
}

fn children(graph: &DependencyGraph, cell: &CellRef) -> std::vec::IntoIter<CellRef> {
    let mut deps: Vec<CellRef> = graph.dependents_iter(cell).cloned().collect();
    deps.sort();
    deps.into_iter()
}
