//! Dependency tracking for recalculation ordering
//!
//! The graph is rebuilt by the document-level calculation pass from the
//! precedents of every formula cell. Ordering uses indegree counting so
//! cells evaluate after everything they read; cells left over when no
//! indegree reaches zero sit in or behind a reference cycle.

use crate::context::CellId;
use ahash::{AHashMap, AHashSet};

/// Dependency graph over formula cells
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Cell -> cells that read it
    dependents: AHashMap<CellId, AHashSet<CellId>>,
    /// Cell -> cells it reads
    precedents: AHashMap<CellId, AHashSet<CellId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `dependent` reads `precedent`
    pub fn add_dependency(&mut self, precedent: CellId, dependent: CellId) {
        self.dependents
            .entry(precedent.clone())
            .or_default()
            .insert(dependent.clone());
        self.precedents
            .entry(dependent)
            .or_default()
            .insert(precedent);
    }

    /// Drop every edge touching a cell
    pub fn clear_dependencies(&mut self, cell: &CellId) {
        if let Some(precedents) = self.precedents.remove(cell) {
            for precedent in precedents {
                if let Some(deps) = self.dependents.get_mut(&precedent) {
                    deps.remove(cell);
                }
            }
        }
        if let Some(dependents) = self.dependents.remove(cell) {
            for dependent in dependents {
                if let Some(precs) = self.precedents.get_mut(&dependent) {
                    precs.remove(cell);
                }
            }
        }
    }

    pub fn dependents(&self, cell: &CellId) -> impl Iterator<Item = &CellId> {
        self.dependents
            .get(cell)
            .into_iter()
            .flat_map(|set| set.iter())
    }

    pub fn precedents(&self, cell: &CellId) -> impl Iterator<Item = &CellId> {
        self.precedents
            .get(cell)
            .into_iter()
            .flat_map(|set| set.iter())
    }

    /// Order `cells` so precedents come before their dependents
    ///
    /// Returns the evaluable order and the leftover cells that never
    /// reached indegree zero, i.e. members of a reference cycle and
    /// everything downstream of one. Edges to cells outside `cells` are
    /// ignored.
    pub fn calculation_order(&self, cells: &[CellId]) -> (Vec<CellId>, Vec<CellId>) {
        let members: AHashSet<&CellId> = cells.iter().collect();
        let mut indegree: AHashMap<&CellId, usize> = AHashMap::new();
        for cell in cells {
            let n = self
                .precedents
                .get(cell)
                .map(|set| set.iter().filter(|p| members.contains(p)).count())
                .unwrap_or(0);
            indegree.insert(cell, n);
        }

        let mut ready: Vec<&CellId> = cells
            .iter()
            .filter(|c| indegree.get(*c) == Some(&0))
            .collect();
        let mut ordered = Vec::with_capacity(cells.len());
        let mut done: AHashSet<&CellId> = AHashSet::new();

        while let Some(cell) = ready.pop() {
            if !done.insert(cell) {
                continue;
            }
            ordered.push(cell.clone());
            if let Some(dependents) = self.dependents.get(cell) {
                for dep in dependents {
                    if let Some((key, n)) = indegree.get_key_value(dep).map(|(k, n)| (*k, *n)) {
                        if n > 0 {
                            indegree.insert(key, n - 1);
                            if n == 1 {
                                ready.push(key);
                            }
                        }
                    }
                }
            }
        }

        let leftover = cells
            .iter()
            .filter(|c| !done.contains(c))
            .cloned()
            .collect();
        (ordered, leftover)
    }

    /// Whether any cell in `cells` sits in or behind a cycle
    pub fn has_circular_reference(&self, cells: &[CellId]) -> bool {
        !self.calculation_order(cells).1.is_empty()
    }

    /// The cells of `cells` that sit on a reference cycle: members of a
    /// multi-cell strongly connected component, or self-referencing cells.
    /// Cells merely downstream of a cycle are not included.
    pub fn cycle_cells(&self, cells: &[CellId]) -> Vec<CellId> {
        let ids: AHashMap<&CellId, usize> =
            cells.iter().enumerate().map(|(i, c)| (c, i)).collect();
        let adj: Vec<Vec<usize>> = cells
            .iter()
            .map(|c| {
                self.dependents
                    .get(c)
                    .map(|set| set.iter().filter_map(|d| ids.get(d).copied()).collect())
                    .unwrap_or_default()
            })
            .collect();

        // Iterative Tarjan; explicit frames keep deep chains off the call
        // stack
        let n = cells.len();
        let mut index = vec![usize::MAX; n];
        let mut low = vec![0usize; n];
        let mut on_stack = vec![false; n];
        let mut stack: Vec<usize> = Vec::new();
        let mut next = 0usize;
        let mut out = Vec::new();

        for start in 0..n {
            if index[start] != usize::MAX {
                continue;
            }
            let mut frames: Vec<(usize, usize)> = vec![(start, 0)];
            while let Some(frame) = frames.last_mut() {
                let v = frame.0;
                if index[v] == usize::MAX {
                    index[v] = next;
                    low[v] = next;
                    next += 1;
                    stack.push(v);
                    on_stack[v] = true;
                }
                if frame.1 < adj[v].len() {
                    let w = adj[v][frame.1];
                    frame.1 += 1;
                    if index[w] == usize::MAX {
                        frames.push((w, 0));
                    } else if on_stack[w] {
                        low[v] = low[v].min(index[w]);
                    }
                } else {
                    frames.pop();
                    if let Some(parent) = frames.last() {
                        low[parent.0] = low[parent.0].min(low[v]);
                    }
                    if low[v] == index[v] {
                        let mut scc = Vec::new();
                        while let Some(w) = stack.pop() {
                            on_stack[w] = false;
                            scc.push(w);
                            if w == v {
                                break;
                            }
                        }
                        if scc.len() > 1 || adj[v].contains(&v) {
                            out.extend(scc.into_iter().map(|i| cells[i].clone()));
                        }
                    }
                }
            }
        }
        out
    }
}
