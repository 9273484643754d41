//! The dependency graph between formula cells: forward edges (precedent to
//! its dependents) and reverse edges (dependent to its precedents), used to
//! drive recalculation order.

use std::collections::{HashMap, HashSet, VecDeque};
use xlforge_core::{ARef, SheetName};

/// A cell identified by sheet and address, independent of any particular
/// workbook's sheet ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedRef {
    pub sheet: SheetName,
    pub reference: ARef,
}

impl QualifiedRef {
    pub fn new(sheet: SheetName, reference: ARef) -> Self {
        Self { sheet, reference }
    }
}

/// Tracks which cells depend on which. Every edge is stored twice, once per
/// direction, so both "what changed needs to recompute this" and "what does
/// this depend on" are O(1) lookups.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// precedent -> cells that depend on it
    forward: HashMap<QualifiedRef, HashSet<QualifiedRef>>,
    /// dependent -> cells it depends on
    reverse: HashMap<QualifiedRef, HashSet<QualifiedRef>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `dependent`'s formula reads `precedent`.
    pub fn add_dependency(&mut self, precedent: QualifiedRef, dependent: QualifiedRef) {
        self.forward.entry(precedent.clone()).or_default().insert(dependent.clone());
        self.reverse.entry(dependent).or_default().insert(precedent);
    }

    /// Remove every edge touching `cell`, e.g. before re-registering its
    /// formula's new set of precedents.
    pub fn remove_cell(&mut self, cell: &QualifiedRef) {
        if let Some(precedents) = self.reverse.remove(cell) {
            for p in precedents {
                if let Some(deps) = self.forward.get_mut(&p) {
                    deps.remove(cell);
                }
            }
        }
        if let Some(dependents) = self.forward.remove(cell) {
            for d in dependents {
                if let Some(precs) = self.reverse.get_mut(&d) {
                    precs.remove(cell);
                }
            }
        }
    }

    pub fn dependents_of(&self, cell: &QualifiedRef) -> impl Iterator<Item = QualifiedRef> + '_ {
        self.forward.get(cell).into_iter().flat_map(|s| s.iter().cloned())
    }

    pub fn precedents_of(&self, cell: &QualifiedRef) -> impl Iterator<Item = QualifiedRef> + '_ {
        self.reverse.get(cell).into_iter().flat_map(|s| s.iter().cloned())
    }

    /// Every cell transitively affected by a change to `cell`, `cell` itself
    /// excluded (unless reachable again through a cycle).
    pub fn transitive_dependents(&self, cell: &QualifiedRef) -> HashSet<QualifiedRef> {
        let mut seen = HashSet::new();
        let mut stack: Vec<QualifiedRef> = self.dependents_of(cell).collect();
        while let Some(n) = stack.pop() {
            if seen.insert(n.clone()) {
                stack.extend(self.dependents_of(&n));
            }
        }
        seen
    }

    /// Kahn's algorithm over the subgraph reachable (via dependents) from
    /// `roots`. Returns the recalculation order on success.
    ///
    /// On failure, returns the set of cells that could not be ordered: those
    /// still holding unresolved in-degree once the queue drains, i.e. the
    /// cycle itself plus anything downstream of it. Cycles are surfaced as
    /// data here rather than silently dropped, so a caller can report
    /// exactly which cells are unrecalculable.
    pub fn topological_sort(&self, roots: &[QualifiedRef]) -> Result<Vec<QualifiedRef>, Vec<QualifiedRef>> {
        let mut nodes: HashSet<QualifiedRef> = HashSet::new();
        let mut stack: Vec<QualifiedRef> = roots.to_vec();
        while let Some(n) = stack.pop() {
            if nodes.insert(n.clone()) {
                stack.extend(self.dependents_of(&n));
            }
        }

        let mut indegree: HashMap<QualifiedRef, usize> = nodes.iter().map(|n| (n.clone(), 0)).collect();
        for n in &nodes {
            for d in self.dependents_of(n) {
                if let Some(e) = indegree.get_mut(&d) {
                    *e += 1;
                }
            }
        }

        let mut queue: VecDeque<QualifiedRef> =
            indegree.iter().filter(|(_, &deg)| deg == 0).map(|(n, _)| n.clone()).collect();
        let mut order = Vec::with_capacity(nodes.len());

        while let Some(n) = queue.pop_front() {
            order.push(n.clone());
            for d in self.dependents_of(&n) {
                if let Some(e) = indegree.get_mut(&d) {
                    *e -= 1;
                    if *e == 0 {
                        queue.push_back(d);
                    }
                }
            }
        }

        if order.len() == nodes.len() {
            Ok(order)
        } else {
            let ordered: HashSet<_> = order.into_iter().collect();
            Err(nodes.into_iter().filter(|n| !ordered.contains(n)).collect())
        }
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xlforge_core::{Column, Row};

    fn qref(sheet: &str, row: u32, col: u32) -> QualifiedRef {
        QualifiedRef::new(
            SheetName::new(sheet).unwrap(),
            ARef::new(Row::new(row).unwrap(), Column::new(col).unwrap()),
        )
    }

    #[test]
    fn add_dependency_populates_both_directions() {
        let mut g = DependencyGraph::new();
        let a1 = qref("Sheet1", 0, 0);
        let b1 = qref("Sheet1", 0, 1);
        g.add_dependency(a1.clone(), b1.clone());
        assert!(g.dependents_of(&a1).any(|c| c == b1));
        assert!(g.precedents_of(&b1).any(|c| c == a1));
    }

    #[test]
    fn transitive_dependents_follows_chain() {
        let mut g = DependencyGraph::new();
        let a1 = qref("Sheet1", 0, 0);
        let b1 = qref("Sheet1", 0, 1);
        let c1 = qref("Sheet1", 0, 2);
        g.add_dependency(a1.clone(), b1.clone());
        g.add_dependency(b1.clone(), c1.clone());
        let deps = g.transitive_dependents(&a1);
        assert!(deps.contains(&b1));
        assert!(deps.contains(&c1));
    }

    #[test]
    fn topological_sort_orders_precedents_before_dependents() {
        let mut g = DependencyGraph::new();
        let a1 = qref("Sheet1", 0, 0);
        let b1 = qref("Sheet1", 0, 1);
        let c1 = qref("Sheet1", 0, 2);
        g.add_dependency(a1.clone(), b1.clone());
        g.add_dependency(b1.clone(), c1.clone());
        let order = g.topological_sort(&[a1.clone()]).unwrap();
        let pos = |c: &QualifiedRef| order.iter().position(|x| x == c).unwrap();
        assert!(pos(&a1) < pos(&b1));
        assert!(pos(&b1) < pos(&c1));
    }

    #[test]
    fn topological_sort_reports_cycle_as_data_instead_of_dropping_it() {
        let mut g = DependencyGraph::new();
        let a1 = qref("Sheet1", 0, 0);
        let b1 = qref("Sheet1", 0, 1);
        let c1 = qref("Sheet1", 0, 2);
        // A1 -> B1 -> C1 -> A1
        g.add_dependency(a1.clone(), b1.clone());
        g.add_dependency(b1.clone(), c1.clone());
        g.add_dependency(c1.clone(), a1.clone());

        let err = g.topological_sort(&[a1.clone()]).unwrap_err();
        assert_eq!(err.len(), 3);
        assert!(err.contains(&a1));
        assert!(err.contains(&b1));
        assert!(err.contains(&c1));
    }

    #[test]
    fn remove_cell_clears_both_directions() {
        let mut g = DependencyGraph::new();
        let a1 = qref("Sheet1", 0, 0);
        let b1 = qref("Sheet1", 0, 1);
        g.add_dependency(a1.clone(), b1.clone());
        g.remove_cell(&b1);
        assert!(g.dependents_of(&a1).next().is_none());
        assert!(g.precedents_of(&b1).next().is_none());
    }
}
