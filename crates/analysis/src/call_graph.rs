//! Internal call graph and transaction-level assertion aggregation.
//!
//! Records which functions each function (or contract, for construction
//! code) may invoke internally. Assertion targets are bound to transaction
//! roots, so checking one target requires every `assert` reachable from
//! the root through internal calls; that closure is a plain BFS.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::ast::NodeId;

/// Caller to callee edges over functions and contracts.
#[derive(Debug, Default)]
pub struct CallGraph {
    edges: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }

    pub fn insert(&mut self, caller: NodeId, callee: NodeId) {
        self.edges.entry(caller).or_default().insert(callee);
    }

    pub fn callees(&self, caller: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .get(&caller)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// All assertion sites reachable in a transaction rooted at `root`.
    ///
    /// Cycles (mutually recursive functions) are handled by the visited
    /// set; each function's assertions are collected once.
    pub fn transaction_assertions(
        &self,
        root: NodeId,
        function_assertions: &BTreeMap<NodeId, BTreeSet<NodeId>>,
    ) -> BTreeSet<NodeId> {
        let mut assertions = BTreeSet::new();
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::from([root]);
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            if let Some(found) = function_assertions.get(&node) {
                assertions.extend(found.iter().copied());
            }
            for callee in self.callees(node) {
                queue.push_back(callee);
            }
        }
        assertions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bfs_collects_transitive_assertions() {
        let mut graph = CallGraph::new();
        graph.insert(1, 2);
        graph.insert(2, 3);

        let mut assertions = BTreeMap::new();
        assertions.insert(2, BTreeSet::from([20]));
        assertions.insert(3, BTreeSet::from([30, 31]));

        let reachable = graph.transaction_assertions(1, &assertions);
        assert_eq!(reachable, BTreeSet::from([20, 30, 31]));
    }

    #[test]
    fn cycles_terminate() {
        let mut graph = CallGraph::new();
        graph.insert(1, 2);
        graph.insert(2, 1);

        let mut assertions = BTreeMap::new();
        assertions.insert(1, BTreeSet::from([10]));

        let reachable = graph.transaction_assertions(1, &assertions);
        assert_eq!(reachable, BTreeSet::from([10]));
    }

    #[test]
    fn unrelated_functions_are_excluded() {
        let mut graph = CallGraph::new();
        graph.insert(1, 2);

        let mut assertions = BTreeMap::new();
        assertions.insert(9, BTreeSet::from([90]));

        let reachable = graph.transaction_assertions(1, &assertions);
        assert!(reachable.is_empty());
    }
}
