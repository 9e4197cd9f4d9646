use std::collections::BTreeMap;

/// Outcome of a CHC reachability query.
///
/// Note the orientation: `Satisfiable` means the error predicate is
/// reachable (the property is violated), `Unsatisfiable` means it is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResult {
    /// The query is reachable — a counterexample exists.
    Satisfiable,
    /// The query is unreachable — the property is proved.
    Unsatisfiable,
    /// The solver could not decide (timeout, resource limit, incompleteness).
    Unknown,
    /// Redundant solvers returned contradictory answers.
    Conflicting,
    /// The solver failed to run or produced garbage.
    Error,
}

impl CheckResult {
    pub fn is_satisfiable(&self) -> bool {
        matches!(self, CheckResult::Satisfiable)
    }

    pub fn is_unsatisfiable(&self) -> bool {
        matches!(self, CheckResult::Unsatisfiable)
    }
}

/// One node of a counterexample derivation DAG: a predicate instance
/// with its argument values rendered as strings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CexNode {
    pub predicate_name: String,
    pub arguments: Vec<String>,
}

/// A counterexample returned by a Horn solver for a satisfiable query.
///
/// The root node is the reachable error predicate; edges point from a
/// derived instance to the instances used to derive it.
#[derive(Debug, Clone, Default)]
pub struct CexGraph {
    pub nodes: BTreeMap<u32, CexNode>,
    pub edges: BTreeMap<u32, Vec<u32>>,
}

impl CexGraph {
    /// Find the node id whose predicate name matches `root`.
    pub fn root_id(&self, root: &str) -> Option<u32> {
        self.nodes
            .iter()
            .find(|(_, node)| node.predicate_name == root)
            .map(|(id, _)| *id)
    }

    /// Children of a node, empty if it is a leaf.
    pub fn children(&self, id: u32) -> &[u32] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
