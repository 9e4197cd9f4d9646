//! Counterexample reconstruction.
//!
//! A satisfiable query comes back as a derivation DAG. The root is the
//! reachable error predicate; its children are the summary of the last
//! transaction and, unless that transaction was the construction, an
//! interface node with the contract state before it. Interface nodes
//! repeat that shape, so walking them yields the transaction sequence in
//! reverse.

use contract_fv_solver::CexGraph;

use crate::predicates::PredicateRegistry;

/// Render `name = value` pairs.
pub fn format_variable_model(values: &[(String, String)], separator: &str) -> String {
    values
        .iter()
        .map(|(name, value)| format!("{name} = {value}"))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Walk the derivation DAG into a human-readable transaction trace.
///
/// Returns `None` when the graph is empty or does not have the expected
/// shape (for example, when the driver cannot produce derivations).
pub fn generate_counterexample(
    graph: &CexGraph,
    root: &str,
    registry: &PredicateRegistry,
) -> Option<String> {
    let root_id = graph.root_id(root)?;

    let mut path: Vec<String> = Vec::new();
    let mut local_state = String::new();

    let mut node = root_id;
    // The first summary seen is the last transaction of the trace.
    let mut last_tx_seen = false;
    loop {
        let edges = graph.children(node);
        if edges.is_empty() {
            break;
        }
        assert!(edges.len() <= 2, "derivation nodes have at most two children");

        // The children are unordered; identify the summary child.
        let mut summary_id = edges[0];
        let mut interface_id = None;
        if edges.len() == 2 {
            interface_id = Some(edges[1]);
            let first = registry.find_by_name(&graph.nodes[&summary_id].predicate_name)?;
            if !first.is_summary() {
                summary_id = edges[1];
                interface_id = Some(edges[0]);
            }
            let interface =
                registry.find_by_name(&graph.nodes[&interface_id.unwrap()].predicate_name)?;
            assert!(interface.is_interface(), "sibling of a summary is the pre-state");
        }

        let summary_node = &graph.nodes[&summary_id];
        let summary = registry.find_by_name(&summary_node.predicate_name)?;
        assert!(summary.is_summary(), "transaction nodes are summaries");
        let signature = summary.signature.as_ref()?;
        let args = &summary_node.arguments;

        let state_values = signature.state_values(args);
        if !last_tx_seen {
            last_tx_seen = true;
            // Model local to the failed target: post state, then the
            // final input and output parameter values.
            local_state = format_variable_model(&state_values, ", ") + "\n";
            if signature.function_name.is_some() {
                let inputs = signature.post_input_values(args);
                if !inputs.is_empty() {
                    local_state += &(format_variable_model(&inputs, "\n") + "\n");
                }
                let outputs = signature.post_output_values(args);
                if !outputs.is_empty() {
                    local_state += &(format_variable_model(&outputs, "\n") + "\n");
                }
            }
        } else {
            path.push(format!("State: {}", format_variable_model(&state_values, ", ")));
        }

        path.push(signature.format_summary_call(args));

        match interface_id {
            Some(interface) => node = interface,
            None => break,
        }
    }

    let trace: Vec<&str> = path.iter().rev().map(String::as_str).collect();
    Some(format!(
        "{local_state}\nTransaction trace:\n{}",
        trace.join("\n")
    ))
}

/// Debug rendering of a derivation DAG as Graphviz.
pub fn cex_to_dot(graph: &CexGraph) -> String {
    let node_label = |id: &u32| {
        let node = &graph.nodes[id];
        format!("\"{}({})\"", node.predicate_name, node.arguments.join(", "))
    };
    let mut dot = String::from("digraph {\n");
    for (from, children) in &graph.edges {
        for child in children {
            dot += &format!("{} -> {}\n", node_label(child), node_label(from));
        }
    }
    dot += "}";
    dot
}
