//! Dependency ordering and cycle detection over the shader graph.
//!
//! Cycle detection runs as a separate, always-first pass: the backward DFS
//! used for ordering is not itself safe against cycles, so the two are never
//! folded together. Compilation aborts before any ordering traversal when a
//! cycle exists.

use std::collections::{HashMap, HashSet};

use crate::compiler::error::{CompileError, CompileErrorKind};
use crate::dsl::ShaderGraph;

/// Three-color DFS over edges as source→target. Returns an id of a node on
/// a cycle, or `None` for acyclic graphs.
pub fn find_cycle(graph: &ShaderGraph) -> Option<String> {
    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &graph.edges {
        outgoing
            .entry(edge.from.node_id.as_str())
            .or_default()
            .push(edge.to.node_id.as_str());
    }

    let mut visiting: HashSet<&str> = HashSet::new();
    let mut visited: HashSet<&str> = HashSet::new();

    fn visit<'a>(
        node_id: &'a str,
        outgoing: &HashMap<&'a str, Vec<&'a str>>,
        visiting: &mut HashSet<&'a str>,
        visited: &mut HashSet<&'a str>,
    ) -> bool {
        if visiting.contains(node_id) {
            // Back-edge into a gray node.
            return true;
        }
        if visited.contains(node_id) {
            return false;
        }
        visiting.insert(node_id);
        if let Some(neighbors) = outgoing.get(node_id) {
            for next in neighbors {
                if visit(next, outgoing, visiting, visited) {
                    return true;
                }
            }
        }
        visiting.remove(node_id);
        visited.insert(node_id);
        false
    }

    for node in &graph.nodes {
        if visit(node.id.as_str(), &outgoing, &mut visiting, &mut visited) {
            return Some(node.id.clone());
        }
    }
    None
}

/// Compute the evaluation order: a depth-first traversal backward from the
/// single terminal node (target→source), appending each node after its
/// upstream dependencies. The terminal node comes last; nodes unreachable
/// from it are pruned from the sequence — and thus from generated code —
/// by design.
///
/// Dependencies are visited in source-id order so the result depends only on
/// graph content, never on the incidental ordering of the node or edge
/// arrays. Callers must run [`find_cycle`] first; this traversal assumes an
/// acyclic graph.
pub fn execution_order(
    graph: &ShaderGraph,
    terminal_type: &str,
) -> Result<Vec<String>, CompileError> {
    let terminals: Vec<&str> = graph
        .nodes
        .iter()
        .filter(|n| n.node_type == terminal_type)
        .map(|n| n.id.as_str())
        .collect();

    if terminals.is_empty() {
        return Err(CompileError::graph(
            CompileErrorKind::NoOutputNode,
            format!("graph has no {terminal_type} node; add one to complete the graph"),
        ));
    }
    if terminals.len() > 1 {
        return Err(CompileError::graph(
            CompileErrorKind::MultipleOutputNodes,
            format!(
                "graph has {} {terminal_type} nodes; only one is allowed",
                terminals.len()
            ),
        ));
    }

    let mut incoming: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &graph.edges {
        incoming
            .entry(edge.to.node_id.as_str())
            .or_default()
            .push(edge.from.node_id.as_str());
    }
    for sources in incoming.values_mut() {
        sources.sort_unstable();
        sources.dedup();
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut order: Vec<String> = Vec::new();

    fn visit<'a>(
        node_id: &'a str,
        incoming: &HashMap<&'a str, Vec<&'a str>>,
        visited: &mut HashSet<&'a str>,
        order: &mut Vec<String>,
    ) {
        if visited.contains(node_id) {
            return;
        }
        visited.insert(node_id);
        if let Some(sources) = incoming.get(node_id) {
            for source in sources {
                visit(source, incoming, visited, order);
            }
        }
        order.push(node_id.to_string());
    }

    visit(terminals[0], &incoming, &mut visited, &mut order);
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{Edge, Node, ShaderGraph};

    fn graph(nodes: &[(&str, &str)], edges: &[(&str, &str, &str, &str, &str)]) -> ShaderGraph {
        ShaderGraph::new(
            nodes.iter().map(|(id, ty)| Node::new(*id, *ty)).collect(),
            edges
                .iter()
                .map(|(id, fr, fp, to, tp)| Edge::new(*id, *fr, *fp, *to, *tp))
                .collect(),
        )
    }

    #[test]
    fn orders_dependencies_before_dependents() {
        let g = graph(
            &[("out", "fragment_output"), ("a", "noise"), ("b", "fbm")],
            &[
                ("e1", "a", "value", "b", "phase"),
                ("e2", "b", "value", "out", "color"),
            ],
        );
        let order = execution_order(&g, "fragment_output").unwrap();
        assert_eq!(order, vec!["a", "b", "out"]);
    }

    #[test]
    fn prunes_nodes_unreachable_from_terminal() {
        let g = graph(
            &[
                ("stray", "noise"),
                ("out", "fragment_output"),
                ("a", "time"),
            ],
            &[("e1", "a", "time", "out", "color")],
        );
        let order = execution_order(&g, "fragment_output").unwrap();
        assert_eq!(order, vec!["a", "out"]);
    }

    #[test]
    fn zero_terminals_is_an_error() {
        let g = graph(&[("a", "time")], &[]);
        let err = execution_order(&g, "fragment_output").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::NoOutputNode);
    }

    #[test]
    fn multiple_terminals_is_an_error() {
        let g = graph(
            &[("o1", "fragment_output"), ("o2", "fragment_output")],
            &[],
        );
        let err = execution_order(&g, "fragment_output").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::MultipleOutputNodes);
    }

    #[test]
    fn detects_two_node_cycle() {
        let g = graph(
            &[("a", "add"), ("b", "add"), ("out", "fragment_output")],
            &[
                ("e1", "a", "result", "b", "a"),
                ("e2", "b", "result", "a", "a"),
                ("e3", "b", "result", "out", "color"),
            ],
        );
        assert!(find_cycle(&g).is_some());
    }

    #[test]
    fn detects_self_loop() {
        let g = graph(
            &[("a", "add")],
            &[("e1", "a", "result", "a", "a")],
        );
        assert!(find_cycle(&g).is_some());
    }

    #[test]
    fn acyclic_diamond_is_clean() {
        let g = graph(
            &[
                ("src", "time"),
                ("l", "trig"),
                ("r", "trig"),
                ("out", "fragment_output"),
            ],
            &[
                ("e1", "src", "time", "l", "value"),
                ("e2", "src", "time", "r", "value"),
                ("e3", "l", "result", "out", "color"),
                ("e4", "r", "result", "out", "color2"),
            ],
        );
        assert!(find_cycle(&g).is_none());
        let order = execution_order(&g, "fragment_output").unwrap();
        assert_eq!(order.last().map(String::as_str), Some("out"));
        let pos = |id: &str| order.iter().position(|n| n == id).unwrap();
        assert!(pos("src") < pos("l"));
        assert!(pos("src") < pos("r"));
    }
}
