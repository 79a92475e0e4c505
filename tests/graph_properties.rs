//! Property tests: compilation is deterministic and independent of the
//! incidental ordering of the input lists.

use proptest::prelude::*;
use serde_json::json;
use shade_graph::{Edge, Node, ShaderGraph, compile};

fn fixture_nodes() -> Vec<Node> {
    vec![
        Node::new("uv", "uv_coords"),
        Node::new("t", "time"),
        Node::new("n1", "noise").with_param("noiseType", json!("value")),
        Node::new("n2", "noise").with_param("noiseType", json!("worley")),
        Node::new("f", "fbm").with_param("fractalMode", json!("ridged")),
        Node::new("ramp", "color_ramp"),
        Node::new("out", "fragment_output"),
    ]
}

fn fixture_edges() -> Vec<Edge> {
    vec![
        Edge::new("e1", "uv", "uv", "n1", "coords"),
        Edge::new("e2", "t", "time", "n1", "z"),
        Edge::new("e3", "uv", "uv", "f", "coords"),
        Edge::new("e4", "n2", "fn", "f", "noiseFn"),
        Edge::new("e5", "n1", "value", "f", "phase"),
        Edge::new("e6", "f", "value", "ramp", "t"),
        Edge::new("e7", "ramp", "color", "out", "color"),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn output_is_invariant_under_input_list_permutation(
        nodes in Just(fixture_nodes()).prop_shuffle(),
        edges in Just(fixture_edges()).prop_shuffle(),
    ) {
        let canonical = compile(&ShaderGraph::new(fixture_nodes(), fixture_edges()));
        prop_assert!(canonical.success, "canonical errors: {:?}", canonical.errors);

        let permuted = compile(&ShaderGraph::new(nodes, edges));
        prop_assert!(permuted.success, "permuted errors: {:?}", permuted.errors);
        prop_assert_eq!(&canonical.vertex_source, &permuted.vertex_source);
        prop_assert_eq!(&canonical.fragment_source, &permuted.fragment_source);
    }

    #[test]
    fn repeated_compilation_is_byte_identical(_seed in 0u8..8) {
        let graph = ShaderGraph::new(fixture_nodes(), fixture_edges());
        let first = compile(&graph);
        let second = compile(&graph);
        prop_assert!(first.success);
        prop_assert_eq!(&first.fragment_source, &second.fragment_source);
        prop_assert_eq!(&first.vertex_source, &second.vertex_source);
    }
}
