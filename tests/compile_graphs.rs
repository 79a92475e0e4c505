//! End-to-end compilation tests over the built-in catalog.

use serde_json::json;
use shade_graph::nodes::{NodeDefinition, NodeParameter, PortDefinition, PortType};
use shade_graph::{
    CompileErrorKind, Edge, Node, NodeRegistry, ShaderGraph, compile, compile_graph, validation,
};

fn compile_ok(graph: &ShaderGraph) -> shade_graph::CompilationResult {
    let result = compile(graph);
    assert!(
        result.success,
        "expected success, got errors: {:?}",
        result.errors
    );
    result
}

fn assert_valid_wgsl(result: &shade_graph::CompilationResult) {
    validation::validate_wgsl_with_context(&result.vertex_source, "vertex stage")
        .unwrap_or_else(|e| panic!("{e:#}"));
    validation::validate_wgsl_with_context(&result.fragment_source, "fragment stage")
        .unwrap_or_else(|e| panic!("{e:#}"));
}

#[test]
fn graph_without_terminal_fails_with_no_output_node() {
    let graph = ShaderGraph::new(vec![Node::new("n1", "noise")], vec![]);
    let result = compile(&graph);
    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, CompileErrorKind::NoOutputNode);
    assert!(result.fragment_source.is_empty());
    assert!(result.vertex_source.is_empty());
}

#[test]
fn graph_with_two_terminals_fails_with_multiple_output_nodes() {
    let graph = ShaderGraph::new(
        vec![
            Node::new("o1", "fragment_output"),
            Node::new("o2", "fragment_output"),
        ],
        vec![],
    );
    let result = compile(&graph);
    assert!(!result.success);
    assert_eq!(result.errors[0].kind, CompileErrorKind::MultipleOutputNodes);
}

#[test]
fn cycle_reachable_from_terminal_fails_with_cyclic_graph() {
    let graph = ShaderGraph::new(
        vec![
            Node::new("a", "add"),
            Node::new("b", "add"),
            Node::new("out", "fragment_output"),
        ],
        vec![
            Edge::new("e1", "a", "result", "b", "a"),
            Edge::new("e2", "b", "result", "a", "a"),
            Edge::new("e3", "b", "result", "out", "color"),
        ],
    );
    let result = compile(&graph);
    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, CompileErrorKind::CyclicGraph);
    assert!(result.fragment_source.is_empty());
}

#[test]
fn color_constant_into_output_emits_literal_and_final_write() {
    let graph = ShaderGraph::new(
        vec![
            Node::new("n1", "color_constant").with_param("color", json!([1.0, 0.0, 1.0])),
            Node::new("n2", "fragment_output"),
        ],
        vec![Edge::new("e1", "n1", "color", "n2", "color")],
    );
    let result = compile_ok(&graph);
    assert!(
        result
            .fragment_source
            .contains("let node_n1_color = vec3f(1.0, 0.0, 1.0);")
    );
    // vec3 -> vec4 extension with opaque alpha happens in the terminal node.
    assert!(
        result
            .fragment_source
            .contains("return vec4f(node_n1_color, 1.0);")
    );
    assert_valid_wgsl(&result);
}

#[test]
fn disconnected_node_contributes_nothing() {
    let graph = ShaderGraph::new(
        vec![
            Node::new("stray", "noise"),
            Node::new("out", "fragment_output"),
        ],
        vec![],
    );
    let result = compile_ok(&graph);
    // The terminal falls back to its declared default.
    assert!(
        result
            .fragment_source
            .contains("return vec4f(vec3f(0.0, 0.0, 0.0), 1.0);")
    );
    assert!(!result.fragment_source.contains("node_stray"));
    assert_valid_wgsl(&result);
}

#[test]
fn compilation_is_deterministic() {
    let graph = ShaderGraph::new(
        vec![
            Node::new("n", "noise").with_param("noiseType", json!("worley")),
            Node::new("f", "fbm"),
            Node::new("out", "fragment_output"),
        ],
        vec![
            Edge::new("e1", "n", "fn", "f", "noiseFn"),
            Edge::new("e2", "f", "value", "out", "color"),
        ],
    );
    let first = compile_ok(&graph);
    let second = compile_ok(&graph);
    assert_eq!(first.vertex_source, second.vertex_source);
    assert_eq!(first.fragment_source, second.fragment_source);
}

#[test]
fn permuting_node_and_edge_lists_does_not_change_output() {
    let nodes = vec![
        Node::new("n", "noise"),
        Node::new("t", "time"),
        Node::new("f", "fbm"),
        Node::new("out", "fragment_output"),
    ];
    let edges = vec![
        Edge::new("e1", "t", "time", "n", "z"),
        Edge::new("e2", "n", "fn", "f", "noiseFn"),
        Edge::new("e3", "f", "value", "out", "color"),
    ];
    let canonical = compile_ok(&ShaderGraph::new(nodes.clone(), edges.clone()));

    let mut rev_nodes = nodes;
    rev_nodes.reverse();
    let mut rev_edges = edges;
    rev_edges.reverse();
    let permuted = compile_ok(&ShaderGraph::new(rev_nodes, rev_edges));

    assert_eq!(canonical.fragment_source, permuted.fragment_source);
}

#[test]
fn float_output_broadcasts_into_vec3_input() {
    let graph = ShaderGraph::new(
        vec![Node::new("n", "noise"), Node::new("out", "fragment_output")],
        vec![Edge::new("e1", "n", "value", "out", "color")],
    );
    let result = compile_ok(&graph);
    assert!(
        result
            .fragment_source
            .contains("return vec4f(vec3f(node_n_value), 1.0);")
    );
    assert_valid_wgsl(&result);
}

#[test]
fn vec2_output_extends_into_vec3_input() {
    let graph = ShaderGraph::new(
        vec![
            Node::new("v", "vec2_constant").with_param("x", json!(0.25)),
            Node::new("out", "fragment_output"),
        ],
        vec![Edge::new("e1", "v", "value", "out", "color")],
    );
    let result = compile_ok(&graph);
    assert!(
        result
            .fragment_source
            .contains("vec3f(node_v_value, 0.0)")
    );
    assert_valid_wgsl(&result);
}

#[test]
fn shared_helpers_are_emitted_once_across_instances() {
    // Three value-noise instances all register hash3/vnoise3d.
    let graph = ShaderGraph::new(
        vec![
            Node::new("n1", "noise").with_param("noiseType", json!("value")),
            Node::new("n2", "noise").with_param("noiseType", json!("value")),
            Node::new("n3", "noise").with_param("noiseType", json!("value")),
            Node::new("sum", "arithmetic").with_param("inputCount", json!(3)),
            Node::new("out", "fragment_output"),
        ],
        vec![
            Edge::new("e1", "n1", "value", "sum", "in_0"),
            Edge::new("e2", "n2", "value", "sum", "in_1"),
            Edge::new("e3", "n3", "value", "sum", "in_2"),
            Edge::new("e4", "sum", "result", "out", "color"),
        ],
    );
    let result = compile_ok(&graph);
    assert_eq!(result.fragment_source.matches("fn hash3(").count(), 1);
    assert_eq!(result.fragment_source.matches("fn vnoise3d(").count(), 1);
    assert_valid_wgsl(&result);
}

#[test]
fn fbm_with_unconnected_fnref_registers_its_own_fallback() {
    let graph = ShaderGraph::new(
        vec![Node::new("f", "fbm"), Node::new("out", "fragment_output")],
        vec![Edge::new("e1", "f", "value", "out", "color")],
    );
    let result = compile_ok(&graph);
    // The fallback routine is present and called; no dangling symbol.
    assert_eq!(result.fragment_source.matches("fn snoise3d_01(").count(), 1);
    assert!(result.fragment_source.contains("snoise3d_01(q)"));
    assert_valid_wgsl(&result);
}

#[test]
fn wired_fnref_resolves_to_selected_noise_routine() {
    let graph = ShaderGraph::new(
        vec![
            Node::new("n", "noise").with_param("noiseType", json!("worley")),
            Node::new("f", "fbm").with_param("fractalMode", json!("ridged")),
            Node::new("out", "fragment_output"),
        ],
        vec![
            Edge::new("e1", "n", "fn", "f", "noiseFn"),
            Edge::new("e2", "f", "value", "out", "color"),
        ],
    );
    let result = compile_ok(&graph);
    // The consumer's loop calls the wired routine by name. The source noise
    // node registered worley3d itself, upstream in execution order.
    assert!(result.fragment_source.contains("worley3d(q)"));
    assert_eq!(result.fragment_source.matches("fn worley3d(").count(), 1);
    assert_valid_wgsl(&result);
}

#[test]
fn fnref_source_without_function_key_is_an_error() {
    let mut registry = NodeRegistry::with_builtins();
    registry.register(
        NodeDefinition::new("keyless", "Keyless", "Test", "", |_ctx| Ok(String::new()))
            .with_outputs(vec![PortDefinition::new("fn", "Fn", PortType::FnRef)]),
    );
    let graph = ShaderGraph::new(
        vec![
            Node::new("k", "keyless"),
            Node::new("f", "fbm"),
            Node::new("out", "fragment_output"),
        ],
        vec![
            Edge::new("e1", "k", "fn", "f", "noiseFn"),
            Edge::new("e2", "f", "value", "out", "color"),
        ],
    );
    let result = compile_graph(&graph, &registry);
    assert!(!result.success);
    assert!(
        result
            .errors
            .iter()
            .any(|e| e.kind == CompileErrorKind::MissingFunctionKey
                && e.node_id.as_deref() == Some("f"))
    );
}

#[test]
fn missing_default_on_unconnected_input_is_an_error() {
    let mut registry = NodeRegistry::with_builtins();
    registry.register(
        NodeDefinition::new("strict", "Strict", "Test", "", |ctx| {
            let value = ctx.input("value")?;
            let out = ctx.output("out")?;
            Ok(format!("let {out} = {value};"))
        })
        .with_inputs(vec![PortDefinition::new("value", "Value", PortType::Float)])
        .with_outputs(vec![PortDefinition::new("out", "Out", PortType::Float)]),
    );
    let graph = ShaderGraph::new(
        vec![Node::new("s", "strict"), Node::new("out", "fragment_output")],
        vec![Edge::new("e1", "s", "out", "out", "color")],
    );
    let result = compile_graph(&graph, &registry);
    assert!(!result.success);
    let err = &result.errors[0];
    assert_eq!(err.kind, CompileErrorKind::MissingRequiredInput);
    assert_eq!(err.node_id.as_deref(), Some("s"));
}

#[test]
fn unknown_node_type_is_reported_and_others_still_compile_errors() {
    let graph = ShaderGraph::new(
        vec![
            Node::new("mystery", "does_not_exist"),
            Node::new("out", "fragment_output"),
        ],
        vec![Edge::new("e1", "mystery", "value", "out", "color")],
    );
    let result = compile(&graph);
    assert!(!result.success);
    assert!(
        result
            .errors
            .iter()
            .any(|e| e.kind == CompileErrorKind::UnknownNodeType
                && e.node_id.as_deref() == Some("mystery"))
    );
    assert!(result.fragment_source.is_empty());
}

#[test]
fn generation_failures_accumulate_across_nodes() {
    let mut registry = NodeRegistry::with_builtins();
    registry.register(
        NodeDefinition::new("broken", "Broken", "Test", "", |_ctx| {
            anyhow::bail!("deliberate failure")
        })
        .with_outputs(vec![PortDefinition::new("out", "Out", PortType::Float)]),
    );
    let graph = ShaderGraph::new(
        vec![
            Node::new("b1", "broken"),
            Node::new("b2", "broken"),
            Node::new("sum", "arithmetic"),
            Node::new("out", "fragment_output"),
        ],
        vec![
            Edge::new("e1", "b1", "out", "sum", "in_0"),
            Edge::new("e2", "b2", "out", "sum", "in_1"),
            Edge::new("e3", "sum", "result", "out", "color"),
        ],
    );
    let result = compile_graph(&graph, &registry);
    assert!(!result.success);
    // One pass surfaces every offending node, not just the first.
    let failed: Vec<_> = result
        .errors
        .iter()
        .filter(|e| e.kind == CompileErrorKind::CodeGenerationFailed)
        .collect();
    assert_eq!(failed.len(), 2);
    assert_eq!(result.errors_for_node("b1").count(), 1);
    assert_eq!(result.errors_for_node("b2").count(), 1);
}

#[test]
fn dangling_edges_fall_back_to_defaults() {
    // Edge from a node that no longer exists; the compiler must not crash
    // and must treat the port as unconnected.
    let graph = ShaderGraph::new(
        vec![Node::new("out", "fragment_output")],
        vec![Edge::new("e1", "ghost", "value", "out", "color")],
    );
    let result = compile_ok(&graph);
    assert!(
        result
            .fragment_source
            .contains("return vec4f(vec3f(0.0, 0.0, 0.0), 1.0);")
    );
}

#[test]
fn connectable_parameter_accepts_wired_input() {
    let graph = ShaderGraph::new(
        vec![
            Node::new("t", "time"),
            Node::new("n", "noise"),
            Node::new("out", "fragment_output"),
        ],
        vec![
            Edge::new("e1", "t", "time", "n", "scale"),
            Edge::new("e2", "n", "value", "out", "color"),
        ],
    );
    let result = compile_ok(&graph);
    assert!(result.fragment_source.contains("node_t_time"));
    assert!(
        result
            .fragment_source
            .contains("@group(0) @binding(0) var<uniform> u_time: f32;")
    );
    assert_valid_wgsl(&result);
}

#[test]
fn connectable_parameter_shadows_same_named_port() {
    // When a static port and a connectable parameter share an id, the
    // parameter's value wins.
    let mut registry = NodeRegistry::with_builtins();
    registry.register(
        NodeDefinition::new("shadowed", "Shadowed", "Test", "", |ctx| {
            let x = ctx.input("x")?;
            let out = ctx.output("out")?;
            Ok(format!("let {out} = {x};"))
        })
        .with_inputs(vec![
            PortDefinition::new("x", "X", PortType::Float).with_default(json!(1.0)),
        ])
        .with_outputs(vec![PortDefinition::new("out", "Out", PortType::Float)])
        .with_params(vec![NodeParameter::float("x", "X", 7.0).connectable()]),
    );
    let graph = ShaderGraph::new(
        vec![
            Node::new("s", "shadowed"),
            Node::new("out", "fragment_output"),
        ],
        vec![Edge::new("e1", "s", "out", "out", "color")],
    );
    let result = compile_graph(&graph, &registry);
    assert!(result.success, "errors: {:?}", result.errors);
    assert!(result.fragment_source.contains("let node_s_out = 7.0;"));
}

#[test]
fn auto_uv_default_supplies_reference_space_coordinates() {
    let graph = ShaderGraph::new(
        vec![Node::new("f", "fbm"), Node::new("out", "fragment_output")],
        vec![Edge::new("e1", "f", "value", "out", "color")],
    );
    let result = compile_ok(&graph);
    assert!(
        result
            .fragment_source
            .contains("(in.uv - vec2f(0.5)) * u_resolution / u_ref_size + vec2f(0.5)")
    );
    assert!(result.fragment_source.contains("var<uniform> u_resolution"));
    assert!(result.fragment_source.contains("var<uniform> u_ref_size"));
    assert_valid_wgsl(&result);
}

#[test]
fn uniform_declarations_are_deduplicated_and_ordered() {
    let graph = ShaderGraph::new(
        vec![
            Node::new("t", "time"),
            Node::new("uv", "uv_coords"),
            Node::new("n", "noise"),
            Node::new("out", "fragment_output"),
        ],
        vec![
            Edge::new("e1", "uv", "uv", "n", "coords"),
            Edge::new("e2", "t", "time", "n", "z"),
            Edge::new("e3", "n", "value", "out", "color"),
        ],
    );
    let result = compile_ok(&graph);
    let fragment = &result.fragment_source;
    assert_eq!(fragment.matches("var<uniform> u_time").count(), 1);
    assert_eq!(fragment.matches("var<uniform> u_resolution").count(), 1);
    assert_eq!(fragment.matches("var<uniform> u_ref_size").count(), 1);
    let time_at = fragment.find("var<uniform> u_time").unwrap();
    let res_at = fragment.find("var<uniform> u_resolution").unwrap();
    let ref_at = fragment.find("var<uniform> u_ref_size").unwrap();
    assert!(time_at < res_at && res_at < ref_at);
    assert_valid_wgsl(&result);
}

#[test]
fn every_builtin_category_compiles_in_one_kitchen_sink_graph() {
    let graph = ShaderGraph::new(
        vec![
            Node::new("uv", "uv_coords").with_param("rotate", json!(0.5)),
            Node::new("t", "time"),
            Node::new("warp", "domain_warp"),
            Node::new("n", "noise").with_param("noiseType", json!("simplex")),
            Node::new("f", "fbm").with_param("fractalMode", json!("turbulence")),
            Node::new("turb", "turbulence"),
            Node::new("ramp", "color_ramp").with_param(
                "stops",
                json!([
                    {"position": 0.0, "color": [0.05, 0.02, 0.1]},
                    {"position": 0.6, "color": [0.8, 0.3, 0.2]},
                    {"position": 1.0, "color": [1.0, 0.95, 0.8]},
                ]),
            ),
            Node::new("bc", "brightness_contrast").with_param("brightness", json!(0.1)),
            Node::new("pg", "pixel_grid").with_param("shape", json!("triangle")),
            Node::new("out", "fragment_output"),
        ],
        vec![
            Edge::new("e1", "uv", "uv", "warp", "coords"),
            Edge::new("e2", "t", "time", "warp", "phase"),
            Edge::new("e3", "warp", "warped", "n", "coords"),
            Edge::new("e4", "warp", "warpedPhase", "n", "z"),
            Edge::new("e5", "n", "fn", "f", "noiseFn"),
            Edge::new("e6", "warp", "warped", "f", "coords"),
            Edge::new("e7", "f", "value", "turb", "value"),
            Edge::new("e8", "turb", "result", "ramp", "t"),
            Edge::new("e9", "ramp", "color", "bc", "color"),
            Edge::new("e10", "bc", "result", "pg", "color"),
            Edge::new("e11", "pg", "result", "out", "color"),
        ],
    );
    let result = compile_ok(&graph);
    assert_valid_wgsl(&result);
    // Helper shared across Bayer consumers appears exactly once.
    assert_eq!(result.fragment_source.matches("fn bayer8x8(").count(), 1);
    // Every node contributed a commented block, in execution order ending
    // with the terminal.
    let out_at = result.fragment_source.find("// Fragment Output (out)").unwrap();
    let pg_at = result.fragment_source.find("// Pixel Grid (pg)").unwrap();
    assert!(pg_at < out_at);
}

#[test]
fn remaining_builtins_compile_in_a_second_kitchen_sink_graph() {
    let graph = ShaderGraph::new(
        vec![
            Node::new("res", "resolution"),
            Node::new("quv", "quantize_uv").with_param("pixelSize", json!(4)),
            Node::new("rnd", "random").with_param("seed", json!(3)),
            Node::new("fc", "float_constant").with_param("value", json!(2.5)),
            Node::new("v2", "vec2_constant").with_param("x", json!(0.3)),
            Node::new("cc", "color_constant"),
            Node::new("nb", "noise")
                .with_param("noiseType", json!("box"))
                .with_param("boxFreq", json!(2)),
            Node::new("dw", "domain_warp"),
            Node::new("nv", "noise").with_param("noiseType", json!("value")),
            Node::new("tg", "trig").with_param("func", json!("cos")),
            Node::new("ar", "arithmetic").with_param("operation", json!("multiply")),
            Node::new("sm", "smoothstep"),
            Node::new("rp", "remap"),
            Node::new("rg", "ridged"),
            Node::new("hv", "hsv_to_rgb"),
            Node::new("ad", "add"),
            Node::new("ml", "multiply"),
            Node::new("mx", "mix"),
            Node::new("bd", "bayer_dither").with_param("scale", json!(2)),
            Node::new("out", "fragment_output"),
        ],
        vec![
            Edge::new("e1", "res", "resolution", "nb", "coords"),
            Edge::new("e2", "nb", "fn", "dw", "noiseFn"),
            Edge::new("e3", "v2", "value", "dw", "coords"),
            Edge::new("e4", "rnd", "value", "dw", "phase"),
            Edge::new("e5", "quv", "uv", "nv", "coords"),
            Edge::new("e6", "dw", "warpedPhase", "nv", "z"),
            Edge::new("e7", "nv", "value", "rg", "value"),
            Edge::new("e8", "rg", "result", "sm", "x"),
            Edge::new("e9", "fc", "value", "sm", "edge1"),
            Edge::new("e10", "sm", "result", "rp", "value"),
            Edge::new("e11", "rnd", "value", "rp", "outMax"),
            Edge::new("e12", "rnd", "value", "tg", "value"),
            Edge::new("e13", "tg", "result", "ar", "in_0"),
            Edge::new("e14", "rp", "result", "ar", "in_1"),
            Edge::new("e15", "ar", "result", "hv", "h"),
            Edge::new("e16", "hv", "rgb", "mx", "a"),
            Edge::new("e17", "cc", "color", "ml", "a"),
            Edge::new("e18", "hv", "rgb", "ml", "b"),
            Edge::new("e19", "ml", "result", "mx", "b"),
            Edge::new("e20", "bd", "threshold", "mx", "factor"),
            Edge::new("e21", "mx", "result", "ad", "a"),
            Edge::new("e22", "cc", "color", "ad", "b"),
            Edge::new("e23", "ad", "result", "out", "color"),
        ],
    );
    let result = compile_ok(&graph);
    assert_valid_wgsl(&result);
    // The wired fnref resolves to the box-noise routine inside domain warp.
    assert!(result.fragment_source.contains("boxnoise3d(vec3f("));
    assert_eq!(result.fragment_source.matches("fn bayer8x8(").count(), 1);
}

#[test]
fn pixel_grid_shapes_all_generate_valid_wgsl() {
    let graph = ShaderGraph::new(
        vec![
            Node::new("p1", "pixel_grid").with_param("shape", json!("square")),
            Node::new("p2", "pixel_grid").with_param("shape", json!("circle")),
            Node::new("p3", "pixel_grid").with_param("shape", json!("diamond")),
            Node::new("out", "fragment_output"),
        ],
        vec![
            Edge::new("e1", "p1", "result", "p2", "color"),
            Edge::new("e2", "p2", "result", "p3", "color"),
            Edge::new("e3", "p3", "result", "out", "color"),
        ],
    );
    let result = compile_ok(&graph);
    assert_valid_wgsl(&result);
    assert_eq!(result.fragment_source.matches("fn bayer8x8(").count(), 1);
    assert!(result.fragment_source.contains("fn sdf_circle("));
    assert!(result.fragment_source.contains("fn sdf_diamond("));
}

#[test]
fn node_ids_with_punctuation_become_valid_identifiers() {
    let graph = ShaderGraph::new(
        vec![
            Node::new("a5f3c2d1-9b7e-4f00-8c21-aa10b2c3d4e5", "noise"),
            Node::new("out", "fragment_output"),
        ],
        vec![Edge::new(
            "e1",
            "a5f3c2d1-9b7e-4f00-8c21-aa10b2c3d4e5",
            "value",
            "out",
            "color",
        )],
    );
    let result = compile_ok(&graph);
    assert!(
        result
            .fragment_source
            .contains("node_a5f3c2d1_9b7e_4f00_8c21_aa10b2c3d4e5_value")
    );
    assert_valid_wgsl(&result);
}

#[test]
fn vertex_stage_is_fixed_and_valid() {
    let graph = ShaderGraph::new(vec![Node::new("out", "fragment_output")], vec![]);
    let result = compile_ok(&graph);
    assert_eq!(result.vertex_source, shade_graph::VERTEX_SHADER);
    assert_valid_wgsl(&result);
}
