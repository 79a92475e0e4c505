//! Graph-to-WGSL compiler.
//!
//! The generator itself is domain-agnostic glue: it handles cycle checking,
//! ordering, input resolution, coercion, naming, and final assembly. What a
//! node computes, which helper routines it needs, and which uniforms it
//! reads all live inside each node definition's generation function — which
//! is what lets the catalog grow without touching this module.

pub mod context;
pub mod error;

use std::collections::HashMap;

use crate::coercion;
use crate::dsl::{Edge, Node, ShaderGraph};
use crate::graph;
use crate::nodes::{NodeParameter, ParamMap, PortDefinition, PortType};
use crate::registry::{self, NodeRegistry};

use self::context::{FunctionRegistry, GenContext, Uniform, UniformSet, fmt_float, output_var};
use self::error::{CompilationResult, CompileError, CompileErrorKind};

/// The designated terminal node type; exactly one instance per graph.
pub const TERMINAL_NODE_TYPE: &str = "fragment_output";

/// Fixed vertex stage: fullscreen pass-through emitting normalized UV
/// coordinates. Independent of the graph.
pub const VERTEX_SHADER: &str = "\
struct VSOut {
    @builtin(position) position: vec4f,
    @location(0) uv: vec2f,
};

@vertex
fn vs_main(@location(0) position: vec2f) -> VSOut {
    var out: VSOut;
    out.uv = position * 0.5 + vec2f(0.5, 0.5);
    out.position = vec4f(position, 0.0, 1.0);
    return out;
}
";

const FRAGMENT_PREAMBLE: &str = "\
struct VSOut {
    @builtin(position) position: vec4f,
    @location(0) uv: vec2f,
};
";

/// Frozen-reference UV: scales the raw fragment UV by the ratio of the
/// viewport to the session's frozen minimum dimension, so patterns keep
/// their apparent size when the viewport is resized.
const AUTO_UV_EXPR: &str = "((in.uv - vec2f(0.5)) * u_resolution / u_ref_size + vec2f(0.5))";

/// Compile against the built-in catalog.
pub fn compile(graph: &ShaderGraph) -> CompilationResult {
    compile_graph(graph, registry::builtins())
}

/// Compile a node graph into a vertex/fragment WGSL pair.
///
/// Structural failures (no terminal, multiple terminals, cycles) abort with
/// a single error. Per-node failures accumulate across the whole pass and
/// are reported together; in that case no source is emitted at all.
pub fn compile_graph(shader_graph: &ShaderGraph, registry: &NodeRegistry) -> CompilationResult {
    // Cycle check runs first and alone: the ordering traversal below walks
    // backward through edges and is not safe on cyclic input.
    if graph::find_cycle(shader_graph).is_some() {
        return CompilationResult::failure(vec![CompileError::graph(
            CompileErrorKind::CyclicGraph,
            "graph contains a cycle; remove circular dependencies",
        )]);
    }

    let order = match graph::execution_order(shader_graph, TERMINAL_NODE_TYPE) {
        Ok(order) => order,
        Err(err) => return CompilationResult::failure(vec![err]),
    };

    let node_map: HashMap<&str, &Node> = shader_graph
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n))
        .collect();
    let mut incoming: HashMap<&str, Vec<&Edge>> = HashMap::new();
    for edge in &shader_graph.edges {
        incoming
            .entry(edge.to.node_id.as_str())
            .or_default()
            .push(edge);
    }

    // Both accumulators are scoped to this single call, never reused.
    let mut uniforms = UniformSet::new();
    let mut functions = FunctionRegistry::new();
    let mut errors: Vec<CompileError> = Vec::new();
    let mut body: Vec<String> = Vec::new();

    for node_id in &order {
        // The order can name ids that only appear in stale edges; those
        // contribute nothing.
        let Some(node) = node_map.get(node_id.as_str()) else {
            continue;
        };
        let Some(def) = registry.get(&node.node_type) else {
            errors.push(CompileError::node(
                CompileErrorKind::UnknownNodeType,
                format!("unknown node type: {}", node.node_type),
                node_id,
            ));
            continue;
        };

        let params = def.merged_params(&node.params);
        let node_edges = incoming.get(node_id.as_str());
        let mut node_errors: Vec<CompileError> = Vec::new();
        let mut inputs: Vec<(String, String)> = Vec::new();

        // Static or dynamic input ports, resolved against current params.
        for port in def.effective_inputs(&params) {
            let wired = node_edges.and_then(|es| es.iter().find(|e| e.to.port_id == port.id));
            let mut bound: Option<String> = None;
            if let Some(edge) = wired {
                match resolve_wired(edge, port.ty, &node_map, registry, node_id) {
                    Ok(expr) => bound = expr,
                    Err(err) => {
                        node_errors.push(err);
                        continue;
                    }
                }
            }
            let expr = match bound.or_else(|| default_expr(&port, &mut uniforms)) {
                Some(expr) => expr,
                None => {
                    node_errors.push(CompileError::node(
                        CompileErrorKind::MissingRequiredInput,
                        format!(
                            "input \"{}\" on {} has no connection and no default",
                            port.label, def.label
                        ),
                        node_id,
                    ));
                    continue;
                }
            };
            inputs.push((port.id.clone(), expr));
        }

        // Connectable parameters resolve after ports and shadow same-named
        // static ports (parameter wins).
        for param in def.params.iter().filter(|p| p.connectable) {
            let Some(port_ty) = param.kind.port_type() else {
                continue;
            };
            let wired = node_edges.and_then(|es| es.iter().find(|e| e.to.port_id == param.id));
            let mut bound: Option<String> = None;
            if let Some(edge) = wired {
                match resolve_wired(edge, port_ty, &node_map, registry, node_id) {
                    Ok(expr) => bound = expr,
                    Err(err) => {
                        node_errors.push(err);
                        continue;
                    }
                }
            }
            let expr = bound.unwrap_or_else(|| param_literal(param, &params));
            match inputs.iter_mut().find(|(id, _)| id == &param.id) {
                Some(entry) => entry.1 = expr,
                None => inputs.push((param.id.clone(), expr)),
            }
        }

        if !node_errors.is_empty() {
            errors.extend(node_errors);
            continue;
        }

        let outputs: Vec<(String, String)> = def
            .outputs
            .iter()
            .map(|p| (p.id.clone(), output_var(node_id, &p.id)))
            .collect();

        let mut ctx = GenContext {
            node_id: node_id.as_str(),
            inputs,
            outputs,
            params,
            uniforms: &mut uniforms,
            functions: &mut functions,
        };
        match (def.generate)(&mut ctx) {
            Ok(fragment) => {
                body.push(format!("    // {} ({})", def.label, node_id));
                for line in fragment.lines() {
                    if line.is_empty() {
                        body.push(String::new());
                    } else {
                        body.push(format!("    {line}"));
                    }
                }
            }
            Err(err) => {
                errors.push(CompileError::node(
                    CompileErrorKind::CodeGenerationFailed,
                    format!("code generation failed: {err:#}"),
                    node_id,
                ));
            }
        }
    }

    if !errors.is_empty() {
        tracing::debug!(errors = errors.len(), "shader graph compilation failed");
        return CompilationResult::failure(errors);
    }

    let fragment = assemble_fragment(&uniforms, &functions, &body);
    tracing::debug!(
        nodes = order.len(),
        helpers = functions.len(),
        "shader graph compiled"
    );
    CompilationResult::ok(VERTEX_SHADER.to_string(), fragment)
}

/// Resolve a wired input to an expression.
///
/// `Ok(None)` means the edge is dangling (its source node, definition, or
/// port no longer exists) and the port should fall back to its default —
/// the compiler tolerates editor leftovers rather than crashing. The two
/// error cases are a function-reference source with no declared key, and a
/// type pair the coercion table rejects. The latter is normally prevented
/// by the connection gate, but the generator re-validates: the UI check and
/// this code path must not be allowed to diverge silently.
fn resolve_wired(
    edge: &Edge,
    target_ty: PortType,
    node_map: &HashMap<&str, &Node>,
    registry: &NodeRegistry,
    consumer_id: &str,
) -> Result<Option<String>, CompileError> {
    let Some(source) = node_map.get(edge.from.node_id.as_str()) else {
        return Ok(None);
    };
    let Some(source_def) = registry.get(&source.node_type) else {
        return Ok(None);
    };

    if target_ty == PortType::FnRef {
        let source_params = source_def.merged_params(&source.params);
        return match source_def.resolve_function_key(&source_params) {
            Some(key) => Ok(Some(key)),
            None => Err(CompileError::node(
                CompileErrorKind::MissingFunctionKey,
                format!(
                    "source node type \"{}\" declares no function key for a function-reference port",
                    source.node_type
                ),
                consumer_id,
            )),
        };
    }

    let Some(source_port) = source_def.find_output(&edge.from.port_id) else {
        return Ok(None);
    };
    let var = output_var(&edge.from.node_id, &edge.from.port_id);
    match coercion::coerce(&var, source_port.ty, target_ty) {
        Some(expr) => Ok(Some(expr)),
        None => Err(CompileError::node(
            CompileErrorKind::IncompatibleTypes,
            format!(
                "cannot convert {} output {}.{} to {}",
                source_port.ty.wgsl(),
                edge.from.node_id,
                edge.from.port_id,
                target_ty.wgsl()
            ),
            consumer_id,
        )),
    }
}

/// Literal for an unconnected input port, or `None` when the port declares
/// no default (a hard error for value ports).
fn default_expr(port: &PortDefinition, uniforms: &mut UniformSet) -> Option<String> {
    let default = port.default.as_ref()?;
    if port.ty == PortType::FnRef {
        return default.as_str().map(str::to_string);
    }
    if port.ty == PortType::Vec2 && default.as_str() == Some("auto_uv") {
        uniforms.require(Uniform::Resolution);
        uniforms.require(Uniform::RefSize);
        return Some(AUTO_UV_EXPR.to_string());
    }
    Some(format_value(default, port.ty))
}

/// Literal for an unwired connectable parameter, from its current value.
fn param_literal(param: &NodeParameter, params: &ParamMap) -> String {
    let value = params.get(&param.id).unwrap_or(&param.default);
    let ty = param.kind.port_type().unwrap_or(PortType::Float);
    format_value(value, ty)
}

fn format_value(value: &serde_json::Value, ty: PortType) -> String {
    match ty {
        PortType::Float => fmt_float(value.as_f64().unwrap_or(0.0)),
        PortType::Vec2 => constructor("vec2f", value, 2),
        PortType::Vec3 | PortType::Color => constructor("vec3f", value, 3),
        PortType::Vec4 => constructor("vec4f", value, 4),
        PortType::Sampler2D | PortType::FnRef => "0.0".to_string(),
    }
}

fn constructor(name: &str, value: &serde_json::Value, arity: usize) -> String {
    let components: Vec<String> = (0..arity)
        .map(|i| fmt_float(value.get(i).and_then(|v| v.as_f64()).unwrap_or(0.0)))
        .collect();
    format!("{name}({})", components.join(", "))
}

fn assemble_fragment(uniforms: &UniformSet, functions: &FunctionRegistry, body: &[String]) -> String {
    let mut out = String::new();
    out.push_str(FRAGMENT_PREAMBLE);
    out.push('\n');

    for uniform in uniforms.iter() {
        out.push_str(uniform.wgsl_decl());
        out.push('\n');
    }
    if !uniforms.is_empty() {
        out.push('\n');
    }

    if !functions.is_empty() {
        out.push_str(&functions.emit());
        out.push_str("\n\n");
    }

    out.push_str("@fragment\nfn fs_main(in: VSOut) -> @location(0) vec4f {\n");
    for line in body {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("}\n");
    out
}
