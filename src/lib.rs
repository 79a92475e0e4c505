//! Compiles editable node graphs into WGSL fragment shaders.
//!
//! A graph is a list of node instances (noise generators, math operators,
//! color transforms) plus typed connections between their ports. The
//! compiler orders the graph, resolves every input to an expression (wired,
//! coerced, or defaulted), invokes each node type's generation function,
//! and assembles a single fragment-stage module alongside a fixed
//! pass-through vertex stage.
//!
//! ```
//! use serde_json::json;
//! use shade_graph::{Edge, Node, ShaderGraph, compile};
//!
//! let graph = ShaderGraph::new(
//!     vec![
//!         Node::new("n1", "color_constant").with_param("color", json!([1.0, 0.0, 1.0])),
//!         Node::new("n2", "fragment_output"),
//!     ],
//!     vec![Edge::new("e1", "n1", "color", "n2", "color")],
//! );
//! let result = compile(&graph);
//! assert!(result.success);
//! assert!(result.fragment_source.contains("vec3f(1.0, 0.0, 1.0)"));
//! ```
//!
//! Compilation is a pure function of its inputs: no state survives a call
//! except the read-only node definition registry, populated once at startup.

pub mod coercion;
pub mod compiler;
pub mod dsl;
pub mod graph;
pub mod nodes;
pub mod registry;
pub mod validation;

pub use compiler::error::{CompilationResult, CompileError, CompileErrorKind};
pub use compiler::{TERMINAL_NODE_TYPE, VERTEX_SHADER, compile, compile_graph};
pub use dsl::{Edge, Endpoint, Node, ShaderGraph};
pub use registry::{NodeRegistry, builtins};
