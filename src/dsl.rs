//! Graph document model: node instances, edges, and editing operations.
//!
//! This is the wire format the editor layer hands to the compiler on every
//! invocation. Parameter values are kept as raw `serde_json::Value`s; node
//! definitions decide how to interpret them at generation time.

use std::collections::HashMap;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::coercion;
use crate::registry::NodeRegistry;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ShaderGraph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Edge {
    pub id: String,
    pub from: Endpoint,
    pub to: Endpoint,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Endpoint {
    #[serde(rename = "nodeId")]
    pub node_id: String,
    #[serde(rename = "portId")]
    pub port_id: String,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        from_node: impl Into<String>,
        from_port: impl Into<String>,
        to_node: impl Into<String>,
        to_port: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            from: Endpoint {
                node_id: from_node.into(),
                port_id: from_port.into(),
            },
            to: Endpoint {
                node_id: to_node.into(),
                port_id: to_port.into(),
            },
        }
    }
}

impl ShaderGraph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn edge(&self, edge_id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == edge_id)
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Remove a node and every edge touching it (cascading delete).
    ///
    /// The compiler assumes the editing layer upholds this before invoking
    /// compilation; stale edges are tolerated but never desirable.
    pub fn remove_node(&mut self, node_id: &str) {
        self.nodes.retain(|n| n.id != node_id);
        self.edges
            .retain(|e| e.from.node_id != node_id && e.to.node_id != node_id);
    }

    /// Connect an output port to an input port (or connectable parameter).
    ///
    /// Validates both endpoints against the registry and the coercion table —
    /// the same table the compiler uses, so a connection accepted here can
    /// never be rejected as incompatible at compile time. Any prior edge on
    /// the target port is replaced (single wire per input).
    pub fn connect(&mut self, edge: Edge, registry: &NodeRegistry) -> Result<()> {
        let source = self
            .node(&edge.from.node_id)
            .ok_or_else(|| anyhow!("source node not found: {}", edge.from.node_id))?;
        let target = self
            .node(&edge.to.node_id)
            .ok_or_else(|| anyhow!("target node not found: {}", edge.to.node_id))?;

        let source_def = registry
            .get(&source.node_type)
            .ok_or_else(|| anyhow!("unknown source node type: {}", source.node_type))?;
        let target_def = registry
            .get(&target.node_type)
            .ok_or_else(|| anyhow!("unknown target node type: {}", target.node_type))?;

        let from_ty = source_def
            .find_output(&edge.from.port_id)
            .map(|p| p.ty)
            .ok_or_else(|| {
                anyhow!(
                    "output port {}.{} not found",
                    edge.from.node_id,
                    edge.from.port_id
                )
            })?;
        let to_ty = target_def
            .input_port_type(&edge.to.port_id, &target.params)
            .ok_or_else(|| {
                anyhow!(
                    "input port {}.{} not found",
                    edge.to.node_id,
                    edge.to.port_id
                )
            })?;

        if !coercion::compatible(from_ty, to_ty) {
            bail!("cannot connect {} to {}", from_ty.wgsl(), to_ty.wgsl());
        }

        // Single wire per input: a new connection replaces the old one.
        self.edges.retain(|e| e.to != edge.to);
        self.edges.push(edge);
        Ok(())
    }

    pub fn disconnect(&mut self, edge_id: &str) {
        self.edges.retain(|e| e.id != edge_id);
    }
}

pub fn from_json(text: &str) -> Result<ShaderGraph> {
    serde_json::from_str(text).context("failed to parse shader graph json")
}

pub fn load_graph_from_path(path: impl AsRef<std::path::Path>) -> Result<ShaderGraph> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read shader graph json at {}", path.display()))?;
    from_json(&text)
}

pub fn parse_f64(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<f64> {
    match params.get(key) {
        Some(v) => v
            .as_f64()
            .or_else(|| v.as_u64().map(|x| x as f64))
            .or_else(|| v.as_i64().map(|x| x as f64)),
        None => None,
    }
}

pub fn parse_str<'a>(params: &'a HashMap<String, serde_json::Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}
