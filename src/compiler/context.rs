//! Per-compilation state threaded through node generation calls.
//!
//! The uniform set and the shared-function registry are constructed fresh
//! for every compile call and passed by mutable reference — never stored in
//! module-level state — so repeated or interleaved compilations cannot leak
//! into one another.

use std::collections::{BTreeSet, HashSet};

use anyhow::{Result, anyhow};

use crate::nodes::ParamMap;

/// The closed set of externally-supplied per-frame values a generated
/// program may reference. Each gets a fixed name, type, and binding slot;
/// only the ones a compilation actually requires are declared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Uniform {
    /// Elapsed time in seconds.
    Time,
    /// Viewport resolution in pixels.
    Resolution,
    /// Pointer position in pixels.
    Pointer,
    /// Frozen minimum-dimension reference size, established once per session.
    RefSize,
}

impl Uniform {
    pub fn name(self) -> &'static str {
        match self {
            Uniform::Time => "u_time",
            Uniform::Resolution => "u_resolution",
            Uniform::Pointer => "u_mouse",
            Uniform::RefSize => "u_ref_size",
        }
    }

    pub fn wgsl_decl(self) -> &'static str {
        match self {
            Uniform::Time => "@group(0) @binding(0) var<uniform> u_time: f32;",
            Uniform::Resolution => "@group(0) @binding(1) var<uniform> u_resolution: vec2f;",
            Uniform::Pointer => "@group(0) @binding(2) var<uniform> u_mouse: vec2f;",
            Uniform::RefSize => "@group(0) @binding(3) var<uniform> u_ref_size: f32;",
        }
    }
}

/// Required-uniform accumulator. Iteration follows declaration/binding order
/// regardless of the order nodes requested uniforms in.
#[derive(Debug, Default)]
pub struct UniformSet {
    required: BTreeSet<Uniform>,
}

impl UniformSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(&mut self, uniform: Uniform) {
        self.required.insert(uniform);
    }

    pub fn contains(&self, uniform: Uniform) -> bool {
        self.required.contains(&uniform)
    }

    pub fn iter(&self) -> impl Iterator<Item = Uniform> + '_ {
        self.required.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }
}

/// Shared-function deduplication registry, scoped to one compilation.
///
/// Many node instances may register the same helper under the same key
/// (five noise nodes all needing `hash3`); the first registration wins and
/// the rest are no-ops. Emission preserves first-insertion order. Two
/// semantically different routines sharing a key would silently produce a
/// wrong program — a contract the node catalog must uphold, since the
/// registry cannot tell source texts apart by meaning.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    entries: Vec<(String, String)>,
    keys: HashSet<String>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `source` under `key` unless the key is already present.
    /// Idempotent and order-independent; safe to call redundantly.
    pub fn add_function(&mut self, key: &str, source: &str) {
        if self.keys.contains(key) {
            return;
        }
        self.keys.insert(key.to_string());
        self.entries.push((key.to_string(), source.to_string()));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, s)| (k.as_str(), s.as_str()))
    }

    /// All registered sources, in first-insertion order.
    pub fn emit(&self) -> String {
        self.entries
            .iter()
            .map(|(_, src)| src.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Context bundle handed to a node's generation function: this node's
/// resolved input expressions, its allocated output variable names, its
/// merged parameter values, and the two shared per-compilation accumulators.
pub struct GenContext<'a> {
    pub node_id: &'a str,
    pub(crate) inputs: Vec<(String, String)>,
    pub(crate) outputs: Vec<(String, String)>,
    pub params: ParamMap,
    pub uniforms: &'a mut UniformSet,
    pub functions: &'a mut FunctionRegistry,
}

impl<'a> GenContext<'a> {
    /// Resolved expression bound to an input port or connectable parameter.
    /// Missing ids indicate a malformed definition and surface as
    /// `CodeGenerationFailed`.
    pub fn input(&self, id: &str) -> Result<&str> {
        self.inputs
            .iter()
            .find(|(k, _)| k == id)
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| anyhow!("unresolved input port: {id}"))
    }

    /// Allocated output variable name for a declared output port.
    pub fn output(&self, id: &str) -> Result<&str> {
        self.outputs
            .iter()
            .find(|(k, _)| k == id)
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| anyhow!("unknown output port: {id}"))
    }

    pub fn param_f64(&self, id: &str) -> Option<f64> {
        crate::dsl::parse_f64(&self.params, id)
    }

    pub fn param_str(&self, id: &str) -> Option<&str> {
        crate::dsl::parse_str(&self.params, id)
    }

    pub fn param_json(&self, id: &str) -> Option<&serde_json::Value> {
        self.params.get(id)
    }

    pub fn add_function(&mut self, key: &str, source: &str) {
        self.functions.add_function(key, source);
    }

    pub fn require_uniform(&mut self, uniform: Uniform) {
        self.uniforms.require(uniform);
    }

    /// Node id with identifier-illegal characters substituted, for helper
    /// names and scratch variables unique to this instance.
    pub fn sanitized_id(&self) -> String {
        sanitize_ident(self.node_id)
    }
}

/// Substitute characters that are legal in a node id but not in a WGSL
/// identifier (uuid hyphens, mostly).
pub fn sanitize_ident(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Deterministic output-variable name for a node's output port.
pub fn output_var(node_id: &str, port_id: &str) -> String {
    format!("node_{}_{}", sanitize_ident(node_id), sanitize_ident(port_id))
}

/// Format a float so WGSL parses it as a float: whole values carry an
/// explicit fractional marker (`5.0`), everything else uses the shortest
/// round-trip form.
pub fn fmt_float(v: f64) -> String {
    if !v.is_finite() {
        return "0.0".to_string();
    }
    if v == v.trunc() && v.abs() < 1e15 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_float_marks_whole_values() {
        assert_eq!(fmt_float(5.0), "5.0");
        assert_eq!(fmt_float(-3.0), "-3.0");
        assert_eq!(fmt_float(0.5), "0.5");
        assert_eq!(fmt_float(12.9898), "12.9898");
        assert_eq!(fmt_float(f64::NAN), "0.0");
    }

    #[test]
    fn sanitize_ident_substitutes_punctuation() {
        assert_eq!(sanitize_ident("a1b2-c3.d4"), "a1b2_c3_d4");
        assert_eq!(output_var("node-7f", "value"), "node_node_7f_value");
    }

    #[test]
    fn function_registry_is_idempotent_and_ordered() {
        let mut reg = FunctionRegistry::new();
        reg.add_function("hash3", "fn hash3() {}");
        reg.add_function("vnoise3d", "fn vnoise3d() {}");
        reg.add_function("hash3", "fn hash3_other() {}");
        assert_eq!(reg.len(), 2);
        let emitted = reg.emit();
        assert_eq!(emitted.matches("fn hash3()").count(), 1);
        assert!(!emitted.contains("hash3_other"));
        // First insertion order is preserved.
        assert!(emitted.find("hash3").unwrap() < emitted.find("vnoise3d").unwrap());
    }

    #[test]
    fn uniform_set_iterates_in_binding_order() {
        let mut set = UniformSet::new();
        set.require(Uniform::RefSize);
        set.require(Uniform::Time);
        set.require(Uniform::Resolution);
        let names: Vec<_> = set.iter().map(|u| u.name()).collect();
        assert_eq!(names, vec!["u_time", "u_resolution", "u_ref_size"]);
    }
}
