//! Node definition types and the built-in catalog.
//!
//! A node definition is a flat behavior record: typed ports, tweakable
//! parameters, and a pure generation function producing a WGSL fragment.
//! There is no inheritance hierarchy — the registry maps type ids to these
//! records, which is what lets the catalog grow without touching the
//! generator.

pub mod color_nodes;
pub mod input_nodes;
pub mod math_nodes;
pub mod noise_nodes;
pub mod output_nodes;
pub mod postprocess_nodes;

use std::collections::HashMap;

use anyhow::Result;

use crate::compiler::context::GenContext;

pub type ParamMap = HashMap<String, serde_json::Value>;

/// Port data types supported by the shader system.
///
/// `Color` is a semantic alias of `Vec3` (the UI shows a color picker).
/// `Sampler2D` is reserved for texture inputs. `FnRef` is symbolic: its
/// value is the identifier of a generated routine, not a number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Color,
    Sampler2D,
    FnRef,
}

impl PortType {
    /// Returns the WGSL type name for this port type.
    pub fn wgsl(self) -> &'static str {
        match self {
            PortType::Float => "f32",
            PortType::Vec2 => "vec2f",
            PortType::Vec3 | PortType::Color => "vec3f",
            PortType::Vec4 => "vec4f",
            PortType::Sampler2D => "texture_2d<f32>",
            PortType::FnRef => "fn",
        }
    }
}

/// An input or output slot on a node.
#[derive(Clone, Debug)]
pub struct PortDefinition {
    pub id: String,
    pub label: String,
    pub ty: PortType,
    /// Literal used when an input is left unconnected. For `FnRef` ports
    /// this is the name of a fallback routine; a `Vec2` port may use the
    /// `"auto_uv"` sentinel to default to the frozen-reference UV.
    pub default: Option<serde_json::Value>,
}

impl PortDefinition {
    pub fn new(id: &str, label: &str, ty: PortType) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            ty,
            default: None,
        }
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Value type of a tweakable parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Float,
    Vec2,
    Vec3,
    Color,
    Enum,
}

impl ParamKind {
    /// Port type this parameter presents when flagged connectable.
    /// Enum parameters cannot be wired.
    pub fn port_type(self) -> Option<PortType> {
        match self {
            ParamKind::Float => Some(PortType::Float),
            ParamKind::Vec2 => Some(PortType::Vec2),
            ParamKind::Vec3 => Some(PortType::Vec3),
            ParamKind::Color => Some(PortType::Color),
            ParamKind::Enum => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ParamOption {
    pub value: String,
    pub label: String,
}

/// Visibility predicate: show a parameter only while another parameter
/// holds a specific value.
#[derive(Clone, Debug)]
pub struct ShowWhen {
    pub param: String,
    pub equals: serde_json::Value,
}

#[derive(Clone, Debug)]
pub struct NodeParameter {
    pub id: String,
    pub label: String,
    pub kind: ParamKind,
    pub default: serde_json::Value,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub options: Vec<ParamOption>,
    pub show_when: Option<ShowWhen>,
    /// Present in data but never user-editable (cached seeds, gradient stops).
    pub hidden: bool,
    /// May also be driven by a wired connection, behaving like an extra
    /// input port that shares this parameter's id.
    pub connectable: bool,
}

impl NodeParameter {
    pub fn float(id: &str, label: &str, default: f64) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind: ParamKind::Float,
            default: serde_json::json!(default),
            min: None,
            max: None,
            step: None,
            options: Vec::new(),
            show_when: None,
            hidden: false,
            connectable: false,
        }
    }

    pub fn color(id: &str, label: &str, default: [f64; 3]) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind: ParamKind::Color,
            default: serde_json::json!(default),
            min: None,
            max: None,
            step: None,
            options: Vec::new(),
            show_when: None,
            hidden: false,
            connectable: false,
        }
    }

    pub fn choice(id: &str, label: &str, default: &str, options: &[(&str, &str)]) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind: ParamKind::Enum,
            default: serde_json::json!(default),
            min: None,
            max: None,
            step: None,
            options: options
                .iter()
                .map(|(value, label)| ParamOption {
                    value: value.to_string(),
                    label: label.to_string(),
                })
                .collect(),
            show_when: None,
            hidden: false,
            connectable: false,
        }
    }

    pub fn range(mut self, min: f64, max: f64, step: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self.step = Some(step);
        self
    }

    pub fn connectable(mut self) -> Self {
        self.connectable = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn show_when(mut self, param: &str, equals: serde_json::Value) -> Self {
        self.show_when = Some(ShowWhen {
            param: param.to_string(),
            equals,
        });
        self
    }
}

/// Generation function: turns a resolved context into a WGSL fragment for
/// the node's body. Helper routines and uniforms are registered through the
/// context as a side effect.
pub type GenerateFn = fn(&mut GenContext) -> Result<String>;

/// Computes the actual input port list from current parameter values, for
/// nodes whose arity is runtime-variable. Must be re-evaluated whenever
/// parameters change — port lists are never cached.
pub type DynamicInputsFn = fn(&ParamMap) -> Vec<PortDefinition>;

/// Name of the routine a node contributes when used as a function-reference
/// source. Either fixed for the node type or derived from parameters.
#[derive(Clone, Copy)]
pub enum FunctionKey {
    Literal(&'static str),
    FromParams(fn(&ParamMap) -> String),
}

pub struct NodeDefinition {
    pub node_type: String,
    pub label: String,
    pub category: String,
    pub description: String,
    pub inputs: Vec<PortDefinition>,
    pub outputs: Vec<PortDefinition>,
    pub params: Vec<NodeParameter>,
    pub dynamic_inputs: Option<DynamicInputsFn>,
    pub function_key: Option<FunctionKey>,
    pub generate: GenerateFn,
}

impl NodeDefinition {
    pub fn new(
        node_type: &str,
        label: &str,
        category: &str,
        description: &str,
        generate: GenerateFn,
    ) -> Self {
        Self {
            node_type: node_type.to_string(),
            label: label.to_string(),
            category: category.to_string(),
            description: description.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            params: Vec::new(),
            dynamic_inputs: None,
            function_key: None,
            generate,
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<PortDefinition>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<PortDefinition>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_params(mut self, params: Vec<NodeParameter>) -> Self {
        self.params = params;
        self
    }

    pub fn with_dynamic_inputs(mut self, f: DynamicInputsFn) -> Self {
        self.dynamic_inputs = Some(f);
        self
    }

    pub fn with_function_key(mut self, key: FunctionKey) -> Self {
        self.function_key = Some(key);
        self
    }

    /// The input ports this node actually presents given its current
    /// parameter values.
    pub fn effective_inputs(&self, params: &ParamMap) -> Vec<PortDefinition> {
        match self.dynamic_inputs {
            Some(f) => f(params),
            None => self.inputs.clone(),
        }
    }

    pub fn find_output(&self, port_id: &str) -> Option<&PortDefinition> {
        self.outputs.iter().find(|p| p.id == port_id)
    }

    /// Type of the named input port or connectable parameter, if either
    /// exists. Connectable parameters shadow same-named ports (parameters
    /// win), matching the generator's resolution order.
    pub fn input_port_type(&self, port_id: &str, params: &ParamMap) -> Option<PortType> {
        if let Some(param) = self
            .params
            .iter()
            .find(|p| p.connectable && p.id == port_id)
        {
            if let Some(ty) = param.kind.port_type() {
                return Some(ty);
            }
        }
        self.effective_inputs(params)
            .iter()
            .find(|p| p.id == port_id)
            .map(|p| p.ty)
    }

    /// Resolve the routine name this node contributes as a function-reference
    /// source, given its current parameter values.
    pub fn resolve_function_key(&self, params: &ParamMap) -> Option<String> {
        match self.function_key {
            Some(FunctionKey::Literal(name)) => Some(name.to_string()),
            Some(FunctionKey::FromParams(f)) => Some(f(params)),
            None => None,
        }
    }

    /// Parameter defaults merged under the instance's current values.
    pub fn merged_params(&self, instance: &ParamMap) -> ParamMap {
        let mut merged: ParamMap = self
            .params
            .iter()
            .map(|p| (p.id.clone(), p.default.clone()))
            .collect();
        for (k, v) in instance {
            merged.insert(k.clone(), v.clone());
        }
        merged
    }
}

/// The full built-in catalog, in palette order.
pub fn builtin_definitions() -> Vec<NodeDefinition> {
    let mut defs = Vec::new();
    defs.extend(input_nodes::definitions());
    defs.extend(math_nodes::definitions());
    defs.extend(noise_nodes::definitions());
    defs.extend(color_nodes::definitions());
    defs.extend(postprocess_nodes::definitions());
    defs.extend(output_nodes::definitions());
    defs
}
