//! Generators for math operation nodes.

use anyhow::Result;
use serde_json::json;

use crate::compiler::context::GenContext;
use crate::dsl;

use super::{NodeDefinition, NodeParameter, ParamMap, PortDefinition, PortType};

pub(crate) fn definitions() -> Vec<NodeDefinition> {
    vec![
        arithmetic(),
        trig(),
        add(),
        multiply(),
        mix(),
        smoothstep(),
        remap(),
    ]
}

const OPERATIONS: &[(&str, &str)] = &[
    ("add", "Add"),
    ("subtract", "Subtract"),
    ("multiply", "Multiply"),
    ("divide", "Divide"),
];

fn op_symbol(op: &str) -> &'static str {
    match op {
        "subtract" => "-",
        "multiply" => "*",
        "divide" => "/",
        _ => "+",
    }
}

/// Neutral default per operation, so unconnected trailing inputs leave the
/// result unchanged.
fn op_default(op: &str) -> f64 {
    match op {
        "multiply" | "divide" => 1.0,
        _ => 0.0,
    }
}

/// Unified add/subtract/multiply/divide with a runtime-variable input count.
/// The hidden `inputCount` parameter drives the port list, so the generator
/// and UI re-derive ports from current parameter values on every pass.
fn arithmetic() -> NodeDefinition {
    NodeDefinition::new(
        "arithmetic",
        "Arithmetic",
        "Math",
        "Add, subtract, multiply, or divide values (2-8 inputs)",
        generate_arithmetic,
    )
    .with_inputs(arithmetic_inputs(&ParamMap::new()))
    .with_dynamic_inputs(arithmetic_inputs)
    .with_outputs(vec![PortDefinition::new("result", "Result", PortType::Float)])
    .with_params(vec![
        NodeParameter::choice("operation", "Operation", "add", OPERATIONS),
        NodeParameter::float("inputCount", "Input Count", 2.0)
            .range(2.0, 8.0, 1.0)
            .hidden(),
    ])
}

fn arithmetic_inputs(params: &ParamMap) -> Vec<PortDefinition> {
    let count = dsl::parse_f64(params, "inputCount").unwrap_or(2.0) as i64;
    let count = count.clamp(2, 8) as usize;
    let op = dsl::parse_str(params, "operation").unwrap_or("add");
    let default = op_default(op);
    (0..count)
        .map(|i| {
            let label = char::from(b'A' + i as u8).to_string();
            PortDefinition::new(&format!("in_{i}"), &label, PortType::Float)
                .with_default(json!(default))
        })
        .collect()
}

fn generate_arithmetic(ctx: &mut GenContext) -> Result<String> {
    let op = ctx.param_str("operation").unwrap_or("add").to_string();
    let count = (ctx.param_f64("inputCount").unwrap_or(2.0) as i64).clamp(2, 8) as usize;
    let symbol = op_symbol(&op);

    let mut parts: Vec<String> = Vec::with_capacity(count);
    for i in 0..count {
        parts.push(ctx.input(&format!("in_{i}"))?.to_string());
    }
    let out = ctx.output("result")?;
    Ok(format!(
        "let {out} = {};",
        parts.join(&format!(" {symbol} "))
    ))
}

const FUNCTIONS: &[(&str, &str)] = &[
    ("sin", "Sin"),
    ("cos", "Cos"),
    ("tan", "Tan"),
    ("abs", "Abs"),
];

fn trig() -> NodeDefinition {
    NodeDefinition::new(
        "trig",
        "Trig",
        "Math",
        "Trigonometric and absolute value functions",
        generate_trig,
    )
    .with_inputs(vec![
        PortDefinition::new("value", "Value", PortType::Float).with_default(json!(0.0)),
    ])
    .with_outputs(vec![PortDefinition::new("result", "Result", PortType::Float)])
    .with_params(vec![
        NodeParameter::choice("func", "Function", "sin", FUNCTIONS),
        NodeParameter::float("frequency", "Frequency", 1.0)
            .range(0.1, 10.0, 0.1)
            .connectable(),
        NodeParameter::float("amplitude", "Amplitude", 1.0)
            .range(0.1, 5.0, 0.1)
            .connectable(),
    ])
}

fn generate_trig(ctx: &mut GenContext) -> Result<String> {
    let func = match ctx.param_str("func") {
        Some(f @ ("sin" | "cos" | "tan" | "abs")) => f.to_string(),
        _ => "sin".to_string(),
    };
    let value = ctx.input("value")?;
    let freq = ctx.input("frequency")?;
    let amp = ctx.input("amplitude")?;
    let out = ctx.output("result")?;
    Ok(format!("let {out} = {func}({value} * {freq}) * {amp};"))
}

fn add() -> NodeDefinition {
    NodeDefinition::new(
        "add",
        "Add",
        "Math",
        "Add two values (component-wise for vectors)",
        generate_add,
    )
    .with_inputs(vec![
        PortDefinition::new("a", "A", PortType::Vec3).with_default(json!([0.0, 0.0, 0.0])),
        PortDefinition::new("b", "B", PortType::Vec3).with_default(json!([0.0, 0.0, 0.0])),
    ])
    .with_outputs(vec![PortDefinition::new("result", "Result", PortType::Vec3)])
}

fn generate_add(ctx: &mut GenContext) -> Result<String> {
    let a = ctx.input("a")?;
    let b = ctx.input("b")?;
    let out = ctx.output("result")?;
    Ok(format!("let {out} = {a} + {b};"))
}

fn multiply() -> NodeDefinition {
    NodeDefinition::new(
        "multiply",
        "Multiply",
        "Math",
        "Multiply two values (component-wise for vectors)",
        generate_multiply,
    )
    .with_inputs(vec![
        PortDefinition::new("a", "A", PortType::Vec3).with_default(json!([1.0, 1.0, 1.0])),
        PortDefinition::new("b", "B", PortType::Vec3).with_default(json!([1.0, 1.0, 1.0])),
    ])
    .with_outputs(vec![PortDefinition::new("result", "Result", PortType::Vec3)])
}

fn generate_multiply(ctx: &mut GenContext) -> Result<String> {
    let a = ctx.input("a")?;
    let b = ctx.input("b")?;
    let out = ctx.output("result")?;
    Ok(format!("let {out} = {a} * {b};"))
}

fn mix() -> NodeDefinition {
    NodeDefinition::new(
        "mix",
        "Mix",
        "Math",
        "Linear interpolation (lerp) between two values",
        generate_mix,
    )
    .with_inputs(vec![
        PortDefinition::new("a", "A", PortType::Vec3).with_default(json!([0.0, 0.0, 0.0])),
        PortDefinition::new("b", "B", PortType::Vec3).with_default(json!([1.0, 1.0, 1.0])),
    ])
    .with_outputs(vec![PortDefinition::new("result", "Result", PortType::Vec3)])
    .with_params(vec![
        NodeParameter::float("factor", "Factor", 0.5)
            .range(0.0, 1.0, 0.01)
            .connectable(),
    ])
}

fn generate_mix(ctx: &mut GenContext) -> Result<String> {
    let a = ctx.input("a")?;
    let b = ctx.input("b")?;
    let factor = ctx.input("factor")?;
    let out = ctx.output("result")?;
    Ok(format!("let {out} = mix({a}, {b}, {factor});"))
}

fn smoothstep() -> NodeDefinition {
    NodeDefinition::new(
        "smoothstep",
        "Smoothstep",
        "Math",
        "Smooth Hermite interpolation between two edges",
        generate_smoothstep,
    )
    .with_inputs(vec![
        PortDefinition::new("edge0", "Edge 0", PortType::Float).with_default(json!(0.0)),
        PortDefinition::new("edge1", "Edge 1", PortType::Float).with_default(json!(1.0)),
        PortDefinition::new("x", "X", PortType::Float).with_default(json!(0.5)),
    ])
    .with_outputs(vec![PortDefinition::new("result", "Result", PortType::Float)])
}

fn generate_smoothstep(ctx: &mut GenContext) -> Result<String> {
    let edge0 = ctx.input("edge0")?;
    let edge1 = ctx.input("edge1")?;
    let x = ctx.input("x")?;
    let out = ctx.output("result")?;
    Ok(format!("let {out} = smoothstep({edge0}, {edge1}, {x});"))
}

fn remap() -> NodeDefinition {
    NodeDefinition::new(
        "remap",
        "Remap",
        "Math",
        "Remap value from input range to output range",
        generate_remap,
    )
    .with_inputs(vec![
        PortDefinition::new("value", "Value", PortType::Float).with_default(json!(0.5)),
        PortDefinition::new("inMin", "In Min", PortType::Float).with_default(json!(0.0)),
        PortDefinition::new("inMax", "In Max", PortType::Float).with_default(json!(1.0)),
        PortDefinition::new("outMin", "Out Min", PortType::Float).with_default(json!(0.0)),
        PortDefinition::new("outMax", "Out Max", PortType::Float).with_default(json!(1.0)),
    ])
    .with_outputs(vec![PortDefinition::new("result", "Result", PortType::Float)])
}

fn generate_remap(ctx: &mut GenContext) -> Result<String> {
    let value = ctx.input("value")?;
    let in_min = ctx.input("inMin")?;
    let in_max = ctx.input("inMax")?;
    let out_min = ctx.input("outMin")?;
    let out_max = ctx.input("outMax")?;
    let out = ctx.output("result")?;
    Ok(format!(
        "let {out} = {out_min} + ({value} - {in_min}) * ({out_max} - {out_min}) / ({in_max} - {in_min});"
    ))
}
