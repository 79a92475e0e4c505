//! Generators for input nodes: coordinates, uniforms, and constants.

use anyhow::Result;
use serde_json::json;

use crate::compiler::context::{GenContext, Uniform, fmt_float};

use super::{NodeDefinition, NodeParameter, PortDefinition, PortType};

pub(crate) fn definitions() -> Vec<NodeDefinition> {
    vec![
        uv_coords(),
        time(),
        resolution(),
        random(),
        float_constant(),
        vec2_constant(),
        color_constant(),
    ]
}

/// UV coordinates in frozen-reference space with an optional
/// scale/rotate/translate transform applied around the center.
fn uv_coords() -> NodeDefinition {
    NodeDefinition::new(
        "uv_coords",
        "UV Coordinates",
        "Input",
        "UV coordinates with optional SRT transform",
        generate_uv_coords,
    )
    .with_outputs(vec![PortDefinition::new("uv", "UV", PortType::Vec2)])
    .with_params(vec![
        NodeParameter::float("scaleX", "Scale X", 1.0)
            .range(0.01, 10.0, 0.01)
            .connectable(),
        NodeParameter::float("scaleY", "Scale Y", 1.0)
            .range(0.01, 10.0, 0.01)
            .connectable(),
        NodeParameter::float("rotate", "Rotate", 0.0)
            .range(-6.2832, 6.2832, 0.01)
            .connectable(),
        NodeParameter::float("offsetX", "Offset X", 0.0)
            .range(-10.0, 10.0, 0.01)
            .connectable(),
        NodeParameter::float("offsetY", "Offset Y", 0.0)
            .range(-10.0, 10.0, 0.01)
            .connectable(),
    ])
}

fn generate_uv_coords(ctx: &mut GenContext) -> Result<String> {
    ctx.require_uniform(Uniform::Resolution);
    ctx.require_uniform(Uniform::RefSize);
    let uv = ctx.output("uv")?;
    let sx = ctx.input("scaleX")?;
    let sy = ctx.input("scaleY")?;
    let rot = ctx.input("rotate")?;
    let ox = ctx.input("offsetX")?;
    let oy = ctx.input("offsetY")?;
    Ok(format!(
        "var {uv} = (in.uv - vec2f(0.5)) * u_resolution / u_ref_size + vec2f(0.5);\n\
         {uv} = {uv} - vec2f(0.5);\n\
         {uv} = {uv} * vec2f({sx}, {sy});\n\
         let {uv}_c = cos({rot});\n\
         let {uv}_s = sin({rot});\n\
         {uv} = vec2f({uv}.x * {uv}_c - {uv}.y * {uv}_s, {uv}.x * {uv}_s + {uv}.y * {uv}_c);\n\
         {uv} = {uv} + vec2f({ox}, {oy}) + vec2f(0.5);"
    ))
}

fn time() -> NodeDefinition {
    NodeDefinition::new(
        "time",
        "Time",
        "Input",
        "Current time in seconds since start",
        generate_time,
    )
    .with_outputs(vec![PortDefinition::new("time", "Time", PortType::Float)])
}

fn generate_time(ctx: &mut GenContext) -> Result<String> {
    ctx.require_uniform(Uniform::Time);
    let out = ctx.output("time")?;
    Ok(format!("let {out} = u_time;"))
}

fn resolution() -> NodeDefinition {
    NodeDefinition::new(
        "resolution",
        "Resolution",
        "Input",
        "Canvas resolution (width, height)",
        generate_resolution,
    )
    .with_outputs(vec![PortDefinition::new(
        "resolution",
        "Resolution",
        PortType::Vec2,
    )])
}

fn generate_resolution(ctx: &mut GenContext) -> Result<String> {
    ctx.require_uniform(Uniform::Resolution);
    let out = ctx.output("resolution")?;
    Ok(format!("let {out} = u_resolution;"))
}

/// Deterministic pseudo-random float per instance. The node id feeds a hash
/// so two instances differ; the hidden seed only changes when the user asks
/// for a new roll, so the value is stable across edits.
fn random() -> NodeDefinition {
    NodeDefinition::new(
        "random",
        "Random",
        "Input",
        "Random float, stable between edits",
        generate_random,
    )
    .with_outputs(vec![PortDefinition::new("value", "Value", PortType::Float)])
    .with_params(vec![
        NodeParameter::float("min", "Min", 0.0)
            .range(-99999.0, 99999.0, 1.0)
            .connectable(),
        NodeParameter::float("max", "Max", 1.0)
            .range(-99999.0, 99999.0, 1.0)
            .connectable(),
        NodeParameter::float("decimals", "Decimals", 7.0).range(0.0, 7.0, 1.0),
        NodeParameter::float("seed", "Seed", 0.0).hidden(),
    ])
}

/// 32-bit string hash of the node id, folded into [0, 1].
fn hash_node_id(id: &str) -> f64 {
    let mut hash: i32 = 0;
    for c in id.chars() {
        hash = hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(c as i32);
    }
    (hash as i64).abs() as f64 / 2147483647.0
}

fn generate_random(ctx: &mut GenContext) -> Result<String> {
    let seed = fmt_float(ctx.param_f64("seed").unwrap_or(0.0));
    let decimals = fmt_float(ctx.param_f64("decimals").unwrap_or(7.0));
    let node_hash = format!("{:.6}", hash_node_id(ctx.node_id));
    let v = ctx.output("value")?;
    let min = ctx.input("min")?;
    let max = ctx.input("max")?;
    Ok(format!(
        "let {v}_step = pow(10.0, -{decimals});\n\
         let {v}_raw = {min} + fract({seed} + {node_hash}) * ({max} - {min});\n\
         let {v} = floor({v}_raw / {v}_step + 0.5) * {v}_step;"
    ))
}

fn float_constant() -> NodeDefinition {
    NodeDefinition::new(
        "float_constant",
        "Number",
        "Input",
        "Constant number value",
        generate_float_constant,
    )
    .with_outputs(vec![PortDefinition::new("value", "Value", PortType::Float)])
    .with_params(vec![
        NodeParameter::float("value", "Value", 1.0).range(-10.0, 10.0, 0.01),
    ])
}

fn generate_float_constant(ctx: &mut GenContext) -> Result<String> {
    let value = fmt_float(ctx.param_f64("value").unwrap_or(1.0));
    let out = ctx.output("value")?;
    Ok(format!("let {out} = {value};"))
}

fn vec2_constant() -> NodeDefinition {
    NodeDefinition::new(
        "vec2_constant",
        "Vec2",
        "Input",
        "Constant 2D vector value",
        generate_vec2_constant,
    )
    .with_outputs(vec![PortDefinition::new("value", "Value", PortType::Vec2)])
    .with_params(vec![
        NodeParameter::float("x", "X", 0.0).range(-10.0, 10.0, 0.01),
        NodeParameter::float("y", "Y", 0.0).range(-10.0, 10.0, 0.01),
    ])
}

fn generate_vec2_constant(ctx: &mut GenContext) -> Result<String> {
    let x = fmt_float(ctx.param_f64("x").unwrap_or(0.0));
    let y = fmt_float(ctx.param_f64("y").unwrap_or(0.0));
    let out = ctx.output("value")?;
    Ok(format!("let {out} = vec2f({x}, {y});"))
}

fn color_constant() -> NodeDefinition {
    NodeDefinition::new(
        "color_constant",
        "Color",
        "Input",
        "Constant RGB color value",
        generate_color_constant,
    )
    .with_outputs(vec![PortDefinition::new("color", "Color", PortType::Vec3)])
    .with_params(vec![NodeParameter::color(
        "color",
        "Color",
        // Magenta default.
        [1.0, 0.0, 1.0],
    )])
}

fn generate_color_constant(ctx: &mut GenContext) -> Result<String> {
    let color = ctx.param_json("color").cloned().unwrap_or(json!([1.0, 0.0, 1.0]));
    let component = |i: usize| fmt_float(color.get(i).and_then(|v| v.as_f64()).unwrap_or(0.0));
    let (r, g, b) = (component(0), component(1), component(2));
    let out = ctx.output("color")?;
    Ok(format!("let {out} = vec3f({r}, {g}, {b});"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_hash_is_stable_and_normalized() {
        let a = hash_node_id("node-1");
        let b = hash_node_id("node-2");
        assert_ne!(a, b);
        assert_eq!(a, hash_node_id("node-1"));
        assert!((0.0..=1.0).contains(&a));
        assert!((0.0..=1.0).contains(&b));
    }
}
