//! Generators for post-process nodes: pixelation and ordered dithering.
//!
//! These read the fragment's framebuffer position, so they operate in
//! screen space rather than UV space.

use anyhow::Result;
use serde_json::json;

use crate::compiler::context::{GenContext, Uniform, fmt_float};

use super::{NodeDefinition, NodeParameter, PortDefinition, PortType};

pub(crate) fn definitions() -> Vec<NodeDefinition> {
    vec![quantize_uv(), pixel_grid(), bayer_dither()]
}

// Recursive quadrant split, shared by pixel_grid and bayer_dither.
const BAYER8X8: &str = "\
fn bayer8x8(coord: vec2f) -> f32 {
    let p = vec2i(coord - 8.0 * floor(coord / 8.0));
    var b = 0;
    for (var i = 0; i < 3; i = i + 1) {
        let bit = 2 - i;
        let qx = (p.x >> u32(bit)) & 1;
        let qy = (p.y >> u32(bit)) & 1;
        b = b + (2 * qx + 3 * qy - 4 * qx * qy) * (1i << u32(2 * i));
    }
    return f32(b) / 63.0;
}";

const SDF_CIRCLE: &str = "\
fn sdf_circle(p: vec2f) -> f32 {
    return length(p) - 0.45;
}";

const SDF_DIAMOND: &str = "\
fn sdf_diamond(p: vec2f) -> f32 {
    return (abs(p.x) + abs(p.y)) - 0.63;
}";

const SDF_TRIANGLE: &str = "\
fn sdf_triangle(q: vec2f) -> f32 {
    var p = vec2f(q.x, -q.y + 0.05);
    let k = 1.732050808;
    p.x = abs(p.x) - 0.45;
    p.y = p.y + 0.45 / k;
    if (p.x + k * p.y > 0.0) {
        p = vec2f(p.x - k * p.y, -k * p.x - p.y) / 2.0;
    }
    p.x = p.x - clamp(p.x, -0.9, 0.0);
    return -length(p) * sign(p.y);
}";

fn register_shape_sdf(ctx: &mut GenContext, shape: &str) -> &'static str {
    match shape {
        "diamond" => {
            ctx.add_function("sdf_diamond", SDF_DIAMOND);
            "sdf_diamond"
        }
        "triangle" => {
            ctx.add_function("sdf_triangle", SDF_TRIANGLE);
            "sdf_triangle"
        }
        _ => {
            ctx.add_function("sdf_circle", SDF_CIRCLE);
            "sdf_circle"
        }
    }
}

/// Snap coordinates to pixel-grid cell centers, so every screen pixel in a
/// cell samples the same upstream value (chunky pixel look).
fn quantize_uv() -> NodeDefinition {
    NodeDefinition::new(
        "quantize_uv",
        "Quantize UV",
        "Post-process",
        "Snap coordinates to pixel grid cell centers",
        generate_quantize_uv,
    )
    .with_outputs(vec![PortDefinition::new("uv", "UV", PortType::Vec2)])
    .with_params(vec![
        NodeParameter::float("pixelSize", "Pixel Size", 8.0)
            .range(2.0, 256.0, 1.0)
            .connectable(),
    ])
}

fn generate_quantize_uv(ctx: &mut GenContext) -> Result<String> {
    ctx.require_uniform(Uniform::Resolution);
    ctx.require_uniform(Uniform::RefSize);
    let id = ctx.sanitized_id();
    let pixel_size = ctx.input("pixelSize")?;
    let uv = ctx.output("uv")?;
    let px = format!("quv_px_{id}");
    let cell = format!("quv_cell_{id}");
    let center = format!("quv_center_{id}");
    Ok(format!(
        "let {px} = in.position.xy;\n\
         let {cell} = floor({px} / {pixel_size});\n\
         let {center} = ({cell} + vec2f(0.5)) * {pixel_size};\n\
         let {uv} = ({center} / u_resolution - vec2f(0.5)) * u_resolution / u_ref_size + vec2f(0.5);"
    ))
}

const SHAPES: &[(&str, &str)] = &[
    ("square", "Square"),
    ("circle", "Circle"),
    ("diamond", "Diamond"),
    ("triangle", "Triangle"),
];

/// Pixelate with shape masking and ordered dithering. Wire a noise value
/// into `threshold` for binary per-cell on/off.
fn pixel_grid() -> NodeDefinition {
    NodeDefinition::new(
        "pixel_grid",
        "Pixel Grid",
        "Post-process",
        "Pixelate with shape masking and ordered dithering",
        generate_pixel_grid,
    )
    .with_inputs(vec![
        PortDefinition::new("color", "Color", PortType::Vec3).with_default(json!([0.5, 0.5, 0.5])),
    ])
    .with_outputs(vec![PortDefinition::new("result", "Result", PortType::Vec3)])
    .with_params(vec![
        NodeParameter::float("pixelSize", "Pixel Size", 8.0)
            .range(2.0, 20.0, 1.0)
            .connectable(),
        NodeParameter::choice("shape", "Shape", "circle", SHAPES),
        NodeParameter::float("threshold", "Threshold", 1.0)
            .range(0.0, 1.0, 0.01)
            .connectable(),
        NodeParameter::float("dither", "Dither", 0.5)
            .range(0.0, 1.0, 0.01)
            .connectable()
            .show_when("shape", json!("circle")),
    ])
}

fn generate_pixel_grid(ctx: &mut GenContext) -> Result<String> {
    let shape = ctx.param_str("shape").unwrap_or("circle").to_string();
    let is_square = shape == "square";

    ctx.add_function("bayer8x8", BAYER8X8);
    let sdf_fn = if is_square {
        None
    } else {
        Some(register_shape_sdf(ctx, &shape))
    };

    let id = ctx.sanitized_id();
    let color = ctx.input("color")?;
    let pixel_size = ctx.input("pixelSize")?;
    let threshold = ctx.input("threshold")?;
    let dither = ctx.input("dither")?;
    let result = ctx.output("result")?;

    let px = format!("pg_px_{id}");
    let cell = format!("pg_cell_{id}");
    let bv = format!("pg_bv_{id}");
    let mask = format!("pg_m_{id}");

    let mut lines = vec![
        format!("let {px} = in.position.xy;"),
        format!("let {cell} = floor({px} / {pixel_size});"),
        format!("let {bv} = bayer8x8({cell});"),
    ];

    match sdf_fn {
        // Binary threshold: a cell is fully on or fully off.
        None => lines.push(format!("let {mask} = step({bv}, {threshold});")),
        // Shape SDF with a dithered edge, then the binary threshold.
        Some(sdf_fn) => {
            let cf = format!("pg_cf_{id}");
            let dist = format!("pg_d_{id}");
            let sm = format!("pg_sm_{id}");
            lines.push(format!(
                "let {cf} = fract({px} / {pixel_size}) - vec2f(0.5);"
            ));
            lines.push(format!("let {dist} = {sdf_fn}({cf});"));
            lines.push(format!(
                "let {sm} = step({dist} - {dither} * ({bv} - 0.5) * 0.5, 0.0);"
            ));
            lines.push(format!("let {mask} = {sm} * step({bv}, {threshold});"));
        }
    }

    // Masked color on black background.
    lines.push(format!("let {result} = {color} * {mask};"));
    Ok(lines.join("\n"))
}

/// Standalone 8x8 ordered dither threshold for the current pixel. Wire into
/// a mix factor or color mask for creative dithering.
fn bayer_dither() -> NodeDefinition {
    NodeDefinition::new(
        "bayer_dither",
        "Bayer Dither",
        "Post-process",
        "8x8 ordered dither threshold pattern",
        generate_bayer_dither,
    )
    .with_outputs(vec![PortDefinition::new(
        "threshold",
        "Threshold",
        PortType::Float,
    )])
    .with_params(vec![
        NodeParameter::float("scale", "Scale", 1.0).range(1.0, 8.0, 1.0),
    ])
}

fn generate_bayer_dither(ctx: &mut GenContext) -> Result<String> {
    ctx.add_function("bayer8x8", BAYER8X8);
    let id = ctx.sanitized_id();
    let scale = fmt_float(ctx.param_f64("scale").unwrap_or(1.0));
    let threshold = ctx.output("threshold")?;
    let px = format!("bd_px_{id}");
    Ok(format!(
        "let {px} = in.position.xy / {scale};\n\
         let {threshold} = bayer8x8({px});"
    ))
}
