//! Generators for noise nodes.
//!
//! The `noise` node doubles as a function-reference source: alongside its
//! sampled value it exposes the name of the routine for the selected noise
//! flavor, with the convention `fn(vec3f) -> f32`. Consumers (`fbm`,
//! `domain_warp`) call that routine by name inside their generated code and
//! fall back to a built-in they register themselves when unwired. Nothing
//! checks that a wired routine actually behaves like noise — only the
//! signature convention holds this together.

use anyhow::Result;
use serde_json::json;

use crate::compiler::context::GenContext;

use super::{FunctionKey, NodeDefinition, NodeParameter, ParamMap, PortDefinition, PortType};

pub(crate) fn definitions() -> Vec<NodeDefinition> {
    vec![noise(), fbm(), domain_warp(), turbulence(), ridged()]
}

// --- shared WGSL helpers ---

const MOD289V3: &str = "\
fn mod289v3(x: vec3f) -> vec3f {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}";

const MOD289V4: &str = "\
fn mod289v4(x: vec4f) -> vec4f {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}";

const PERMUTE4: &str = "\
fn permute4(x: vec4f) -> vec4f {
    return mod289v4(((x * 34.0) + vec4f(1.0)) * x);
}";

const TAYLOR_INV_SQRT4: &str = "\
fn taylor_inv_sqrt4(r: vec4f) -> vec4f {
    return vec4f(1.79284291400159) - 0.85373472095314 * r;
}";

const SNOISE3D: &str = "\
fn snoise3d(v: vec3f) -> f32 {
    let C = vec2f(1.0 / 6.0, 1.0 / 3.0);
    let D = vec4f(0.0, 0.5, 1.0, 2.0);
    var i = floor(v + vec3f(dot(v, C.yyy)));
    let x0 = v - i + vec3f(dot(i, C.xxx));
    let g = step(x0.yzx, x0.xyz);
    let l = vec3f(1.0) - g;
    let i1 = min(g.xyz, l.zxy);
    let i2 = max(g.xyz, l.zxy);
    let x1 = x0 - i1 + C.xxx;
    let x2 = x0 - i2 + C.yyy;
    let x3 = x0 - D.yyy;
    i = mod289v3(i);
    let p = permute4(permute4(permute4(
        vec4f(i.z) + vec4f(0.0, i1.z, i2.z, 1.0))
        + vec4f(i.y) + vec4f(0.0, i1.y, i2.y, 1.0))
        + vec4f(i.x) + vec4f(0.0, i1.x, i2.x, 1.0));
    let n_ = 0.142857142857;
    let ns = n_ * D.wyz - D.xzx;
    let j = p - 49.0 * floor(p * ns.z * ns.z);
    let x_ = floor(j * ns.z);
    let y_ = floor(j - 7.0 * x_);
    let x = x_ * ns.x + ns.yyyy;
    let y = y_ * ns.x + ns.yyyy;
    let h = vec4f(1.0) - abs(x) - abs(y);
    let b0 = vec4f(x.xy, y.xy);
    let b1 = vec4f(x.zw, y.zw);
    let s0 = floor(b0) * 2.0 + vec4f(1.0);
    let s1 = floor(b1) * 2.0 + vec4f(1.0);
    let sh = -step(h, vec4f(0.0));
    let a0 = b0.xzyw + s0.xzyw * sh.xxyy;
    let a1 = b1.xzyw + s1.xzyw * sh.zzww;
    var p0 = vec3f(a0.xy, h.x);
    var p1 = vec3f(a0.zw, h.y);
    var p2 = vec3f(a1.xy, h.z);
    var p3 = vec3f(a1.zw, h.w);
    let norm = taylor_inv_sqrt4(vec4f(dot(p0, p0), dot(p1, p1), dot(p2, p2), dot(p3, p3)));
    p0 = p0 * norm.x;
    p1 = p1 * norm.y;
    p2 = p2 * norm.z;
    p3 = p3 * norm.w;
    var m = max(vec4f(0.6) - vec4f(dot(x0, x0), dot(x1, x1), dot(x2, x2), dot(x3, x3)), vec4f(0.0));
    m = m * m;
    return 42.0 * dot(m * m, vec4f(dot(p0, x0), dot(p1, x1), dot(p2, x2), dot(p3, x3)));
}";

const SNOISE3D_01: &str = "\
fn snoise3d_01(p: vec3f) -> f32 {
    return snoise3d(p) * 0.5 + 0.5;
}";

const HASH3: &str = "\
fn hash3(p: vec3f) -> f32 {
    var q = fract(p * 0.1031);
    q = q + vec3f(dot(q, q.zyx + vec3f(31.32)));
    return fract((q.x + q.y) * q.z);
}";

const VNOISE3D: &str = "\
fn vnoise3d(p: vec3f) -> f32 {
    let i = floor(p);
    var f = fract(p);
    f = f * f * (vec3f(3.0) - 2.0 * f);
    return mix(
        mix(mix(hash3(i + vec3f(0.0, 0.0, 0.0)), hash3(i + vec3f(1.0, 0.0, 0.0)), f.x),
            mix(hash3(i + vec3f(0.0, 1.0, 0.0)), hash3(i + vec3f(1.0, 1.0, 0.0)), f.x), f.y),
        mix(mix(hash3(i + vec3f(0.0, 0.0, 1.0)), hash3(i + vec3f(1.0, 0.0, 1.0)), f.x),
            mix(hash3(i + vec3f(0.0, 1.0, 1.0)), hash3(i + vec3f(1.0, 1.0, 1.0)), f.x), f.y),
        f.z);
}";

const HASH3TO3: &str = "\
fn hash3to3(p: vec3f) -> vec3f {
    let q = vec3f(dot(p, vec3f(127.1, 311.7, 74.7)),
                  dot(p, vec3f(269.5, 183.3, 246.1)),
                  dot(p, vec3f(113.5, 271.9, 124.6)));
    return fract(sin(q) * 43758.5453123);
}";

const WORLEY3D: &str = "\
fn worley3d(p: vec3f) -> f32 {
    let i = floor(p);
    let f = fract(p);
    var min_dist = 1.0;
    for (var z = -1; z <= 1; z = z + 1) {
        for (var y = -1; y <= 1; y = y + 1) {
            for (var x = -1; x <= 1; x = x + 1) {
                let neighbor = vec3f(f32(x), f32(y), f32(z));
                let cell = hash3to3(i + neighbor);
                let diff = neighbor + cell - f;
                let dist = dot(diff, diff);
                min_dist = min(min_dist, dist);
            }
        }
    }
    return sqrt(min_dist);
}";

// Single-argument flavor for function-reference consumers.
const BOXNOISE3D: &str = "\
fn boxnoise3d(p: vec3f) -> f32 {
    return hash3(floor(p));
}";

fn register_simplex(ctx: &mut GenContext) {
    ctx.add_function("mod289v3", MOD289V3);
    ctx.add_function("mod289v4", MOD289V4);
    ctx.add_function("permute4", PERMUTE4);
    ctx.add_function("taylor_inv_sqrt4", TAYLOR_INV_SQRT4);
    ctx.add_function("snoise3d", SNOISE3D);
    ctx.add_function("snoise3d_01", SNOISE3D_01);
}

fn register_value_noise(ctx: &mut GenContext) {
    ctx.add_function("hash3", HASH3);
    ctx.add_function("vnoise3d", VNOISE3D);
}

fn register_worley(ctx: &mut GenContext) {
    ctx.add_function("hash3to3", HASH3TO3);
    ctx.add_function("worley3d", WORLEY3D);
}

fn register_box_noise(ctx: &mut GenContext) {
    ctx.add_function("hash3", HASH3);
    ctx.add_function("boxnoise3d", BOXNOISE3D);
}

const NOISE_TYPES: &[(&str, &str)] = &[
    ("simplex", "Simplex"),
    ("value", "Value"),
    ("worley", "Worley"),
    ("box", "Box"),
];

fn noise_function_key(params: &ParamMap) -> String {
    match crate::dsl::parse_str(params, "noiseType") {
        Some("value") => "vnoise3d",
        Some("worley") => "worley3d",
        Some("box") => "boxnoise3d",
        _ => "snoise3d_01",
    }
    .to_string()
}

/// Configurable 3D noise. Outputs both a sampled value and the name of the
/// selected routine for function-reference consumers.
fn noise() -> NodeDefinition {
    NodeDefinition::new(
        "noise",
        "Noise",
        "Noise",
        "Configurable 3D noise: simplex, value, worley, or box",
        generate_noise,
    )
    .with_function_key(FunctionKey::FromParams(noise_function_key))
    .with_inputs(vec![
        PortDefinition::new("coords", "Coords", PortType::Vec2).with_default(json!([0.0, 0.0])),
        PortDefinition::new("z", "Z", PortType::Float).with_default(json!(0.0)),
    ])
    .with_outputs(vec![
        PortDefinition::new("value", "Value", PortType::Float),
        PortDefinition::new("fn", "Fn", PortType::FnRef),
    ])
    .with_params(vec![
        NodeParameter::float("scale", "Scale", 5.0)
            .range(0.1, 20.0, 0.1)
            .connectable(),
        NodeParameter::choice("noiseType", "Type", "simplex", NOISE_TYPES),
        NodeParameter::float("boxFreq", "Box Freq", 1.0)
            .range(0.5, 8.0, 0.5)
            .connectable()
            .show_when("noiseType", json!("box")),
    ])
}

fn generate_noise(ctx: &mut GenContext) -> Result<String> {
    let noise_type = ctx.param_str("noiseType").unwrap_or("simplex").to_string();

    match noise_type.as_str() {
        "value" => register_value_noise(ctx),
        "worley" => register_worley(ctx),
        "box" => register_box_noise(ctx),
        _ => register_simplex(ctx),
    }

    let coords = ctx.input("coords")?;
    let z = ctx.input("z")?;
    let scale = ctx.input("scale")?;
    let value = ctx.output("value")?;

    Ok(match noise_type.as_str() {
        "value" => format!("let {value} = vnoise3d(vec3f({coords} * {scale}, {z}));"),
        "worley" => format!("let {value} = worley3d(vec3f({coords} * {scale}, {z}));"),
        "box" => {
            let box_freq = ctx.input("boxFreq")?;
            format!(
                "let {value} = hash3(floor(vec3f({coords} * {scale}, {z}) * {box_freq}) / {box_freq});"
            )
        }
        _ => format!("let {value} = snoise3d_01(vec3f({coords} * {scale}, {z}));"),
    })
}

const FRACTAL_MODES: &[(&str, &str)] = &[
    ("standard", "Standard"),
    ("turbulence", "Turbulence"),
    ("ridged", "Ridged"),
];

/// Multi-octave fractal accumulator over any wired noise routine.
fn fbm() -> NodeDefinition {
    NodeDefinition::new(
        "fbm",
        "FBM",
        "Noise",
        "Multi-octave fractal noise with wirable noise function",
        generate_fbm,
    )
    .with_inputs(vec![
        PortDefinition::new("coords", "Coords", PortType::Vec2).with_default(json!("auto_uv")),
        PortDefinition::new("phase", "Phase", PortType::Float).with_default(json!(0.0)),
        PortDefinition::new("noiseFn", "Noise Fn", PortType::FnRef)
            .with_default(json!("snoise3d_01")),
    ])
    .with_outputs(vec![PortDefinition::new("value", "Value", PortType::Float)])
    .with_params(vec![
        NodeParameter::float("scale", "Scale", 5.0)
            .range(0.1, 20.0, 0.1)
            .connectable(),
        NodeParameter::choice("fractalMode", "Fractal Mode", "standard", FRACTAL_MODES),
        NodeParameter::float("octaves", "Octaves", 4.0)
            .range(1.0, 8.0, 1.0)
            .connectable(),
        NodeParameter::float("lacunarity", "Lacunarity", 2.0)
            .range(1.0, 4.0, 0.1)
            .connectable(),
        NodeParameter::float("gain", "Gain", 0.5)
            .range(0.1, 0.9, 0.05)
            .connectable(),
    ])
}

fn generate_fbm(ctx: &mut GenContext) -> Result<String> {
    // The simplex fallback backs the unconnected noiseFn default; nothing
    // else registers it in that case. Idempotent when a noise node is wired.
    register_simplex(ctx);

    let fractal_mode = ctx.param_str("fractalMode").unwrap_or("standard").to_string();
    let noise_fn = ctx.input("noiseFn")?.to_string();

    let loop_body = match fractal_mode.as_str() {
        "turbulence" => format!("        total = total + abs({noise_fn}(q) * 2.0 - 1.0) * amp;"),
        "ridged" => format!(
            "        let n = 1.0 - abs({noise_fn}(q) * 2.0 - 1.0);\n        total = total + n * n * amp;"
        ),
        _ => format!("        total = total + {noise_fn}(q) * amp;"),
    };

    // WGSL requires constant loop bounds; octaves is a runtime parameter, so
    // the loop runs to the octave maximum with an early break.
    let fbm_key = format!("fbm_{}", ctx.sanitized_id());
    let fbm_source = format!(
        "fn {fbm_key}(p: vec3f, oct: f32, lac: f32, g: f32) -> f32 {{\n\
         \x20   var q = p;\n\
         \x20   var total = 0.0;\n\
         \x20   var amp = 0.5;\n\
         \x20   var max_amp = 0.0;\n\
         \x20   for (var i = 0; i < 8; i = i + 1) {{\n\
         \x20       if (f32(i) >= oct) {{\n\
         \x20           break;\n\
         \x20       }}\n\
         {loop_body}\n\
         \x20       max_amp = max_amp + amp;\n\
         \x20       q = q * lac;\n\
         \x20       amp = amp * g;\n\
         \x20   }}\n\
         \x20   return total / max_amp;\n\
         }}"
    );
    ctx.add_function(&fbm_key, &fbm_source);

    let coords = ctx.input("coords")?;
    let phase = ctx.input("phase")?;
    let scale = ctx.input("scale")?;
    let octaves = ctx.input("octaves")?;
    let lacunarity = ctx.input("lacunarity")?;
    let gain = ctx.input("gain")?;
    let value = ctx.output("value")?;
    Ok(format!(
        "let {value} = {fbm_key}(vec3f({coords} * {scale}, {phase}), {octaves}, {lacunarity}, {gain});"
    ))
}

/// Distorts coordinates with a wired noise routine for organic warping.
fn domain_warp() -> NodeDefinition {
    NodeDefinition::new(
        "domain_warp",
        "Domain Warp",
        "Noise",
        "Distorts UV coordinates using noise for organic warping effects",
        generate_domain_warp,
    )
    .with_inputs(vec![
        PortDefinition::new("coords", "Coords", PortType::Vec2).with_default(json!("auto_uv")),
        PortDefinition::new("phase", "Phase", PortType::Float).with_default(json!(0.0)),
        PortDefinition::new("noiseFn", "Noise Fn", PortType::FnRef)
            .with_default(json!("vnoise3d")),
    ])
    .with_outputs(vec![
        PortDefinition::new("warped", "Warped", PortType::Vec2),
        PortDefinition::new("warpedPhase", "Warped Phase", PortType::Float),
    ])
    .with_params(vec![
        NodeParameter::float("strength", "Strength", 0.3)
            .range(0.0, 10.0, 0.01)
            .connectable(),
        NodeParameter::float("frequency", "Frequency", 4.0)
            .range(0.1, 20.0, 0.1)
            .connectable(),
        NodeParameter::float("seed", "Seed", 12345.0)
            .range(0.0, 99999.0, 1.0)
            .connectable(),
    ])
}

fn generate_domain_warp(ctx: &mut GenContext) -> Result<String> {
    // Value-noise fallback for the unconnected noiseFn default.
    register_value_noise(ctx);

    let id = ctx.sanitized_id();
    let noise_fn = ctx.input("noiseFn")?;
    let coords = ctx.input("coords")?;
    let phase = ctx.input("phase")?;
    let strength = ctx.input("strength")?;
    let frequency = ctx.input("frequency")?;
    let seed = ctx.input("seed")?;
    let warped = ctx.output("warped")?;
    let warped_phase = ctx.output("warpedPhase")?;

    let seed_off = format!("dw_soff_{id}");
    let seeded = format!("dw_sc_{id}");
    Ok(format!(
        "let {seed_off} = fract(vec2f({seed}) * vec2f(12.9898, 78.233)) * 1000.0;\n\
         let {seeded} = {coords} + {seed_off};\n\
         let {warped}_x = {noise_fn}(vec3f({seeded} * {frequency}, {phase})) * 2.0 - 1.0;\n\
         let {warped}_y = {noise_fn}(vec3f({seeded} * {frequency} + vec2f(100.0), {phase})) * 2.0 - 1.0;\n\
         let {warped}_z = {noise_fn}(vec3f({seeded} * {frequency} + vec2f(73.156), {phase} + 9.151)) * 2.0 - 1.0;\n\
         let {warped} = {coords} + vec2f({warped}_x, {warped}_y) * {strength};\n\
         let {warped_phase} = {phase} + {warped}_z * {strength};"
    ))
}

/// Folds a 0-1 signal around 0.5, creating sharp ridges at the extremes.
fn turbulence() -> NodeDefinition {
    NodeDefinition::new(
        "turbulence",
        "Turbulence",
        "Noise",
        "Folds a 0-1 signal around 0.5",
        generate_turbulence,
    )
    .with_inputs(vec![
        PortDefinition::new("value", "Value", PortType::Float).with_default(json!(0.5)),
    ])
    .with_outputs(vec![PortDefinition::new("result", "Result", PortType::Float)])
}

fn generate_turbulence(ctx: &mut GenContext) -> Result<String> {
    let value = ctx.input("value")?;
    let out = ctx.output("result")?;
    Ok(format!("let {out} = abs({value} * 2.0 - 1.0);"))
}

/// Inverted turbulence squared: bright ridge lines on a dark background.
fn ridged() -> NodeDefinition {
    NodeDefinition::new(
        "ridged",
        "Ridged",
        "Noise",
        "Inverted turbulence squared",
        generate_ridged,
    )
    .with_inputs(vec![
        PortDefinition::new("value", "Value", PortType::Float).with_default(json!(0.5)),
    ])
    .with_outputs(vec![PortDefinition::new("result", "Result", PortType::Float)])
}

fn generate_ridged(ctx: &mut GenContext) -> Result<String> {
    let value = ctx.input("value")?;
    let out = ctx.output("result")?;
    Ok(format!(
        "let {out} = pow(1.0 - abs({value} * 2.0 - 1.0), 2.0);"
    ))
}
