//! Generators for color nodes.

use anyhow::Result;
use serde_json::json;

use crate::compiler::context::{GenContext, fmt_float};

use super::{NodeDefinition, NodeParameter, PortDefinition, PortType};

pub(crate) fn definitions() -> Vec<NodeDefinition> {
    vec![color_ramp(), hsv_to_rgb(), brightness_contrast()]
}

const INTERPOLATIONS: &[(&str, &str)] = &[
    ("smooth", "Smooth"),
    ("linear", "Linear"),
    ("constant", "Constant"),
];

/// Map a 0-1 value onto a multi-stop color gradient. The stop list lives in
/// a hidden parameter as serialized data the ramp-editing widget maintains.
fn color_ramp() -> NodeDefinition {
    NodeDefinition::new(
        "color_ramp",
        "Color Ramp",
        "Color",
        "Map a float value to a color gradient",
        generate_color_ramp,
    )
    .with_inputs(vec![
        PortDefinition::new("t", "Value", PortType::Float).with_default(json!(0.5)),
    ])
    .with_outputs(vec![PortDefinition::new("color", "Color", PortType::Vec3)])
    .with_params(vec![
        NodeParameter::choice("interpolation", "Interpolation", "smooth", INTERPOLATIONS),
        {
            let mut stops = NodeParameter::float("stops", "Stops", 0.0);
            stops.default = json!([]);
            stops.hidden()
        },
    ])
}

struct ColorStop {
    position: f64,
    color: [f64; 3],
}

fn parse_stops(value: Option<&serde_json::Value>) -> Vec<ColorStop> {
    let mut stops: Vec<ColorStop> = value
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|stop| {
                    let position = stop.get("position")?.as_f64()?;
                    let color = stop.get("color")?.as_array()?;
                    let component =
                        |i: usize| color.get(i).and_then(|c| c.as_f64()).unwrap_or(0.0);
                    Some(ColorStop {
                        position,
                        color: [component(0), component(1), component(2)],
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    if stops.len() < 2 {
        stops = vec![
            ColorStop {
                position: 0.0,
                color: [0.0, 0.0, 0.0],
            },
            ColorStop {
                position: 1.0,
                color: [1.0, 1.0, 1.0],
            },
        ];
    }
    stops.sort_by(|a, b| a.position.total_cmp(&b.position));
    stops
}

fn generate_color_ramp(ctx: &mut GenContext) -> Result<String> {
    let interp = ctx.param_str("interpolation").unwrap_or("smooth").to_string();
    let stops = parse_stops(ctx.param_json("stops"));

    let t = ctx.input("t")?;
    let c = ctx.output("color")?;

    let stop_color = |stop: &ColorStop| {
        format!(
            "vec3f({}, {}, {})",
            fmt_float(stop.color[0]),
            fmt_float(stop.color[1]),
            fmt_float(stop.color[2])
        )
    };

    let mut lines = vec![format!("var {c} = {};", stop_color(&stops[0]))];

    // Chain one mix per stop; each factor ramps in over the preceding span.
    for window in stops.windows(2) {
        let (prev, curr) = (&window[0], &window[1]);
        let factor = if (curr.position - prev.position).abs() < 1e-4 {
            // Coincident stops are a hard step regardless of mode.
            format!("step({}, {t})", fmt_float(curr.position))
        } else {
            match interp.as_str() {
                "linear" => format!(
                    "clamp(({t} - {}) / ({} - {}), 0.0, 1.0)",
                    fmt_float(prev.position),
                    fmt_float(curr.position),
                    fmt_float(prev.position)
                ),
                "constant" => format!("step({}, {t})", fmt_float(curr.position)),
                _ => format!(
                    "smoothstep({}, {}, {t})",
                    fmt_float(prev.position),
                    fmt_float(curr.position)
                ),
            }
        };
        lines.push(format!("{c} = mix({c}, {}, {factor});", stop_color(curr)));
    }

    Ok(lines.join("\n"))
}

const HSV2RGB: &str = "\
fn hsv2rgb(h: f32, s: f32, v: f32) -> vec3f {
    let c = vec3f(h, s, v);
    let k = vec4f(1.0, 2.0 / 3.0, 1.0 / 3.0, 3.0);
    let p = abs(fract(c.xxx + k.xyz) * 6.0 - k.www);
    return c.z * mix(k.xxx, clamp(p - k.xxx, vec3f(0.0), vec3f(1.0)), c.y);
}";

fn hsv_to_rgb() -> NodeDefinition {
    NodeDefinition::new(
        "hsv_to_rgb",
        "HSV to RGB",
        "Color",
        "Convert HSV color space to RGB",
        generate_hsv_to_rgb,
    )
    .with_inputs(vec![
        PortDefinition::new("h", "Hue", PortType::Float).with_default(json!(0.0)),
        PortDefinition::new("s", "Saturation", PortType::Float).with_default(json!(1.0)),
        PortDefinition::new("v", "Value", PortType::Float).with_default(json!(1.0)),
    ])
    .with_outputs(vec![PortDefinition::new("rgb", "RGB", PortType::Vec3)])
}

fn generate_hsv_to_rgb(ctx: &mut GenContext) -> Result<String> {
    ctx.add_function("hsv2rgb", HSV2RGB);
    let h = ctx.input("h")?;
    let s = ctx.input("s")?;
    let v = ctx.input("v")?;
    let out = ctx.output("rgb")?;
    Ok(format!("let {out} = hsv2rgb({h}, {s}, {v});"))
}

fn brightness_contrast() -> NodeDefinition {
    NodeDefinition::new(
        "brightness_contrast",
        "Brightness/Contrast",
        "Color",
        "Adjust brightness and contrast of a color",
        generate_brightness_contrast,
    )
    .with_inputs(vec![
        PortDefinition::new("color", "Color", PortType::Vec3).with_default(json!([0.5, 0.5, 0.5])),
    ])
    .with_outputs(vec![PortDefinition::new("result", "Result", PortType::Vec3)])
    .with_params(vec![
        NodeParameter::float("brightness", "Brightness", 0.0)
            .range(-1.0, 1.0, 0.01)
            .connectable(),
        NodeParameter::float("contrast", "Contrast", 0.0)
            .range(-1.0, 1.0, 0.01)
            .connectable(),
    ])
}

fn generate_brightness_contrast(ctx: &mut GenContext) -> Result<String> {
    let color = ctx.input("color")?;
    let brightness = ctx.input("brightness")?;
    let contrast = ctx.input("contrast")?;
    let out = ctx.output("result")?;
    Ok(format!(
        "let {out} = ({color} - vec3f(0.5)) * (1.0 + {contrast}) + vec3f(0.5) + vec3f({brightness});"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_fall_back_to_black_white_and_sort_by_position() {
        let stops = parse_stops(Some(&json!([])));
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].color, [0.0, 0.0, 0.0]);
        assert_eq!(stops[1].color, [1.0, 1.0, 1.0]);

        let stops = parse_stops(Some(&json!([
            {"position": 0.8, "color": [1.0, 0.0, 0.0]},
            {"position": 0.2, "color": [0.0, 1.0, 0.0]},
        ])));
        assert!(stops[0].position < stops[1].position);
        assert_eq!(stops[0].color, [0.0, 1.0, 0.0]);
    }
}
