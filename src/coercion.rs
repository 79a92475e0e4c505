//! Implicit conversion rules between port types.
//!
//! The same table gates live connection attempts in the editor
//! ([`crate::dsl::ShaderGraph::connect`]) and drives expression coercion in
//! the generator, so the two can never drift apart: what connects, compiles.

use crate::nodes::PortType;

/// Whether a value of `from` may flow into a port of type `to`, either
/// unchanged or through a declared conversion. Rules are directional.
pub fn compatible(from: PortType, to: PortType) -> bool {
    from == to || rule(from, to).is_some()
}

/// Rewrite `expr` from type `from` to type `to`. Identity succeeds with no
/// transformation; any pair without a declared rule returns `None`.
pub fn coerce(expr: &str, from: PortType, to: PortType) -> Option<String> {
    if from == to {
        return Some(expr.to_string());
    }
    rule(from, to).map(|f| f(expr))
}

fn rule(from: PortType, to: PortType) -> Option<fn(&str) -> String> {
    use PortType::*;
    let f: fn(&str) -> String = match (from, to) {
        // float -> vector: broadcast all components.
        (Float, Vec2) => |v| format!("vec2f({v})"),
        (Float, Vec3) => |v| format!("vec3f({v})"),
        (Float, Vec4) => |v| format!("vec4f({v})"),
        // vec2 -> wider: append zero z, opaque alpha.
        (Vec2, Vec3) => |v| format!("vec3f({v}, 0.0)"),
        (Vec2, Vec4) => |v| format!("vec4f({v}, 0.0, 1.0)"),
        // vec3 -> vec4: append opaque alpha.
        (Vec3, Vec4) => |v| format!("vec4f({v}, 1.0)"),
        // narrowing: drop trailing components.
        (Vec4, Vec3) => |v| format!("{v}.rgb"),
        (Vec3, Vec2) => |v| format!("{v}.xy"),
        (Vec4, Vec2) => |v| format!("{v}.xy"),
        // color is an alias for vec3 in both directions.
        (Color, Vec3) | (Vec3, Color) => |v| v.to_string(),
        _ => return None,
    };
    Some(f)
}
