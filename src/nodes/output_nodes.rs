//! The terminal output node.

use anyhow::Result;
use serde_json::json;

use crate::compiler::context::GenContext;

use super::{NodeDefinition, PortDefinition, PortType};

pub(crate) fn definitions() -> Vec<NodeDefinition> {
    vec![fragment_output()]
}

/// Master output node; exactly one instance per graph. Its fragment writes
/// the program's final color, extended to opaque alpha — the generator does
/// not special-case the terminal beyond ordering it last.
fn fragment_output() -> NodeDefinition {
    NodeDefinition::new(
        "fragment_output",
        "Fragment Output",
        "Output",
        "Final color output (master node, only one per graph)",
        generate_fragment_output,
    )
    .with_inputs(vec![
        PortDefinition::new("color", "Color", PortType::Vec3).with_default(json!([0.0, 0.0, 0.0])),
    ])
}

fn generate_fragment_output(ctx: &mut GenContext) -> Result<String> {
    let color = ctx.input("color")?;
    Ok(format!("return vec4f({color}, 1.0);"))
}
