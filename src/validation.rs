//! WGSL validation using the naga library.

use anyhow::{Context, Result, anyhow};

/// Validate WGSL source without requiring a GPU: parse with naga's WGSL
/// frontend, then run the full module validator.
///
/// Returns the parsed naga module on success, or an error carrying the
/// numbered source for debugging generated code.
pub fn validate_wgsl(source: &str) -> Result<naga::Module> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| anyhow!("WGSL parse failed:\n{}", format_naga_error(source, &e)))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| anyhow!("WGSL validation failed: {e:?}"))?;

    Ok(module)
}

/// Validate WGSL and note which component generated it (e.g. "fragment
/// stage") in the error chain on failure.
pub fn validate_wgsl_with_context(source: &str, context: &str) -> Result<naga::Module> {
    validate_wgsl(source).with_context(|| format!("{context} generated invalid WGSL"))
}

/// Format a naga parse error together with the numbered source, so failures
/// in generated code are debuggable without reconstructing the program.
fn format_naga_error(source: &str, error: &naga::front::wgsl::ParseError) -> String {
    let mut output = String::new();
    output.push_str(&format!("  {error}\n"));
    output.push_str("\nGenerated WGSL:\n---\n");
    for (line_num, line) in source.lines().enumerate() {
        output.push_str(&format!("{:4} | {}\n", line_num + 1, line));
    }
    output.push_str("---\n");
    output
}
