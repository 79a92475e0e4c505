//! Compilation error kinds and the structured compile result.

use thiserror::Error;

/// Every way a compilation can fail.
///
/// The first three are graph-structural: compilation aborts immediately with
/// a single error, since enumerating further issues on a structurally
/// invalid graph helps nobody. The rest are per-node and accumulate across
/// the whole pass so an interactive caller can mark every offending node at
/// once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompileErrorKind {
    #[error("no output node")]
    NoOutputNode,
    #[error("multiple output nodes")]
    MultipleOutputNodes,
    #[error("cyclic graph")]
    CyclicGraph,
    #[error("unknown node type")]
    UnknownNodeType,
    #[error("missing required input")]
    MissingRequiredInput,
    #[error("incompatible types")]
    IncompatibleTypes,
    #[error("missing function key")]
    MissingFunctionKey,
    #[error("code generation failed")]
    CodeGenerationFailed,
}

#[derive(Debug, Clone)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub message: String,
    /// The offending node, when one can be named.
    pub node_id: Option<String>,
}

impl CompileError {
    pub fn graph(kind: CompileErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            node_id: None,
        }
    }

    pub fn node(kind: CompileErrorKind, message: impl Into<String>, node_id: &str) -> Self {
        Self {
            kind,
            message: message.into(),
            node_id: Some(node_id.to_string()),
        }
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.node_id {
            Some(id) => write!(f, "{} [{}]: {}", self.kind, id, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// Result of one compilation call. Either a single fully valid program with
/// no errors, or no program with the complete error list — partial programs
/// are never emitted.
#[derive(Debug, Clone, Default)]
pub struct CompilationResult {
    pub success: bool,
    pub vertex_source: String,
    pub fragment_source: String,
    pub errors: Vec<CompileError>,
}

impl CompilationResult {
    pub(crate) fn failure(errors: Vec<CompileError>) -> Self {
        Self {
            success: false,
            vertex_source: String::new(),
            fragment_source: String::new(),
            errors,
        }
    }

    pub(crate) fn ok(vertex_source: String, fragment_source: String) -> Self {
        Self {
            success: true,
            vertex_source,
            fragment_source,
            errors: Vec::new(),
        }
    }

    /// Errors attributed to a specific node, for editor badges.
    pub fn errors_for_node<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a CompileError> {
        self.errors
            .iter()
            .filter(move |e| e.node_id.as_deref() == Some(node_id))
    }
}
