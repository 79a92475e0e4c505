//! Registry of node type definitions.
//!
//! Populated once at startup and read-only afterwards; compilation never
//! mutates it. Definitions are not validated on registration — a malformed
//! definition surfaces as a compilation error when first used.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::nodes::{self, NodeDefinition};

#[derive(Default)]
pub struct NodeRegistry {
    defs: HashMap<String, NodeDefinition>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the full built-in catalog.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for def in nodes::builtin_definitions() {
            registry.register(def);
        }
        registry
    }

    /// Insert a definition, keyed by type id. Re-registering an existing
    /// type overwrites it.
    pub fn register(&mut self, def: NodeDefinition) {
        if self.defs.contains_key(&def.node_type) {
            tracing::warn!(node_type = %def.node_type, "node type already registered, overwriting");
        }
        self.defs.insert(def.node_type.clone(), def);
    }

    pub fn get(&self, node_type: &str) -> Option<&NodeDefinition> {
        self.defs.get(node_type)
    }

    pub fn has(&self, node_type: &str) -> bool {
        self.defs.contains_key(node_type)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// All definitions, sorted by type id for stable enumeration.
    pub fn get_all(&self) -> Vec<&NodeDefinition> {
        let mut all: Vec<&NodeDefinition> = self.defs.values().collect();
        all.sort_by(|a, b| a.node_type.cmp(&b.node_type));
        all
    }

    pub fn get_by_category(&self, category: &str) -> Vec<&NodeDefinition> {
        self.get_all()
            .into_iter()
            .filter(|d| d.category == category)
            .collect()
    }

    /// Unique category names, sorted.
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = self.defs.values().map(|d| d.category.as_str()).collect();
        categories.sort_unstable();
        categories.dedup();
        categories
    }
}

/// Process-wide built-in catalog, initialized on first use and immutable
/// thereafter.
pub fn builtins() -> &'static NodeRegistry {
    static REGISTRY: OnceLock<NodeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(NodeRegistry::with_builtins)
}
