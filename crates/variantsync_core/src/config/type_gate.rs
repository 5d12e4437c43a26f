//! Node type option lookups with super type inheritance.
//!
//! # Invariants
//! - Options resolve nearest first: the type itself, then its super types
//!   breadth-first in declaration order.
//! - Inheritance cycles terminate; each type is visited once.

use crate::config::{NodeTypeConfig, SyncConfig};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// Decides per node type whether automatic sync applies and where walks stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTypeGate {
    node_types: BTreeMap<String, NodeTypeConfig>,
    document_type: String,
    excluded_root_types: Vec<String>,
}

impl ContentTypeGate {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            node_types: config.node_types.clone(),
            document_type: config.document_type.clone(),
            excluded_root_types: config.excluded_root_types.clone(),
        }
    }

    /// Whether automatic sync is enabled for `node_type`. Defaults to true.
    pub fn is_automatic_sync_enabled(&self, node_type: &str) -> bool {
        self.ancestry(node_type)
            .into_iter()
            .find_map(|name| {
                self.node_types
                    .get(name)
                    .and_then(|options| options.automatic_translation)
            })
            .unwrap_or(true)
    }

    /// Whether `node_type` is `candidate` or inherits from it.
    pub fn is_of_type(&self, node_type: &str, candidate: &str) -> bool {
        self.ancestry(node_type).contains(&candidate)
    }

    /// Whether nodes of this type are traversal boundaries.
    pub fn is_document(&self, node_type: &str) -> bool {
        self.is_of_type(node_type, &self.document_type)
    }

    /// Whether documents of this type are left out of root enumeration.
    pub fn is_excluded_root(&self, node_type: &str) -> bool {
        self.excluded_root_types
            .iter()
            .any(|excluded| self.is_of_type(node_type, excluded))
    }

    /// Translatable property names, merged over the whole ancestry.
    pub fn translatable_properties(&self, node_type: &str) -> BTreeSet<String> {
        self.ancestry(node_type)
            .into_iter()
            .filter_map(|name| self.node_types.get(name))
            .flat_map(|options| options.translatable_properties.iter().cloned())
            .collect()
    }

    fn ancestry<'a>(&'a self, node_type: &'a str) -> Vec<&'a str> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([node_type]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            order.push(current);
            if let Some(options) = self.node_types.get(current) {
                queue.extend(options.super_types.iter().map(String::as_str));
            }
        }
        order
    }
}
