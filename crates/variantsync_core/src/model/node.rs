//! Content node domain model.
//!
//! # Responsibility
//! - Define the per-variant record of one logical content node.
//! - Provide path helpers and tombstone accessors.
//!
//! # Invariants
//! - `aggregate_id` is identical for every variant copy of the same logical node.
//! - `scope` binds the record to exactly one workspace and variant.
//! - `path` is absolute; every segment matches `[a-z0-9][a-z0-9-]*`.
//! - `is_removed` is the source of truth for tombstone state.

use crate::model::variant::VariantId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static NODE_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(/|(/[a-z0-9][a-z0-9-]*)+)$").expect("valid node path regex")
});
static NODE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").expect("valid node name regex"));

/// Stable cross-variant node identity.
pub type NodeAggregateId = Uuid;

/// Property bag of one node. Values are free-form JSON.
pub type NodeProperties = BTreeMap<String, Value>;

/// Root path of every content tree.
pub const ROOT_PATH: &str = "/";

/// The (workspace, variant) pair a node record belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeScope {
    pub workspace: String,
    pub variant: VariantId,
}

impl NodeScope {
    pub fn new(workspace: impl Into<String>, variant: impl Into<VariantId>) -> Self {
        Self {
            workspace: workspace.into(),
            variant: variant.into(),
        }
    }

    /// Returns the same workspace bound to another variant.
    pub fn with_variant(&self, variant: VariantId) -> Self {
        Self {
            workspace: self.workspace.clone(),
            variant,
        }
    }
}

impl Display for NodeScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.workspace, self.variant)
    }
}

/// Node validation errors raised before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValidationError {
    EmptyWorkspace,
    EmptyVariant,
    EmptyNodeType,
    InvalidPath(String),
    InvalidName(String),
    /// Only the root path may be parentless.
    MissingParent(String),
}

impl Display for NodeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyWorkspace => write!(f, "node workspace must not be empty"),
            Self::EmptyVariant => write!(f, "node variant must not be empty"),
            Self::EmptyNodeType => write!(f, "node type must not be empty"),
            Self::InvalidPath(path) => write!(f, "invalid node path `{path}`"),
            Self::InvalidName(name) => write!(f, "invalid node name `{name}`"),
            Self::MissingParent(path) => write!(f, "node at `{path}` must have a parent"),
        }
    }
}

impl Error for NodeValidationError {}

/// One variant-bound record of a content node.
///
/// Records of different variants never share storage; cross-variant updates
/// go through adoption and translation, which copy values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable identity shared by all variant copies.
    pub aggregate_id: NodeAggregateId,
    /// Binding to one workspace and variant.
    pub scope: NodeScope,
    /// Parent identity. `None` only for the tree root.
    pub parent_id: Option<NodeAggregateId>,
    /// Absolute path, aligned across variants.
    pub path: String,
    /// Node type name resolved through the type configuration.
    pub node_type: String,
    /// Translatable and non-translatable fields.
    pub properties: NodeProperties,
    /// Stable child order key within one parent.
    pub sort_order: i64,
    /// Tombstone flag.
    pub is_removed: bool,
    /// Repository write counter; bumped on every persisted change.
    pub revision: i64,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Node {
    /// Creates a parentless node with a generated identity.
    pub fn root(scope: NodeScope, node_type: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), scope, None, ROOT_PATH, node_type)
    }

    /// Creates a child node of `parent` in the parent's scope.
    ///
    /// `sort_order` starts at 0; callers place siblings explicitly.
    pub fn child(parent: &Node, name: &str, node_type: impl Into<String>) -> Self {
        Self::with_id(
            Uuid::new_v4(),
            parent.scope.clone(),
            Some(parent.aggregate_id),
            join_path(&parent.path, name),
            node_type,
        )
    }

    /// Creates a node with a caller-provided identity.
    ///
    /// Used when the identity already exists in another variant.
    pub fn with_id(
        aggregate_id: NodeAggregateId,
        scope: NodeScope,
        parent_id: Option<NodeAggregateId>,
        path: impl Into<String>,
        node_type: impl Into<String>,
    ) -> Self {
        Self {
            aggregate_id,
            scope,
            parent_id,
            path: path.into(),
            node_type: node_type.into(),
            properties: NodeProperties::new(),
            sort_order: 0,
            is_removed: false,
            revision: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Sets one property, builder style.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Returns a string property value, if present and textual.
    pub fn text_property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }

    pub fn variant(&self) -> &VariantId {
        &self.scope.variant
    }

    pub fn is_removed(&self) -> bool {
        self.is_removed
    }

    pub fn set_removed(&mut self, removed: bool) {
        self.is_removed = removed;
    }

    /// Last path segment; empty for the root.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// Validates record-level invariants.
    pub fn validate(&self) -> Result<(), NodeValidationError> {
        if self.scope.workspace.trim().is_empty() {
            return Err(NodeValidationError::EmptyWorkspace);
        }
        if self.scope.variant.as_str().trim().is_empty() {
            return Err(NodeValidationError::EmptyVariant);
        }
        if self.node_type.trim().is_empty() {
            return Err(NodeValidationError::EmptyNodeType);
        }
        if !is_valid_path(&self.path) {
            return Err(NodeValidationError::InvalidPath(self.path.clone()));
        }
        if self.parent_id.is_none() && self.path != ROOT_PATH {
            return Err(NodeValidationError::MissingParent(self.path.clone()));
        }
        Ok(())
    }
}

/// Returns whether `path` is a well-formed absolute node path.
pub fn is_valid_path(path: &str) -> bool {
    NODE_PATH_RE.is_match(path)
}

/// Validates a single node name segment.
pub fn validate_name(name: &str) -> Result<(), NodeValidationError> {
    if NODE_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(NodeValidationError::InvalidName(name.to_string()))
    }
}

/// Joins a parent path and a child name.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent == ROOT_PATH {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Path of the parent of `path`; the root is its own parent.
pub fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => ROOT_PATH,
        Some(index) => &path[..index],
    }
}
