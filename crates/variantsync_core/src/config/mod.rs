//! Sync configuration loading and validation.
//!
//! # Responsibility
//! - Parse the JSON configuration describing variants and node types.
//! - Validate it once so policy lookups never fail at sync time.
//!
//! # Invariants
//! - A validated config names a default variant that is also a configured variant.
//! - Every declared super type refers to a configured node type.

pub mod type_gate;
pub mod variant_policy;

use crate::model::variant::{TranslationStrategy, VariantId};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub use type_gate::ContentTypeGate;
pub use variant_policy::VariantPolicy;

const DEFAULT_WORKSPACE: &str = "live";
const DEFAULT_DOCUMENT_TYPE: &str = "Document";

/// Configuration errors. All of them are fatal to a sync run.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    /// No default variant is configured.
    MissingDefaultVariant,
    /// The default variant has no preset in `variants`.
    UnknownDefaultVariant(VariantId),
    EmptyWorkspace,
    UnknownSuperType {
        node_type: String,
        super_type: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::MissingDefaultVariant => write!(f, "config has no default variant"),
            Self::UnknownDefaultVariant(id) => {
                write!(f, "default variant `{id}` has no preset in `variants`")
            }
            Self::EmptyWorkspace => write!(f, "config workspace must not be empty"),
            Self::UnknownSuperType {
                node_type,
                super_type,
            } => write!(
                f,
                "node type `{node_type}` declares unknown super type `{super_type}`"
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Per-variant preset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantPreset {
    #[serde(default)]
    pub translation_strategy: TranslationStrategy,
    /// Language code handed to the translator; falls back to the variant id.
    #[serde(default)]
    pub translation_language: Option<String>,
}

/// Per-node-type options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTypeConfig {
    /// Types this type inherits options from, nearest first.
    #[serde(default)]
    pub super_types: Vec<String>,
    /// `None` inherits; the effective default is enabled.
    #[serde(default)]
    pub automatic_translation: Option<bool>,
    #[serde(default)]
    pub translatable_properties: Vec<String>,
}

/// Root configuration object threaded into the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_workspace")]
    pub workspace: String,
    #[serde(default)]
    pub default_variant: Option<VariantId>,
    #[serde(default)]
    pub variants: BTreeMap<VariantId, VariantPreset>,
    /// Node type marking a traversal and persistence boundary.
    #[serde(default = "default_document_type")]
    pub document_type: String,
    /// Document types never enumerated as walk roots.
    #[serde(default)]
    pub excluded_root_types: Vec<String>,
    #[serde(default)]
    pub node_types: BTreeMap<String, NodeTypeConfig>,
}

impl SyncConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| {
            error!(
                "event=config_load module=config status=error path={} error={source}",
                path.display()
            );
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let config = Self::from_json_str(&text)?;
        info!(
            "event=config_load module=config status=ok path={} variants={} node_types={}",
            path.display(),
            config.variants.len(),
            config.node_types.len()
        );
        Ok(config)
    }

    /// Parses and validates a JSON config document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workspace.trim().is_empty() {
            return Err(ConfigError::EmptyWorkspace);
        }
        let default_variant = self
            .default_variant
            .as_ref()
            .ok_or(ConfigError::MissingDefaultVariant)?;
        if !self.variants.contains_key(default_variant) {
            return Err(ConfigError::UnknownDefaultVariant(default_variant.clone()));
        }
        for (node_type, options) in &self.node_types {
            if let Some(missing) = options
                .super_types
                .iter()
                .find(|super_type| !self.node_types.contains_key(super_type.as_str()))
            {
                return Err(ConfigError::UnknownSuperType {
                    node_type: node_type.clone(),
                    super_type: missing.clone(),
                });
            }
        }
        Ok(())
    }
}

fn default_workspace() -> String {
    DEFAULT_WORKSPACE.to_string()
}

fn default_document_type() -> String {
    DEFAULT_DOCUMENT_TYPE.to_string()
}
