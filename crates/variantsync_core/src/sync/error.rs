//! Sync engine error model.

use crate::config::ConfigError;
use crate::model::node::{NodeAggregateId, NodeScope};
use crate::model::variant::VariantId;
use crate::repo::node_repo::NodeRepoError;
use crate::translation::TranslationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised while walking and propagating the content tree.
#[derive(Debug)]
pub enum SyncError {
    /// Configuration is missing or invalid; fatal to the whole run.
    Config(ConfigError),
    /// The walk root does not exist in the default variant.
    RootNotFound { scope: NodeScope, path: String },
    /// Lookup failure against the repository.
    Repo(NodeRepoError),
    /// The target variant rejected the structural copy.
    Adoption {
        node_id: NodeAggregateId,
        variant: VariantId,
        source: NodeRepoError,
    },
    /// The translator failed; the adopted counterpart stays untranslated.
    Translation {
        node_id: NodeAggregateId,
        variant: VariantId,
        source: TranslationError,
    },
    /// Writing translated fields or a tombstone failed.
    Write {
        node_id: NodeAggregateId,
        variant: VariantId,
        source: NodeRepoError,
    },
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::RootNotFound { scope, path } => {
                write!(f, "sync root `{path}` not found in {scope}")
            }
            Self::Repo(err) => write!(f, "{err}"),
            Self::Adoption {
                node_id,
                variant,
                source,
            } => write!(f, "cannot adopt node {node_id} into `{variant}`: {source}"),
            Self::Translation {
                node_id,
                variant,
                source,
            } => write!(f, "cannot translate node {node_id} into `{variant}`: {source}"),
            Self::Write {
                node_id,
                variant,
                source,
            } => write!(f, "cannot write node {node_id} in `{variant}`: {source}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::RootNotFound { .. } => None,
            Self::Repo(err) => Some(err),
            Self::Adoption { source, .. } => Some(source),
            Self::Translation { source, .. } => Some(source),
            Self::Write { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for SyncError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<NodeRepoError> for SyncError {
    fn from(value: NodeRepoError) -> Self {
        Self::Repo(value)
    }
}
