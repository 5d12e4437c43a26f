//! Core of VariantSync: propagates a content tree from its default
//! language variant into derived variants.
//! This crate is the single source of truth for sync invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod sync;
pub mod translation;

pub use config::{
    ConfigError, ContentTypeGate, NodeTypeConfig, SyncConfig, VariantPolicy, VariantPreset,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::node::{Node, NodeAggregateId, NodeProperties, NodeScope, NodeValidationError};
pub use model::variant::{TranslationStrategy, VariantId};
pub use repo::node_repo::{NodeRepoError, NodeRepoResult, NodeRepository, SqliteNodeRepository};
pub use sync::{
    RootFailure, SyncDecision, SyncEngine, SyncError, SyncProgress, SyncReport, SyncResult,
    SyncRunOptions, SyncRunner, TreeWalker, VariantContext,
};
pub use translation::{GlossaryTranslator, TranslationError, Translator};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Walk root path of a named site.
pub fn site_root_path(site_name: &str) -> String {
    format!("/sites/{site_name}")
}
