//! Variant synchronization engine.
//!
//! Leaf-first: [`context`] binds one variant, [`engine`] decides and fans out
//! per node, [`walker`] visits one document's content, [`runner`] drives
//! every document of a site and persists after each.

pub mod context;
pub mod engine;
mod error;
pub mod runner;
pub mod walker;

pub use context::VariantContext;
pub use engine::{SyncDecision, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use runner::{RootFailure, SyncProgress, SyncReport, SyncRunOptions, SyncRunner};
pub use walker::TreeWalker;
