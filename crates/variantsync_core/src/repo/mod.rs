//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define scoped node storage contracts consumed by the sync engine.
//! - Isolate SQLite query details from orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `Node::validate()` before persistence.
//! - Uniqueness violations surface as semantic `Conflict` errors.

pub mod node_repo;
