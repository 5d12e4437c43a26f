//! Content tree domain model shared by every variant.
//!
//! # Responsibility
//! - Define the node record observed through one variant binding.
//! - Define variant identifiers and per-variant translation strategy.
//!
//! # Invariants
//! - Every node is identified by a stable `NodeAggregateId` shared across variants.
//! - Removal is represented by tombstones, not hard delete.

pub mod node;
pub mod variant;
