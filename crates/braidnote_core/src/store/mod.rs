//! Edge-set store for the note graph.
//!
//! # Responsibility
//! - Own the authoritative in-memory branch set and its derived indices.
//! - Enforce acyclicity, edge uniqueness and deterministic sibling order.
//!
//! # Invariants
//! - No note is ever an ancestor of itself through any chain of branches.
//! - Every branch's parent references the virtual root or a registered note.

pub mod branch_store;
