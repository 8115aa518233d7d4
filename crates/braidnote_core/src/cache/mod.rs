//! Read-through note cache over the backing store.
//!
//! # Responsibility
//! - Serve note attribute lookups without duplicate backing-store calls.
//! - Memoize per-parent child listings until explicitly invalidated.
//!
//! # Invariants
//! - Cache state is always a subset of backing/branch-store truth; entries
//!   are dropped on mutation, never patched in place.

pub mod note_cache;
