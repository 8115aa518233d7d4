//! Use-case services over the branch store and note cache.
//!
//! # Responsibility
//! - Orchestrate relocation batches and autocomplete reads.
//! - Keep UI collaborators decoupled from store and cache internals.

pub mod autocomplete;
pub mod relocation;
