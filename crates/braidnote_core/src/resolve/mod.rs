//! Note-path resolution between id sequences and branch chains.
//!
//! # Responsibility
//! - Turn slash-joined note paths into concrete branch chains and back.
//! - Enumerate every valid path to a cloned note for disambiguation.

pub mod path;
