//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `braidnote_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("braidnote_core version={}", braidnote_core::core_version());
}
