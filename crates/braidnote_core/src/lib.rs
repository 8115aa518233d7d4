//! Core domain logic for Braidnote.
//!
//! A note may appear under multiple parents at once: the hierarchy is a
//! directed acyclic graph of explicit branch edges. This crate owns the
//! branch store and its invariants, the read-through note cache, path
//! resolution, the relocation engine and the autocomplete resolver. Editing
//! surfaces, window lifecycle and persistent storage are external
//! collaborators behind interfaces.

pub mod cache;
pub mod logging;
pub mod model;
pub mod resolve;
pub mod service;
pub mod store;

pub use cache::note_cache::{FetchError, NoteCache, NoteSource};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::branch::{Branch, BranchId};
pub use model::note::{ContentKind, Note, NoteId, ViewCapabilities, ROOT_NOTE_ID};
pub use resolve::path::{
    format_note_path, parse_note_path, paths_to, resolve_path, shortest_path_to, PathError,
};
pub use service::autocomplete::{MentionCandidate, ReferenceHit, ReferenceResolver};
pub use service::relocation::{
    ItemOutcome, ItemStatus, NoteSelection, RelocationEngine, RelocationError, RelocationResult,
    SkipReason, TreeEvent,
};
pub use store::branch_store::{BranchStore, BranchStoreError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
