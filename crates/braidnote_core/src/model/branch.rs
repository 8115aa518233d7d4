//! Branch domain model: one parent attachment of one note.
//!
//! # Responsibility
//! - Carry edge identity, sibling order and display prefix for one
//!   parent→child attachment.
//!
//! # Invariants
//! - The `(note_id, parent_note_id)` pair of an active branch is unique.
//! - Sibling order is `(position, branch_id)`; ties never reach the UI
//!   ambiguously.

use crate::model::note::NoteId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable opaque branch identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(String);

impl BranchId {
    /// Wraps an externally issued branch identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a fresh branch identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BranchId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BranchId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One edge attaching a note under a parent.
///
/// A cloned note owns one `Branch` per parent; deleting a branch never
/// deletes the note itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Stable edge id.
    pub branch_id: BranchId,
    /// Child note attached by this edge.
    pub note_id: NoteId,
    /// Parent note (or the virtual root).
    pub parent_note_id: NoteId,
    /// Sibling order key under `parent_note_id`.
    pub position: i64,
    /// Optional short label shown before the note title under this parent.
    pub prefix: Option<String>,
}

impl Branch {
    /// Deterministic sibling sort key: position first, branch id tie-break.
    pub fn sibling_key(&self) -> (i64, &str) {
        (self.position, self.branch_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{Branch, BranchId};
    use crate::model::note::NoteId;

    #[test]
    fn generated_branch_ids_are_unique_and_plain() {
        let first = BranchId::generate();
        let second = BranchId::generate();
        assert_ne!(first, second);
        assert!(first.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn sibling_key_breaks_position_ties_by_id() {
        let earlier = Branch {
            branch_id: BranchId::new("aaa"),
            note_id: NoteId::new("n1"),
            parent_note_id: NoteId::root(),
            position: 3,
            prefix: None,
        };
        let later = Branch {
            branch_id: BranchId::new("bbb"),
            note_id: NoteId::new("n2"),
            parent_note_id: NoteId::root(),
            position: 3,
            prefix: None,
        };
        assert!(earlier.sibling_key() < later.sibling_key());
    }
}
