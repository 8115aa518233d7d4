//! Path resolver over the branch store.
//!
//! # Responsibility
//! - Validate that a root-to-target id sequence corresponds to a concrete
//!   chain of branches.
//! - Enumerate all root paths of a note with multiple parents.
//!
//! # Invariants
//! - A valid path starts at the virtual root and walks exactly one branch
//!   per hop.
//! - Path enumeration is deterministic: shortest first, then lexicographic.

use crate::model::branch::Branch;
use crate::model::note::NoteId;
use crate::store::branch_store::BranchStore;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by path resolution.
pub type PathResult<T> = Result<T, PathError>;

/// Errors from note-path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The id sequence is empty.
    EmptyPath,
    /// The first element is not the virtual root.
    NotRooted(NoteId),
    /// A hop has no branch connecting the consecutive ids.
    BrokenPath {
        parent_note_id: NoteId,
        note_id: NoteId,
    },
}

impl Display for PathError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPath => write!(f, "note path is empty"),
            Self::NotRooted(note_id) => {
                write!(f, "note path must start at the root, got {note_id}")
            }
            Self::BrokenPath {
                parent_note_id,
                note_id,
            } => write!(
                f,
                "no branch connects {note_id} under {parent_note_id}"
            ),
        }
    }
}

impl Error for PathError {}

/// Parses a slash-joined note path string into an id sequence.
///
/// Empty segments are skipped, so `"root/a//b"` and `"/root/a/b"` both parse.
pub fn parse_note_path(value: &str) -> Vec<NoteId> {
    value
        .split('/')
        .filter(|segment| !segment.trim().is_empty())
        .map(|segment| NoteId::new(segment.trim()))
        .collect()
}

/// Formats an id sequence as a slash-joined note path string.
pub fn format_note_path(path: &[NoteId]) -> String {
    path.iter()
        .map(NoteId::as_str)
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolves a root-to-target id sequence into its concrete branch chain.
///
/// The chain has one branch per hop; a path consisting of the root alone
/// resolves to an empty chain.
///
/// # Errors
/// - `EmptyPath` / `NotRooted` for malformed sequences.
/// - `BrokenPath` when consecutive ids have no connecting branch.
pub fn resolve_path(store: &BranchStore, path: &[NoteId]) -> PathResult<Vec<Branch>> {
    let (first, rest) = path.split_first().ok_or(PathError::EmptyPath)?;
    if !first.is_root() {
        return Err(PathError::NotRooted(first.clone()));
    }

    let mut chain = Vec::with_capacity(rest.len());
    let mut parent = first;
    for note_id in rest {
        let branch =
            store
                .branch_between(parent, note_id)
                .ok_or_else(|| PathError::BrokenPath {
                    parent_note_id: parent.clone(),
                    note_id: note_id.clone(),
                })?;
        chain.push(branch.clone());
        parent = note_id;
    }
    Ok(chain)
}

/// Enumerates every root-to-note path, one per incoming branch expanded
/// recursively upward.
///
/// An orphaned or unregistered note yields no paths. Results are sorted by
/// length, then lexicographically, so the UI can disambiguate occurrences
/// deterministically.
pub fn paths_to(store: &BranchStore, note_id: &NoteId) -> Vec<Vec<NoteId>> {
    let mut visiting = HashSet::new();
    let mut paths = collect_paths(store, note_id, &mut visiting);
    paths.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    paths
}

/// Returns the preferred (shortest, then lexicographically first) root path.
pub fn shortest_path_to(store: &BranchStore, note_id: &NoteId) -> Option<Vec<NoteId>> {
    paths_to(store, note_id).into_iter().next()
}

fn collect_paths(
    store: &BranchStore,
    note_id: &NoteId,
    visiting: &mut HashSet<NoteId>,
) -> Vec<Vec<NoteId>> {
    if note_id.is_root() {
        return vec![vec![NoteId::root()]];
    }
    // Why: guard against malformed edge sets; an acyclic store never
    // re-enters a note on the way up.
    if !visiting.insert(note_id.clone()) {
        return Vec::new();
    }

    let mut paths = Vec::new();
    for branch in store.branches_of(note_id) {
        for mut upward in collect_paths(store, &branch.parent_note_id, visiting) {
            upward.push(note_id.clone());
            paths.push(upward);
        }
    }
    visiting.remove(note_id);
    paths
}

#[cfg(test)]
mod tests {
    use super::{format_note_path, parse_note_path};
    use crate::model::note::NoteId;

    #[test]
    fn parse_skips_empty_segments() {
        let parsed = parse_note_path("/root//a/b/");
        assert_eq!(
            parsed,
            vec![NoteId::root(), NoteId::new("a"), NoteId::new("b")]
        );
    }

    #[test]
    fn format_round_trips_parse() {
        let path = vec![NoteId::root(), NoteId::new("a")];
        assert_eq!(parse_note_path(&format_note_path(&path)), path);
    }
}
