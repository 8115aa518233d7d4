//! In-memory branch store with multi-parent ancestor tracking.
//!
//! # Responsibility
//! - Maintain `(branch_id) -> (note_id, parent_note_id, position, prefix)`
//!   edges plus parent→children and note→owning-branch indices.
//! - Validate every mutation against the graph invariants before applying it.
//!
//! # Invariants
//! - A `(note, parent)` pair is attached by at most one branch.
//! - Child listing is deterministic: `position ASC, branch_id ASC`.
//! - A failed mutation leaves the store byte-for-byte unchanged.
//! - A registered note with zero owning branches is an orphan; it is flagged,
//!   never deleted.

use crate::model::branch::{Branch, BranchId};
use crate::model::note::NoteId;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by branch store operations.
pub type BranchStoreResult<T> = Result<T, BranchStoreError>;

/// Errors from branch store mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchStoreError {
    /// The `(note, parent)` pair is already attached by another branch.
    DuplicateEdge {
        note_id: NoteId,
        parent_note_id: NoteId,
    },
    /// Attaching would make the note an ancestor of itself.
    CycleDetected {
        note_id: NoteId,
        parent_note_id: NoteId,
    },
    /// Branch does not exist, or does not belong to the stated parent.
    UnknownBranch(BranchId),
    /// Parent endpoint is neither the virtual root nor a registered note.
    UnknownParent(NoteId),
    /// Child endpoint has not been registered.
    UnknownNote(NoteId),
}

impl Display for BranchStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateEdge {
                note_id,
                parent_note_id,
            } => write!(
                f,
                "note {note_id} is already attached under parent {parent_note_id}"
            ),
            Self::CycleDetected {
                note_id,
                parent_note_id,
            } => write!(
                f,
                "attaching note {note_id} under {parent_note_id} would create a cycle"
            ),
            Self::UnknownBranch(branch_id) => write!(f, "unknown branch: {branch_id}"),
            Self::UnknownParent(note_id) => write!(f, "unknown parent note: {note_id}"),
            Self::UnknownNote(note_id) => write!(f, "unknown note: {note_id}"),
        }
    }
}

impl Error for BranchStoreError {}

/// Authoritative in-memory edge set for the note graph.
///
/// The store is the single owner of graph invariants; services translate its
/// errors into per-item outcomes but never re-implement the checks.
#[derive(Debug, Default)]
pub struct BranchStore {
    branches: HashMap<BranchId, Branch>,
    /// parent note -> branch ids of its children (unordered; sorted on read).
    child_index: HashMap<NoteId, BTreeSet<BranchId>>,
    /// note -> branch ids attaching it (the owning branch set).
    owner_index: HashMap<NoteId, BTreeSet<BranchId>>,
    /// Notes known to the graph; the virtual root is always present.
    registry: HashSet<NoteId>,
}

impl BranchStore {
    /// Creates an empty store with the virtual root registered.
    pub fn new() -> Self {
        let mut store = Self::default();
        store.registry.insert(NoteId::root());
        store
    }

    /// Registers one note id as a valid graph endpoint. Idempotent.
    pub fn register_note(&mut self, note_id: NoteId) {
        self.registry.insert(note_id);
    }

    /// Returns whether the note id is a valid graph endpoint.
    pub fn is_registered(&self, note_id: &NoteId) -> bool {
        self.registry.contains(note_id)
    }

    /// Returns all registered note ids except the virtual root, sorted.
    pub fn registered_notes(&self) -> Vec<NoteId> {
        let mut ids: Vec<NoteId> = self
            .registry
            .iter()
            .filter(|id| !id.is_root())
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Attaches `note_id` under `parent_note_id` with a fresh branch.
    ///
    /// `position` defaults to the end of the parent's child list.
    ///
    /// # Errors
    /// - `UnknownNote` / `UnknownParent` for unregistered endpoints.
    /// - `DuplicateEdge` when the pair is already attached.
    /// - `CycleDetected` when the parent is the note or one of its
    ///   descendants.
    pub fn create_branch(
        &mut self,
        note_id: NoteId,
        parent_note_id: NoteId,
        position: Option<i64>,
        prefix: Option<String>,
    ) -> BranchStoreResult<BranchId> {
        self.validate_attachment(&note_id, &parent_note_id)?;

        let branch_id = BranchId::generate();
        let branch = Branch {
            branch_id: branch_id.clone(),
            note_id: note_id.clone(),
            parent_note_id: parent_note_id.clone(),
            position: position.unwrap_or_else(|| self.next_position(&parent_note_id)),
            prefix,
        };

        self.child_index
            .entry(parent_note_id)
            .or_default()
            .insert(branch_id.clone());
        self.owner_index
            .entry(note_id)
            .or_default()
            .insert(branch_id.clone());
        self.branches.insert(branch_id.clone(), branch);
        Ok(branch_id)
    }

    /// Detaches one edge and returns the removed branch.
    ///
    /// When this was the note's last branch the note becomes an orphan; it
    /// stays registered and is reported by [`BranchStore::orphans`].
    pub fn remove_branch(&mut self, branch_id: &BranchId) -> BranchStoreResult<Branch> {
        let branch = self
            .branches
            .remove(branch_id)
            .ok_or_else(|| BranchStoreError::UnknownBranch(branch_id.clone()))?;
        self.unlink(&branch);
        Ok(branch)
    }

    /// Re-parents an existing edge in place (a true move: the branch id and
    /// prefix survive).
    ///
    /// Validations match [`BranchStore::create_branch`]; the branch's current
    /// attachment is ignored when checking for duplicates and cycles.
    pub fn move_branch(
        &mut self,
        branch_id: &BranchId,
        new_parent_id: NoteId,
        position: Option<i64>,
    ) -> BranchStoreResult<()> {
        let (note_id, old_parent_id) = {
            let branch = self
                .branches
                .get(branch_id)
                .ok_or_else(|| BranchStoreError::UnknownBranch(branch_id.clone()))?;
            (branch.note_id.clone(), branch.parent_note_id.clone())
        };

        if !self.registry.contains(&new_parent_id) {
            return Err(BranchStoreError::UnknownParent(new_parent_id));
        }
        let duplicate = self
            .owning_branch_ids(&note_id)
            .iter()
            .filter(|id| *id != branch_id)
            .filter_map(|id| self.branches.get(id))
            .any(|other| other.parent_note_id == new_parent_id);
        if duplicate {
            return Err(BranchStoreError::DuplicateEdge {
                note_id,
                parent_note_id: new_parent_id,
            });
        }
        if self.would_create_cycle(&note_id, &new_parent_id) {
            return Err(BranchStoreError::CycleDetected {
                note_id,
                parent_note_id: new_parent_id,
            });
        }

        let next_position = position.unwrap_or_else(|| self.next_position(&new_parent_id));
        if let Some(ids) = self.child_index.get_mut(&old_parent_id) {
            ids.remove(branch_id);
        }
        self.child_index
            .entry(new_parent_id.clone())
            .or_default()
            .insert(branch_id.clone());
        if let Some(branch) = self.branches.get_mut(branch_id) {
            branch.parent_note_id = new_parent_id;
            branch.position = next_position;
        }
        Ok(())
    }

    /// Atomically reassigns sibling positions under one parent.
    ///
    /// Every supplied id must belong to `parent_note_id`; otherwise the call
    /// fails with `UnknownBranch` and existing order is untouched. Children
    /// not listed keep their relative order after the listed ones.
    pub fn reorder(
        &mut self,
        parent_note_id: &NoteId,
        ordered_branch_ids: &[BranchId],
    ) -> BranchStoreResult<()> {
        let mut seen = HashSet::new();
        for branch_id in ordered_branch_ids {
            let belongs = self
                .branches
                .get(branch_id)
                .map(|branch| &branch.parent_note_id == parent_note_id)
                .unwrap_or(false);
            if !belongs || !seen.insert(branch_id.clone()) {
                return Err(BranchStoreError::UnknownBranch(branch_id.clone()));
            }
        }

        let trailing: Vec<BranchId> = self
            .list_children(parent_note_id)
            .into_iter()
            .map(|branch| branch.branch_id)
            .filter(|id| !seen.contains(id))
            .collect();

        for (index, branch_id) in ordered_branch_ids.iter().chain(&trailing).enumerate() {
            if let Some(branch) = self.branches.get_mut(branch_id) {
                branch.position = index as i64;
            }
        }
        Ok(())
    }

    /// Replaces the display prefix of one branch.
    pub fn set_prefix(
        &mut self,
        branch_id: &BranchId,
        prefix: Option<String>,
    ) -> BranchStoreResult<()> {
        let branch = self
            .branches
            .get_mut(branch_id)
            .ok_or_else(|| BranchStoreError::UnknownBranch(branch_id.clone()))?;
        branch.prefix = prefix;
        Ok(())
    }

    /// Lists child branches under one parent, sorted `position, branch_id`.
    ///
    /// An unknown or childless parent yields an empty list, not an error.
    pub fn list_children(&self, parent_note_id: &NoteId) -> Vec<Branch> {
        let mut children: Vec<Branch> = self
            .child_index
            .get(parent_note_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.branches.get(id))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.sibling_key().cmp(&b.sibling_key()));
        children
    }

    /// Loads one branch by id.
    pub fn branch(&self, branch_id: &BranchId) -> Option<&Branch> {
        self.branches.get(branch_id)
    }

    /// Finds the branch attaching `note_id` under `parent_note_id`, if any.
    pub fn branch_between(&self, parent_note_id: &NoteId, note_id: &NoteId) -> Option<&Branch> {
        self.owning_branch_ids(note_id)
            .iter()
            .filter_map(|id| self.branches.get(id))
            .find(|branch| &branch.parent_note_id == parent_note_id)
    }

    /// Returns the owning branch set of one note, sorted by branch id.
    pub fn branches_of(&self, note_id: &NoteId) -> Vec<Branch> {
        self.owning_branch_ids(note_id)
            .iter()
            .filter_map(|id| self.branches.get(id))
            .cloned()
            .collect()
    }

    /// Returns the distinct parents of one note, sorted.
    pub fn parents_of(&self, note_id: &NoteId) -> Vec<NoteId> {
        let mut parents: Vec<NoteId> = self
            .branches_of(note_id)
            .into_iter()
            .map(|branch| branch.parent_note_id)
            .collect();
        parents.sort();
        parents.dedup();
        parents
    }

    /// Returns whether a registered note has zero owning branches.
    ///
    /// The virtual root never counts as an orphan.
    pub fn is_orphan(&self, note_id: &NoteId) -> bool {
        !note_id.is_root()
            && self.registry.contains(note_id)
            && self.owning_branch_ids(note_id).is_empty()
    }

    /// Lists all orphaned notes, sorted.
    pub fn orphans(&self) -> Vec<NoteId> {
        let mut ids: Vec<NoteId> = self
            .registry
            .iter()
            .filter(|id| self.is_orphan(id))
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Returns whether attaching `note_id` under `candidate_parent_id` would
    /// make the note an ancestor of itself.
    ///
    /// Walks the reverse edge set upward from the candidate parent through
    /// *all* of its branches. The visited set bounds the walk to each note
    /// once, so heavily cloned subgraphs cannot blow up the search.
    pub fn would_create_cycle(&self, note_id: &NoteId, candidate_parent_id: &NoteId) -> bool {
        if candidate_parent_id == note_id {
            return true;
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([candidate_parent_id.clone()]);
        while let Some(current) = queue.pop_front() {
            if &current == note_id {
                return true;
            }
            if current.is_root() || !visited.insert(current.clone()) {
                continue;
            }
            for branch in self.branches_of(&current) {
                queue.push_back(branch.parent_note_id);
            }
        }
        false
    }

    fn validate_attachment(
        &self,
        note_id: &NoteId,
        parent_note_id: &NoteId,
    ) -> BranchStoreResult<()> {
        if !self.registry.contains(note_id) {
            return Err(BranchStoreError::UnknownNote(note_id.clone()));
        }
        if !self.registry.contains(parent_note_id) {
            return Err(BranchStoreError::UnknownParent(parent_note_id.clone()));
        }
        if self.branch_between(parent_note_id, note_id).is_some() {
            return Err(BranchStoreError::DuplicateEdge {
                note_id: note_id.clone(),
                parent_note_id: parent_note_id.clone(),
            });
        }
        if self.would_create_cycle(note_id, parent_note_id) {
            return Err(BranchStoreError::CycleDetected {
                note_id: note_id.clone(),
                parent_note_id: parent_note_id.clone(),
            });
        }
        Ok(())
    }

    fn owning_branch_ids(&self, note_id: &NoteId) -> Vec<BranchId> {
        self.owner_index
            .get(note_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn next_position(&self, parent_note_id: &NoteId) -> i64 {
        self.child_index
            .get(parent_note_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.branches.get(id))
            .map(|branch| branch.position)
            .max()
            .map_or(0, |max| max + 1)
    }

    fn unlink(&mut self, branch: &Branch) {
        if let Some(ids) = self.child_index.get_mut(&branch.parent_note_id) {
            ids.remove(&branch.branch_id);
            if ids.is_empty() {
                self.child_index.remove(&branch.parent_note_id);
            }
        }
        if let Some(ids) = self.owner_index.get_mut(&branch.note_id) {
            ids.remove(&branch.branch_id);
            if ids.is_empty() {
                self.owner_index.remove(&branch.note_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BranchStore, BranchStoreError};
    use crate::model::note::NoteId;

    fn store_with(notes: &[&str]) -> BranchStore {
        let mut store = BranchStore::new();
        for id in notes {
            store.register_note(NoteId::new(*id));
        }
        store
    }

    #[test]
    fn create_branch_rejects_unregistered_endpoints() {
        let mut store = store_with(&["a"]);

        let err = store
            .create_branch(NoteId::new("ghost"), NoteId::root(), None, None)
            .expect_err("unregistered child must fail");
        assert_eq!(err, BranchStoreError::UnknownNote(NoteId::new("ghost")));

        let err = store
            .create_branch(NoteId::new("a"), NoteId::new("ghost"), None, None)
            .expect_err("unregistered parent must fail");
        assert_eq!(err, BranchStoreError::UnknownParent(NoteId::new("ghost")));
    }

    #[test]
    fn positions_default_to_end_of_sibling_list() {
        let mut store = store_with(&["a", "b", "c"]);
        store
            .create_branch(NoteId::new("a"), NoteId::root(), None, None)
            .expect("attach a");
        store
            .create_branch(NoteId::new("b"), NoteId::root(), None, None)
            .expect("attach b");
        store
            .create_branch(NoteId::new("c"), NoteId::root(), Some(-5), None)
            .expect("attach c at explicit position");

        let order: Vec<i64> = store
            .list_children(&NoteId::root())
            .into_iter()
            .map(|branch| branch.position)
            .collect();
        assert_eq!(order, vec![-5, 0, 1]);
    }

    #[test]
    fn self_parenting_is_a_cycle() {
        let mut store = store_with(&["a"]);
        let err = store
            .create_branch(NoteId::new("a"), NoteId::new("a"), None, None)
            .expect_err("self parent must fail");
        assert!(matches!(err, BranchStoreError::CycleDetected { .. }));
    }

    #[test]
    fn cycle_walk_covers_all_parents_of_cloned_notes() {
        // a sits under root twice removed via two distinct paths; attaching
        // one of its ancestors beneath it must still be caught.
        let mut store = store_with(&["a", "left", "right"]);
        store
            .create_branch(NoteId::new("left"), NoteId::root(), None, None)
            .expect("left under root");
        store
            .create_branch(NoteId::new("right"), NoteId::root(), None, None)
            .expect("right under root");
        store
            .create_branch(NoteId::new("a"), NoteId::new("left"), None, None)
            .expect("a under left");
        store
            .create_branch(NoteId::new("a"), NoteId::new("right"), None, None)
            .expect("a under right");

        let err = store
            .create_branch(NoteId::new("right"), NoteId::new("a"), None, None)
            .expect_err("ancestor via second path must fail");
        assert!(matches!(err, BranchStoreError::CycleDetected { .. }));
    }

    #[test]
    fn set_prefix_updates_single_branch() {
        let mut store = store_with(&["a"]);
        let branch_id = store
            .create_branch(NoteId::new("a"), NoteId::root(), None, None)
            .expect("attach a");

        store
            .set_prefix(&branch_id, Some("1.".to_string()))
            .expect("prefix update");
        let branch = store.branch(&branch_id).expect("branch present");
        assert_eq!(branch.prefix.as_deref(), Some("1."));
    }
}
