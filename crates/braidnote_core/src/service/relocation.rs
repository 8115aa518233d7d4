//! Relocation engine: batch move/clone of notes to one destination.
//!
//! # Responsibility
//! - Resolve the destination path, validate each selection independently,
//!   and apply moves/clones against the branch store.
//! - Invalidate the note cache for every affected note and parent before
//!   the result is returned, and broadcast tree events to subscribers.
//!
//! # Invariants
//! - One selection failing validation never aborts the rest of the batch;
//!   it is reported as a per-item skip, and nothing is rolled back because
//!   nothing was applied for it.
//! - Validation and mutation run within one cooperative turn; state read
//!   before a suspension point is never trusted afterwards.
//! - Any read issued after `relocate` returns observes the new topology.

use crate::cache::note_cache::{FetchError, NoteCache};
use crate::model::branch::BranchId;
use crate::model::note::NoteId;
use crate::resolve::path::{parse_note_path, resolve_path};
use crate::store::branch_store::{BranchStore, BranchStoreError};
use log::info;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// One note picked for relocation, scoped to a single user action.
///
/// With a `source_branch_id` the existing edge is re-parented (move); without
/// one a new edge is created and existing parents stay attached (clone).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSelection {
    pub note_id: NoteId,
    pub source_branch_id: Option<BranchId>,
}

impl NoteSelection {
    /// Selection that moves an existing branch.
    pub fn moving(note_id: NoteId, source_branch_id: BranchId) -> Self {
        Self {
            note_id,
            source_branch_id: Some(source_branch_id),
        }
    }

    /// Selection that clones the note under an additional parent.
    pub fn cloning(note_id: NoteId) -> Self {
        Self {
            note_id,
            source_branch_id: None,
        }
    }
}

/// Reason one selection was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    DuplicateEdge,
    CycleDetected,
    UnknownBranch,
    UnknownNote,
}

impl SkipReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateEdge => "duplicate_edge",
            Self::CycleDetected => "cycle_detected",
            Self::UnknownBranch => "unknown_branch",
            Self::UnknownNote => "unknown_note",
        }
    }
}

/// Per-item relocation status.
///
/// Serialized wire form is `moved | cloned | skipped:<reason>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ItemStatus {
    /// The existing branch now lives under the destination.
    Moved { branch_id: BranchId },
    /// A new branch was created; prior parents are untouched.
    Cloned { branch_id: BranchId },
    /// Validation failed for this item only.
    Skipped { reason: SkipReason },
}

impl Display for ItemStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Moved { .. } => write!(f, "moved"),
            Self::Cloned { .. } => write!(f, "cloned"),
            Self::Skipped { reason } => write!(f, "skipped:{}", reason.as_str()),
        }
    }
}

/// Outcome for one selection, in caller-supplied order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    pub note_id: NoteId,
    #[serde(flatten)]
    pub status: ItemStatus,
}

/// Result of one relocation batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelocationResult {
    pub target_note_id: NoteId,
    /// Destination title for toast composition; `None` when uncached and
    /// the backing store does not know the note.
    pub target_title: Option<String>,
    pub items: Vec<ItemOutcome>,
}

/// Batch-level relocation errors; per-item failures are skips, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelocationError {
    /// Destination path does not resolve to a live branch chain.
    PathNotFound(String),
    /// Backing-store fetch for the destination failed; retry later.
    Fetch(FetchError),
}

impl Display for RelocationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PathNotFound(path) => write!(f, "destination path not found: {path}"),
            Self::Fetch(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RelocationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PathNotFound(_) => None,
            Self::Fetch(err) => Some(err),
        }
    }
}

impl From<FetchError> for RelocationError {
    fn from(value: FetchError) -> Self {
        Self::Fetch(value)
    }
}

/// Cache-invalidation broadcast emitted on every graph mutation.
///
/// UI collaborators subscribe via [`RelocationEngine::subscribe`] to refresh
/// their views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum TreeEvent {
    /// The note's attributes or owning branch set changed.
    NoteChanged { note_id: NoteId },
    /// The parent's child list changed.
    ChildrenChanged { parent_note_id: NoteId },
}

/// Orchestrates move/clone batches against store and cache.
pub struct RelocationEngine {
    store: Rc<RefCell<BranchStore>>,
    cache: Rc<NoteCache>,
    events: broadcast::Sender<TreeEvent>,
}

impl RelocationEngine {
    /// Creates an engine over the shared store and cache singletons.
    pub fn new(store: Rc<RefCell<BranchStore>>, cache: Rc<NoteCache>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            cache,
            events,
        }
    }

    /// Subscribes to cache-invalidation events.
    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.events.subscribe()
    }

    /// Moves or clones every selection to the destination path.
    ///
    /// Selections are processed in caller order; each validates
    /// independently and failures surface as `skipped:<reason>` items.
    /// Cache invalidation for the whole batch completes before the result
    /// is returned.
    ///
    /// # Errors
    /// - `PathNotFound` when the destination path does not resolve.
    /// - `Fetch` when the destination title lookup fails.
    pub async fn relocate(
        &self,
        selections: &[NoteSelection],
        destination_path: &str,
    ) -> Result<RelocationResult, RelocationError> {
        let path = parse_note_path(destination_path);
        let target_note_id = path
            .last()
            .cloned()
            .ok_or_else(|| RelocationError::PathNotFound(destination_path.to_string()))?;
        // Why: an unresolvable destination is a path error regardless of the
        // backing store's health, and a dead path earns no backing fetch.
        if resolve_path(&self.store.borrow(), &path).is_err() {
            return Err(RelocationError::PathNotFound(destination_path.to_string()));
        }

        let target_title = self
            .cache
            .get_note(&target_note_id)
            .await?
            .map(|note| note.title);

        // Why: the title fetch above is a suspension point; everything below
        // runs in one cooperative turn and re-validates against the store
        // state as it is now, not as it was before the await.
        let mut items = Vec::with_capacity(selections.len());
        let mut touched_notes = BTreeSet::new();
        let mut touched_parents = BTreeSet::new();
        {
            let mut store = self.store.borrow_mut();
            if resolve_path(&store, &path).is_err() {
                return Err(RelocationError::PathNotFound(destination_path.to_string()));
            }

            for selection in selections {
                let (status, former_parent) =
                    apply_selection(&mut store, selection, &target_note_id);
                if !matches!(status, ItemStatus::Skipped { .. }) {
                    touched_notes.insert(selection.note_id.clone());
                    touched_parents.insert(target_note_id.clone());
                    // Why: a move empties a slot in the child list it left
                    // behind; a clone has no former parent to refresh.
                    touched_parents.extend(former_parent);
                }
                items.push(ItemOutcome {
                    note_id: selection.note_id.clone(),
                    status,
                });
            }
        }

        self.invalidate_batch(&touched_notes, &touched_parents);

        let moved = count(&items, |s| matches!(s, ItemStatus::Moved { .. }));
        let cloned = count(&items, |s| matches!(s, ItemStatus::Cloned { .. }));
        let skipped = count(&items, |s| matches!(s, ItemStatus::Skipped { .. }));
        info!(
            "event=relocate module=tree status=ok target={target_note_id} moved={moved} cloned={cloned} skipped={skipped}"
        );

        Ok(RelocationResult {
            target_note_id,
            target_title,
            items,
        })
    }

    fn invalidate_batch(&self, touched_notes: &BTreeSet<NoteId>, touched_parents: &BTreeSet<NoteId>) {
        for note_id in touched_notes {
            self.cache.invalidate(note_id);
            let _ = self.events.send(TreeEvent::NoteChanged {
                note_id: note_id.clone(),
            });
        }
        for parent_note_id in touched_parents {
            self.cache.invalidate_children_of(parent_note_id);
            let _ = self.events.send(TreeEvent::ChildrenChanged {
                parent_note_id: parent_note_id.clone(),
            });
        }
    }
}

fn apply_selection(
    store: &mut BranchStore,
    selection: &NoteSelection,
    target_note_id: &NoteId,
) -> (ItemStatus, Option<NoteId>) {
    match &selection.source_branch_id {
        Some(branch_id) => {
            let former_parent = store
                .branch(branch_id)
                .filter(|branch| branch.note_id == selection.note_id)
                .map(|branch| branch.parent_note_id.clone());
            let Some(former_parent) = former_parent else {
                return (
                    ItemStatus::Skipped {
                        reason: SkipReason::UnknownBranch,
                    },
                    None,
                );
            };
            match store.move_branch(branch_id, target_note_id.clone(), None) {
                Ok(()) => (
                    ItemStatus::Moved {
                        branch_id: branch_id.clone(),
                    },
                    Some(former_parent),
                ),
                Err(err) => (
                    ItemStatus::Skipped {
                        reason: skip_reason(err),
                    },
                    None,
                ),
            }
        }
        None => match store.create_branch(
            selection.note_id.clone(),
            target_note_id.clone(),
            None,
            None,
        ) {
            Ok(branch_id) => (ItemStatus::Cloned { branch_id }, None),
            Err(err) => (
                ItemStatus::Skipped {
                    reason: skip_reason(err),
                },
                None,
            ),
        },
    }
}

fn skip_reason(err: BranchStoreError) -> SkipReason {
    match err {
        BranchStoreError::DuplicateEdge { .. } => SkipReason::DuplicateEdge,
        BranchStoreError::CycleDetected { .. } => SkipReason::CycleDetected,
        BranchStoreError::UnknownBranch(_) => SkipReason::UnknownBranch,
        BranchStoreError::UnknownParent(_) | BranchStoreError::UnknownNote(_) => {
            SkipReason::UnknownNote
        }
    }
}

fn count(items: &[ItemOutcome], predicate: impl Fn(&ItemStatus) -> bool) -> usize {
    items.iter().filter(|item| predicate(&item.status)).count()
}
