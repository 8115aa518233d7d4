//! Lazily populated note cache with coalesced fetches.
//!
//! # Responsibility
//! - Serve `get_note` reads, fetching uncached ids from the backing
//!   [`NoteSource`] at most once per id at a time.
//! - Memoize ordered child listings derived from the branch store.
//!
//! # Invariants
//! - At most one in-flight backing fetch exists per note id; concurrent
//!   callers share its result.
//! - `Ok(None)` (note absent) and `Err` (fetch failed, retry later) are
//!   distinct and never conflated.
//! - Invalidation drops the cached entry and any pending fetch; the next
//!   read starts fresh.

use crate::model::branch::Branch;
use crate::model::note::{Note, NoteId};
use crate::store::branch_store::BranchStore;
use futures_util::future::{LocalBoxFuture, Shared};
use futures_util::FutureExt;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Error from a backing-store fetch.
///
/// A failed fetch means "unknown, retry later" — callers must never treat it
/// as note absence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Backing service rejected or could not complete the request.
    Unavailable(String),
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "note source unavailable: {message}"),
        }
    }
}

impl Error for FetchError {}

/// Backing persistence service the cache synchronizes with.
///
/// Implementations suspend at their own I/O boundary; the cache never blocks.
pub trait NoteSource {
    /// Loads one note record. `Ok(None)` means the note does not exist.
    fn fetch_note(&self, note_id: NoteId) -> LocalBoxFuture<'_, Result<Option<Note>, FetchError>>;
}

type FetchOutcome = Result<Option<Note>, FetchError>;
type PendingFetch = Shared<LocalBoxFuture<'static, FetchOutcome>>;

/// Process-wide read-through cache for note attributes and child listings.
pub struct NoteCache {
    source: Rc<dyn NoteSource>,
    notes: RefCell<HashMap<NoteId, Note>>,
    child_lists: RefCell<HashMap<NoteId, Vec<Branch>>>,
    pending: RefCell<HashMap<NoteId, PendingFetch>>,
}

impl NoteCache {
    /// Creates an empty cache over one backing source.
    pub fn new(source: Rc<dyn NoteSource>) -> Self {
        Self {
            source,
            notes: RefCell::new(HashMap::new()),
            child_lists: RefCell::new(HashMap::new()),
            pending: RefCell::new(HashMap::new()),
        }
    }

    /// Returns the note, fetching and caching it when absent.
    ///
    /// Concurrent calls for the same uncached id are coalesced into one
    /// backing fetch; every caller resolves to the same outcome.
    ///
    /// # Errors
    /// Propagates `FetchError` without caching anything.
    pub async fn get_note(&self, note_id: &NoteId) -> FetchOutcome {
        if let Some(found) = self.notes.borrow().get(note_id) {
            return Ok(Some(found.clone()));
        }

        let fetch = self.pending_fetch(note_id);
        let outcome = fetch.clone().await;
        self.settle_fetch(note_id, &fetch, &outcome);
        outcome
    }

    /// Returns the cached note without touching the backing source.
    pub fn peek_note(&self, note_id: &NoteId) -> Option<Note> {
        self.notes.borrow().get(note_id).cloned()
    }

    /// Returns the ordered child branches of `parent_note_id`, memoized
    /// until [`NoteCache::invalidate_children_of`] drops the entry.
    pub fn children_of(&self, parent_note_id: &NoteId, store: &BranchStore) -> Vec<Branch> {
        if let Some(cached) = self.child_lists.borrow().get(parent_note_id) {
            return cached.clone();
        }
        let listed = store.list_children(parent_note_id);
        self.child_lists
            .borrow_mut()
            .insert(parent_note_id.clone(), listed.clone());
        listed
    }

    /// Drops the cached attributes (and any pending fetch) for one note.
    pub fn invalidate(&self, note_id: &NoteId) {
        self.notes.borrow_mut().remove(note_id);
        if self.pending.borrow_mut().remove(note_id).is_some() {
            debug!(
                "event=note_fetch_discarded module=cache note_id={note_id} reason=invalidated"
            );
        }
    }

    /// Drops the memoized child listing of one parent.
    pub fn invalidate_children_of(&self, parent_note_id: &NoteId) {
        self.child_lists.borrow_mut().remove(parent_note_id);
    }

    fn pending_fetch(&self, note_id: &NoteId) -> PendingFetch {
        let mut pending = self.pending.borrow_mut();
        if let Some(active) = pending.get(note_id) {
            debug!("event=note_fetch_coalesced module=cache note_id={note_id}");
            return active.clone();
        }

        let source = Rc::clone(&self.source);
        let id = note_id.clone();
        let fetch = async move { source.fetch_note(id).await }
            .boxed_local()
            .shared();
        pending.insert(note_id.clone(), fetch.clone());
        fetch
    }

    fn settle_fetch(&self, note_id: &NoteId, fetch: &PendingFetch, outcome: &FetchOutcome) {
        // Why: a settling fetch may only install its result while its own
        // pending entry is still current. An invalidation racing the fetch
        // drops that entry (and a later read may install a newer one), so a
        // stale fetch must neither overwrite the cache nor evict a successor.
        {
            let mut pending = self.pending.borrow_mut();
            match pending.get(note_id) {
                Some(active) if Shared::ptr_eq(active, fetch) => {
                    pending.remove(note_id);
                }
                _ => return,
            }
        }
        if let Ok(Some(note)) = outcome {
            self.notes
                .borrow_mut()
                .insert(note_id.clone(), note.clone());
        }
    }
}
