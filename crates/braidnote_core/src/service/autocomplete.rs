//! Reference resolver: free-text autocomplete over note titles.
//!
//! # Responsibility
//! - Match queries against note titles read through the note cache, so
//!   results always reflect the latest relocation outcome.
//! - Shape hits for the editor mention feed (`{id, text, link}`).
//!
//! # Invariants
//! - No result is ever a placeholder row; an empty match is an empty list.
//! - Orphaned notes are excluded: every hit carries a live root path.
//! - Result order is deterministic: match position, lowercased title, id.

use crate::cache::note_cache::{FetchError, NoteCache};
use crate::model::note::NoteId;
use crate::resolve::path::{format_note_path, shortest_path_to};
use crate::store::branch_store::BranchStore;
use regex::Regex;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

const MAX_HITS: usize = 20;
const MAX_RECENT: usize = 10;

/// One autocomplete match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceHit {
    pub note_id: NoteId,
    pub title: String,
    /// Preferred root path of this occurrence.
    pub path: Vec<NoteId>,
}

/// Editor mention-feed candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MentionCandidate {
    /// Marker-prefixed mention token, e.g. `@Some title`.
    pub id: String,
    /// Plain note title inserted into the document.
    pub text: String,
    /// Navigable path fragment, e.g. `#root/abc/def`.
    pub link: String,
}

/// Read-mostly autocomplete resolver over the shared cache and store.
pub struct ReferenceResolver {
    store: Rc<RefCell<BranchStore>>,
    cache: Rc<NoteCache>,
    /// Most recently visited notes, newest first.
    recent: RefCell<VecDeque<NoteId>>,
}

impl ReferenceResolver {
    pub fn new(store: Rc<RefCell<BranchStore>>, cache: Rc<NoteCache>) -> Self {
        Self {
            store,
            cache,
            recent: RefCell::new(VecDeque::new()),
        }
    }

    /// Records one note activation; recent notes are suggested for empty
    /// queries.
    pub fn record_visit(&self, note_id: &NoteId) {
        let mut recent = self.recent.borrow_mut();
        recent.retain(|id| id != note_id);
        recent.push_front(note_id.clone());
        recent.truncate(MAX_RECENT);
    }

    /// Resolves a free-text query into candidate notes.
    ///
    /// A blank query suggests recently visited notes. Every term must match
    /// the title case-insensitively. Titles are read through the note cache,
    /// so a relocation completed before this call is always visible.
    ///
    /// # Errors
    /// Propagates the first backing-store fetch failure; a failed fetch is
    /// "unknown, retry later", never an empty result.
    pub async fn query(&self, text: &str) -> Result<Vec<ReferenceHit>, FetchError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return self.recent_hits().await;
        }

        let matchers = term_matchers(trimmed);
        let candidates = self.store.borrow().registered_notes();

        let mut scored = Vec::new();
        for note_id in candidates {
            let Some(note) = self.cache.get_note(&note_id).await? else {
                continue;
            };
            let Some(first_match) = match_title(&note.title, &matchers) else {
                continue;
            };
            let Some(path) = shortest_path_to(&self.store.borrow(), &note_id) else {
                continue;
            };
            scored.push((first_match, note.title.to_lowercase(), note_id, note.title, path));
        }

        scored.sort();
        Ok(scored
            .into_iter()
            .take(MAX_HITS)
            .map(|(_, _, note_id, title, path)| ReferenceHit {
                note_id,
                title,
                path,
            })
            .collect())
    }

    /// Shapes query hits for the editor mention feed.
    ///
    /// `marker` is the trigger character typed in the editor; zero matches
    /// produce an empty feed, never a "No results" placeholder item.
    pub async fn mention_feed(
        &self,
        text: &str,
        marker: char,
    ) -> Result<Vec<MentionCandidate>, FetchError> {
        let hits = self.query(text).await?;
        Ok(hits
            .into_iter()
            .map(|hit| MentionCandidate {
                id: format!("{marker}{}", hit.title),
                text: hit.title,
                link: format!("#{}", format_note_path(&hit.path)),
            })
            .collect())
    }

    async fn recent_hits(&self) -> Result<Vec<ReferenceHit>, FetchError> {
        let recent: Vec<NoteId> = self.recent.borrow().iter().cloned().collect();
        let mut hits = Vec::new();
        for note_id in recent {
            let Some(note) = self.cache.get_note(&note_id).await? else {
                continue;
            };
            let Some(path) = shortest_path_to(&self.store.borrow(), &note_id) else {
                continue;
            };
            hits.push(ReferenceHit {
                note_id,
                title: note.title,
                path,
            });
        }
        Ok(hits)
    }
}

/// Builds one case-insensitive literal matcher per whitespace-separated term.
fn term_matchers(text: &str) -> Vec<Regex> {
    text.split_whitespace()
        .filter_map(|term| Regex::new(&format!("(?i){}", regex::escape(term))).ok())
        .collect()
}

/// Returns the earliest match offset when every term matches the title.
fn match_title(title: &str, matchers: &[Regex]) -> Option<usize> {
    let mut earliest = usize::MAX;
    for matcher in matchers {
        let found = matcher.find(title)?;
        earliest = earliest.min(found.start());
    }
    Some(earliest)
}

#[cfg(test)]
mod tests {
    use super::{match_title, term_matchers};

    #[test]
    fn every_term_must_match() {
        let matchers = term_matchers("monthly plan");
        assert_eq!(match_title("Monthly planning notes", &matchers), Some(0));
        assert_eq!(match_title("Monthly report", &matchers), None);
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let matchers = term_matchers("c++ (draft)");
        assert_eq!(match_title("Notes on C++ (draft)", &matchers), Some(9));
    }
}
