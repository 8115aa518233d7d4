//! Note domain model.
//!
//! # Responsibility
//! - Define the note read model cached by core: attributes only, content
//!   blobs stay with the editing subsystem and are referenced by id.
//! - Resolve view/edit capabilities once per note from its content kind.
//!
//! # Invariants
//! - `NoteId` is stable and never reused for another note.
//! - The virtual root id is reserved and never carries a record.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Reserved identifier of the virtual root note.
pub const ROOT_NOTE_ID: &str = "root";

/// Stable opaque note identifier.
///
/// Kept as a newtype so signatures cannot confuse note ids with branch ids
/// or free-form strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Wraps an externally issued note identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the virtual root identifier.
    pub fn root() -> Self {
        Self(ROOT_NOTE_ID.to_string())
    }

    /// Returns whether this id designates the virtual root.
    pub fn is_root(&self) -> bool {
        self.0 == ROOT_NOTE_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Content category for one note.
///
/// Editor and viewer behavior is derived from this tag once per note via
/// [`ContentKind::capabilities`], instead of string matching at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Rich-text document.
    Text,
    /// Source code with a mime-selected syntax mode.
    Code,
    /// Binary image payload.
    Image,
    /// Arbitrary attached file.
    File,
    /// Saved search definition; children are materialized results.
    Search,
}

impl ContentKind {
    /// Stable string id used on the wire and in persisted records.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Code => "code",
            Self::Image => "image",
            Self::File => "file",
            Self::Search => "search",
        }
    }

    /// Parses one content kind from its stable string id.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "code" => Some(Self::Code),
            "image" => Some(Self::Image),
            "file" => Some(Self::File),
            "search" => Some(Self::Search),
            _ => None,
        }
    }

    /// Returns the capability set supported by this content kind.
    pub fn capabilities(self) -> ViewCapabilities {
        match self {
            Self::Text => ViewCapabilities {
                editable: true,
                rich_text: true,
                downloadable: false,
            },
            Self::Code => ViewCapabilities {
                editable: true,
                rich_text: false,
                downloadable: false,
            },
            Self::Image | Self::File => ViewCapabilities {
                editable: false,
                rich_text: false,
                downloadable: true,
            },
            Self::Search => ViewCapabilities {
                editable: false,
                rich_text: false,
                downloadable: false,
            },
        }
    }
}

/// Capability set resolved from a note's content kind and read-only flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewCapabilities {
    /// Content may be mutated through an editor surface.
    pub editable: bool,
    /// Content is rendered by the rich-text engine rather than plain text.
    pub rich_text: bool,
    /// Content is served as a downloadable payload.
    pub downloadable: bool,
}

/// Note read model cached by core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Stable opaque id used for linking and branch endpoints.
    pub note_id: NoteId,
    /// User-facing title; the autocomplete match corpus.
    pub title: String,
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub kind: ContentKind,
    /// Mime of the content blob owned by the editing subsystem.
    pub mime: String,
    /// Explicit read-only marker set by the user.
    pub read_only: bool,
}

impl Note {
    /// Creates a note read model with editing enabled.
    pub fn new(note_id: NoteId, title: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            note_id,
            title: title.into(),
            kind,
            mime: default_mime(kind).to_string(),
            read_only: false,
        }
    }

    /// Resolves the effective capability set for this note.
    ///
    /// The read-only marker masks editability but never grants it.
    pub fn capabilities(&self) -> ViewCapabilities {
        let mut caps = self.kind.capabilities();
        if self.read_only {
            caps.editable = false;
        }
        caps
    }
}

fn default_mime(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Text => "text/html",
        ContentKind::Code => "text/plain",
        ContentKind::Image => "image/png",
        ContentKind::File => "application/octet-stream",
        ContentKind::Search => "application/json",
    }
}

#[cfg(test)]
mod tests {
    use super::{ContentKind, Note, NoteId};

    #[test]
    fn parses_all_supported_content_kinds() {
        for kind in [
            ContentKind::Text,
            ContentKind::Code,
            ContentKind::Image,
            ContentKind::File,
            ContentKind::Search,
        ] {
            assert_eq!(ContentKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ContentKind::parse("book"), None);
    }

    #[test]
    fn text_note_is_rich_text_editable() {
        let note = Note::new(NoteId::new("n1"), "Plan", ContentKind::Text);
        let caps = note.capabilities();
        assert!(caps.editable);
        assert!(caps.rich_text);
        assert!(!caps.downloadable);
    }

    #[test]
    fn read_only_marker_masks_editability() {
        let mut note = Note::new(NoteId::new("n1"), "Plan", ContentKind::Text);
        note.read_only = true;
        let caps = note.capabilities();
        assert!(!caps.editable);
        assert!(caps.rich_text);
    }

    #[test]
    fn file_kinds_are_downloadable_never_editable() {
        for kind in [ContentKind::Image, ContentKind::File] {
            let caps = kind.capabilities();
            assert!(caps.downloadable);
            assert!(!caps.editable);
        }
    }

    #[test]
    fn root_id_is_reserved() {
        assert!(NoteId::root().is_root());
        assert!(!NoteId::new("rooted").is_root());
    }
}
