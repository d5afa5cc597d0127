//! Library snapshot access.
//!
//! The semantic index never talks to Zotero directly; it consumes
//! `ItemRecord`s produced by a `LibrarySource`. The production source is
//! the Zotero local HTTP API (`zotero` submodule); tests substitute an
//! in-memory source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod zotero;

pub use zotero::ZoteroApiSource;

/// Metadata carried through the vector store and returned with search
/// results. Opaque to the index itself.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemMetadata {
    #[serde(default)]
    pub item_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub creators: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub publication: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub doi: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One library item as seen by a single snapshot pass.
#[derive(Clone, Debug, Default)]
pub struct ItemRecord {
    /// Stable Zotero item key.
    pub key: String,
    pub title: String,
    pub abstract_text: String,
    /// Note content, HTML included; stripped during preprocessing.
    pub note: String,
    /// Extracted document text. Only populated when the snapshot was taken
    /// with `include_fulltext`.
    pub fulltext: Option<String>,
    /// Last modification time reported by the library, if parseable.
    pub modified_at: Option<DateTime<Utc>>,
    pub metadata: ItemMetadata,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("library unreachable: {0}")]
    Unavailable(String),

    #[error("malformed library response: {0}")]
    Malformed(String),
}

/// Best-effort point-in-time view of the library. Completeness is not
/// guaranteed under concurrent library mutation; the sync engine diffs
/// whatever the snapshot returns.
pub trait LibrarySource: Send + Sync {
    /// List items in library order. With `since`, only items modified at or
    /// after the given instant are returned (deletions become invisible, so
    /// callers must not run removal detection on a filtered snapshot).
    fn list_items(
        &self,
        since: Option<DateTime<Utc>>,
        include_fulltext: bool,
    ) -> Result<Vec<ItemRecord>, SourceError>;
}
