//! Embedding input preparation.
//!
//! Builds the text that gets embedded for an item:
//! 1. Metadata mode: title, creators, abstract, publication, tags, note
//!    text (HTML stripped), joined by spaces.
//! 2. Full-text mode: the extracted document text when present, otherwise
//!    the metadata composition.
//! 3. Truncate to a character budget; items with no usable text yield
//!    `None` and are skipped by the sync pass.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::library::ItemRecord;

/// Character budget for metadata-only embedding input.
const MAX_METADATA_LENGTH: usize = 2048;

/// Character budget for full-text embedding input. Long documents are
/// truncated rather than chunked; one vector per item.
const MAX_FULLTEXT_LENGTH: usize = 16384;

const TRUNCATION_SUFFIX: &str = "...";

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Compose the metadata-mode document text for an item.
///
/// Returns `None` when no field carries usable text.
pub fn document_text(record: &ItemRecord) -> Option<String> {
    let note_text = strip_html(&record.note);

    let parts = [
        record.title.trim(),
        record.metadata.creators.trim(),
        record.abstract_text.trim(),
        record.metadata.publication.trim(),
    ];

    let tags = record.metadata.tags.join(" ");

    let mut combined: Vec<&str> = parts.into_iter().filter(|p| !p.is_empty()).collect();
    if !tags.is_empty() {
        combined.push(&tags);
    }
    let trimmed_note = note_text.trim();
    if !trimmed_note.is_empty() {
        combined.push(trimmed_note);
    }

    if combined.is_empty() {
        return None;
    }

    Some(truncate(&combined.join(" "), MAX_METADATA_LENGTH))
}

/// Compose the full-text-mode document text for an item. Falls back to the
/// metadata composition when no extracted text is available, so a
/// full-text pass still covers items without attachments.
pub fn fulltext_document_text(record: &ItemRecord) -> Option<String> {
    match record.fulltext.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Some(truncate(text, MAX_FULLTEXT_LENGTH)),
        _ => document_text(record),
    }
}

/// Hash of the exact text that was (or would be) embedded. Drives change
/// detection: a differing hash marks the stored vector stale.
pub fn content_hash(text: &str) -> u64 {
    use std::hash::{Hash, Hasher};

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

fn strip_html(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    HTML_TAG.replace_all(input, " ").into_owned()
}

fn truncate(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }

    let keep = max_chars.saturating_sub(TRUNCATION_SUFFIX.chars().count());
    let truncated: String = content.chars().take(keep).collect();

    format!("{truncated}{TRUNCATION_SUFFIX}")
}
