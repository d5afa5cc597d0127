//! Sync engine: reconciles a library snapshot against the vector store.
//!
//! A pass moves through three phases:
//! 1. Diff: stream snapshot records, hash their embedding input, classify
//!    each item as new, changed, or unchanged against the store's entry
//!    for the active version tag.
//! 2. Embed: batch new+changed texts through the embedding provider.
//! 3. Commit: upsert and persist per batch, not at the end, so partial
//!    progress survives an aborted pass. A re-run only re-diffs; committed
//!    items come back as unchanged.
//!
//! Removal detection runs only on a forced rebuild over a complete
//! snapshot: incremental (`since`-filtered) pulls cannot observe
//! deletions, and a `limit`-capped pass sees only a prefix of the
//! library, so both disable it for the pass.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::library::{ItemMetadata, LibrarySource, SourceError};
use crate::semantic::preprocess;
use crate::semantic::provider::{EmbeddingError, EmbeddingProvider};
use crate::semantic::store::{StoreError, SyncState, VectorEntry, VectorStore};

/// Items per embed-and-commit batch; further capped by the provider's own
/// payload limit.
const SYNC_BATCH: usize = 50;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Embed title/creators/abstract-level fields only. Fast.
    #[default]
    Metadata,
    /// Embed extracted document text where available. Slower, more
    /// complete; supersedes metadata entries item by item.
    FullText,
}

#[derive(Clone, Debug, Default)]
pub struct SyncOptions {
    pub mode: SyncMode,
    /// Re-embed everything and garbage-collect removed items afterwards.
    pub force_rebuild: bool,
    /// Only process items modified at or after this instant. Disables
    /// removal detection for the pass.
    pub since: Option<DateTime<Utc>>,
    /// Cap on processed items, for testing against large libraries.
    /// Disables removal detection for the pass: items beyond the cap are
    /// alive, just unseen.
    pub limit: Option<usize>,
}

/// Statistics for one completed pass.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SyncReport {
    pub mode: SyncMode,
    pub total_items: usize,
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Items with no embeddable text.
    pub skipped_empty: usize,
    /// Entries garbage-collected (rebuild only).
    pub removed: usize,
    pub item_count: usize,
    pub duration_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Provider(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

struct PendingItem {
    key: String,
    text: String,
    content_hash: u64,
    metadata: ItemMetadata,
    is_new: bool,
}

pub struct SyncEngine<'a> {
    source: &'a dyn LibrarySource,
    provider: &'a dyn EmbeddingProvider,
    store: &'a Mutex<VectorStore>,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        source: &'a dyn LibrarySource,
        provider: &'a dyn EmbeddingProvider,
        store: &'a Mutex<VectorStore>,
    ) -> Self {
        Self {
            source,
            provider,
            store,
        }
    }

    fn lock_store(&self) -> std::sync::MutexGuard<'_, VectorStore> {
        // Entries are upserted one at a time, so the map stays consistent
        // even if a previous holder panicked mid-batch.
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run one full pass. On a provider or store failure the already
    /// committed batches remain in place; the pass is resumable, not
    /// transactional.
    pub fn run(&self, options: &SyncOptions) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let include_fulltext = options.mode == SyncMode::FullText;

        log::info!(
            "sync pass starting (mode: {:?}, rebuild: {})",
            options.mode,
            options.force_rebuild
        );

        let mut records = self.source.list_items(options.since, include_fulltext)?;
        if let Some(limit) = options.limit {
            records.truncate(limit);
        }

        let tag = self.provider.version_tag();
        let mut report = SyncReport {
            mode: options.mode,
            total_items: records.len(),
            ..Default::default()
        };

        // Diff phase.
        let mut pending: Vec<PendingItem> = Vec::new();
        let mut live_keys: HashSet<String> = HashSet::with_capacity(records.len());
        {
            let store = self.lock_store();
            for record in &records {
                let text = match options.mode {
                    SyncMode::Metadata => preprocess::document_text(record),
                    SyncMode::FullText => preprocess::fulltext_document_text(record),
                };
                live_keys.insert(record.key.clone());

                let Some(text) = text else {
                    report.skipped_empty += 1;
                    continue;
                };
                let content_hash = preprocess::content_hash(&text);

                let current = store.entry(&record.key, &tag);
                let is_new = current.is_none();
                let changed = current.is_some_and(|e| e.content_hash != content_hash);

                if !options.force_rebuild && !is_new && !changed {
                    report.unchanged += 1;
                    continue;
                }

                pending.push(PendingItem {
                    key: record.key.clone(),
                    text,
                    content_hash,
                    metadata: record.metadata.clone(),
                    is_new,
                });
            }
        }
        drop(records);

        // Embed and commit, one batch at a time.
        let batch_size = SYNC_BATCH.min(self.provider.max_batch()).max(1);
        let progress = embed_progress(pending.len() as u64);

        for batch in pending.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();

            let vectors = match self.provider.embed_batch(&texts) {
                Ok(vectors) => vectors,
                Err(e) => {
                    progress.abandon();
                    log::error!("sync pass aborted during embedding: {e}");
                    return Err(e.into());
                }
            };

            let updated_at = Utc::now().timestamp();
            let mut store = self.lock_store();
            for (item, embedding) in batch.iter().zip(vectors) {
                store.upsert(
                    &item.key,
                    VectorEntry {
                        version_tag: tag,
                        content_hash: item.content_hash,
                        updated_at,
                        embedding,
                        metadata: item.metadata.clone(),
                    },
                )?;

                if item.is_new {
                    report.added += 1;
                } else {
                    report.updated += 1;
                }
            }
            store.save()?;
            drop(store);

            progress.inc(batch.len() as u64);
        }
        progress.finish_and_clear();

        // Removal detection requires a complete snapshot.
        let mut store = self.lock_store();
        if options.force_rebuild && options.since.is_none() && options.limit.is_none() {
            report.removed = store.collect_garbage(&live_keys, &tag);
            if report.removed > 0 {
                store.save()?;
            }
        }

        let now = Utc::now();
        let mut state = store.state().clone();
        state.last_sync_at = Some(now);
        state.item_count = store.active_count(&tag);
        state.last_version_tag = Some(hex::encode(tag));
        if options.force_rebuild {
            state.last_full_rebuild_at = Some(now);
        }
        report.item_count = state.item_count;
        store.set_state(state);
        store.save_state()?;
        drop(store);

        report.duration_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "sync pass complete: {} added, {} updated, {} unchanged, {} removed ({} ms)",
            report.added,
            report.updated,
            report.unchanged,
            report.removed,
            report.duration_ms
        );

        Ok(report)
    }
}

fn embed_progress(total: u64) -> ProgressBar {
    if total == 0 {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message("embedding");
    bar
}
