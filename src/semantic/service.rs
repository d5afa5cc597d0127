//! High-level semantic search service.
//!
//! Owns the vector store, the lazily built embedding provider, and the
//! single-writer discipline: only one sync pass may run at a time, and a
//! trigger arriving while one is in flight is coalesced into a no-op.
//! Queries and status reads run concurrently with an in-flight pass and
//! observe per-batch committed state.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::library::LibrarySource;
use crate::semantic::provider::{
    build_provider, EmbeddingConfig, EmbeddingError, EmbeddingProvider,
};
use crate::semantic::query::{QueryEngine, QueryError};
use crate::semantic::scheduler::UpdateScheduler;
use crate::semantic::store::{MetadataFilter, QueryHit, StoreError, VectorStore};
use crate::semantic::sync::{SyncEngine, SyncError, SyncOptions, SyncReport};

#[derive(Debug, thiserror::Error)]
pub enum SemanticError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] EmbeddingError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Result of a sync trigger.
#[derive(Debug)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Another pass was already in flight; this trigger was dropped. The
    /// running pass will pick up remaining changes on its next run.
    AlreadyRunning,
}

/// Status snapshot for operator reporting.
#[derive(Clone, Debug, Serialize)]
pub struct StatusReport {
    /// Items indexed under the active embedding configuration.
    pub item_count: usize,
    /// All persisted entries, including superseded version tags.
    pub total_entries: usize,
    /// Entries persisted under a non-active version tag; invisible to
    /// queries until re-embedded.
    pub stale_entries: usize,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_full_rebuild_at: Option<DateTime<Utc>>,
    pub provider: String,
    pub version_tag: String,
    pub update_policy: String,
    pub update_due: bool,
}

pub struct SemanticService {
    embedding: EmbeddingConfig,
    scheduler: UpdateScheduler,
    data_dir: PathBuf,
    source: Box<dyn LibrarySource>,
    store: Mutex<VectorStore>,
    /// Lazily built: status reporting must not pay for model loading.
    /// Mutex<Option<_>> instead of OnceLock because get_or_try_init is
    /// unstable.
    provider: Mutex<Option<Arc<dyn EmbeddingProvider>>>,
    sync_running: AtomicBool,
}

impl SemanticService {
    /// Open the service over the persisted index under `data_dir`. The
    /// embedding provider is not built until a sync or search needs it.
    pub fn open(
        embedding: EmbeddingConfig,
        scheduler: UpdateScheduler,
        data_dir: PathBuf,
        source: Box<dyn LibrarySource>,
    ) -> Result<Self, SemanticError> {
        let store = VectorStore::open(&data_dir)?;

        Ok(Self {
            embedding,
            scheduler,
            data_dir,
            source,
            store: Mutex::new(store),
            provider: Mutex::new(None),
            sync_running: AtomicBool::new(false),
        })
    }

    /// Like `open`, but with a pre-built provider. Used by tests and by
    /// callers that already probed the provider.
    pub fn with_provider(
        embedding: EmbeddingConfig,
        scheduler: UpdateScheduler,
        data_dir: PathBuf,
        source: Box<dyn LibrarySource>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, SemanticError> {
        let service = Self::open(embedding, scheduler, data_dir, source)?;
        *service
            .provider
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(provider);
        Ok(service)
    }

    fn provider(&self) -> Result<Arc<dyn EmbeddingProvider>, SemanticError> {
        let mut guard = self.provider.lock().unwrap_or_else(|e| e.into_inner());

        if guard.is_none() {
            log::info!("initializing embedding provider {}", self.embedding.describe());
            let built = build_provider(&self.embedding, self.data_dir.clone())?;
            *guard = Some(Arc::from(built));
        }

        Ok(guard.as_ref().map(Arc::clone).expect("just initialized"))
    }

    /// Trigger a sync pass. Coalesces concurrent triggers: if a pass is
    /// already running the call returns immediately.
    pub fn sync(&self, options: &SyncOptions) -> Result<SyncOutcome, SemanticError> {
        if self
            .sync_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::info!("sync already in flight; trigger coalesced");
            return Ok(SyncOutcome::AlreadyRunning);
        }
        let _guard = SyncFlagGuard(&self.sync_running);

        let provider = self.provider()?;
        let engine = SyncEngine::new(self.source.as_ref(), provider.as_ref(), &self.store);
        let report = engine.run(options)?;

        Ok(SyncOutcome::Completed(report))
    }

    pub fn search(
        &self,
        query_text: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>, SemanticError> {
        let provider = self.provider()?;
        let engine = QueryEngine::new(provider.as_ref(), &self.store);
        Ok(engine.search(query_text, k, filter)?)
    }

    pub fn status(&self) -> StatusReport {
        let tag = self.embedding.version_tag();
        let store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        let state = store.state();

        StatusReport {
            item_count: store.active_count(&tag),
            total_entries: store.total_entries(),
            stale_entries: store.stale_count(&tag),
            last_sync_at: state.last_sync_at,
            last_full_rebuild_at: state.last_full_rebuild_at,
            provider: self.embedding.describe(),
            version_tag: hex::encode(tag),
            update_policy: self.scheduler.policy().describe(),
            update_due: self.scheduler.is_due(state.last_sync_at, Utc::now()),
        }
    }

    /// Spawn a background sync pass if the update policy says one is due.
    /// Never blocks the caller; returns the join handle when a pass was
    /// started so a short-lived process can wait before exiting.
    pub fn spawn_scheduled_sync(
        self: &Arc<Self>,
        options: SyncOptions,
    ) -> Option<JoinHandle<()>> {
        let last_sync_at = {
            let store = self.store.lock().unwrap_or_else(|e| e.into_inner());
            store.state().last_sync_at
        };

        if !self.scheduler.is_due(last_sync_at, Utc::now()) {
            return None;
        }

        log::info!("scheduled sync is due; starting in the background");
        let service = Arc::clone(self);
        Some(std::thread::spawn(move || {
            match service.sync(&options) {
                Ok(SyncOutcome::Completed(report)) => {
                    log::info!(
                        "scheduled sync finished: {} added, {} updated",
                        report.added,
                        report.updated
                    );
                }
                Ok(SyncOutcome::AlreadyRunning) => {}
                Err(e) => log::error!("scheduled sync failed: {e}"),
            }
        }))
    }
}

struct SyncFlagGuard<'a>(&'a AtomicBool);

impl Drop for SyncFlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
