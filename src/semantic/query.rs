//! Query engine: read-only similarity search over the vector store.

use std::sync::Mutex;

use crate::semantic::provider::{EmbeddingError, EmbeddingProvider};
use crate::semantic::store::{MetadataFilter, QueryHit, StoreError, VectorStore};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Provider(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct QueryEngine<'a> {
    provider: &'a dyn EmbeddingProvider,
    store: &'a Mutex<VectorStore>,
}

impl<'a> QueryEngine<'a> {
    pub fn new(provider: &'a dyn EmbeddingProvider, store: &'a Mutex<VectorStore>) -> Self {
        Self { provider, store }
    }

    /// Embed `query_text` with the active provider and return the top `k`
    /// items by cosine similarity. Entries stored under a different
    /// version tag are invisible; an index with no active-version entries
    /// yields an empty result, not an error.
    pub fn search(
        &self,
        query_text: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>, QueryError> {
        let tag = self.provider.version_tag();

        {
            let store = self.store.lock().unwrap_or_else(|e| e.into_inner());
            if store.active_count(&tag) == 0 {
                if store.total_entries() > 0 {
                    log::warn!(
                        "no entries match the active embedding configuration; \
                         run `zotsem sync` to re-embed the library"
                    );
                }
                return Ok(Vec::new());
            }
        }

        // Embed outside the store lock; provider calls may block on I/O.
        let vector = self.provider.embed_one(query_text)?;

        let store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        Ok(store.query(&vector, k, &tag, filter)?)
    }
}
