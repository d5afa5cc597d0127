//! Semantic search over the library.
//!
//! # Architecture
//!
//! - `provider`: embedding providers (local fastembed, OpenAI, Gemini)
//! - `preprocess`: embedding input composition and content hashing
//! - `store`: durable vector store with version-tag isolation
//! - `sync`: diff -> embed -> commit reconciliation passes
//! - `query`: similarity search against the store
//! - `scheduler`: update-frequency policy
//! - `service`: coordination, lazy init, single-writer discipline

pub mod preprocess;
pub mod provider;
pub mod query;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod sync;

pub use provider::{EmbeddingConfig, EmbeddingProvider, ProviderKind};
pub use query::QueryEngine;
pub use scheduler::{UpdatePolicy, UpdateScheduler};
pub use service::{SemanticError, SemanticService, StatusReport, SyncOutcome};
pub use store::{MetadataFilter, QueryHit, SyncState, VectorEntry, VectorStore};
pub use sync::{SyncEngine, SyncMode, SyncOptions, SyncReport};

/// Default local embedding model (bge-base offers a solid accuracy/speed
/// trade-off on research abstracts).
pub const DEFAULT_MODEL: &str = "bge-base-en-v1.5";
