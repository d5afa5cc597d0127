//! Durable vector store.
//!
//! In-memory map of item key to embedding entries, persisted to
//! `vectors.bin`. An item may carry one entry per version tag: vectors
//! produced under a superseded embedding configuration stay on disk but
//! are invisible to queries, so scores from incompatible vector spaces
//! never mix. The store also owns the persisted `SyncState` snapshot
//! (`sync_state.json`).
//!
//! `vectors.bin` layout (little-endian):
//!
//! Header (17 bytes):
//! - magic: `ZSEM` (4)
//! - format version: u8
//! - entry count: u64
//! - checksum: CRC32 of the preceding 13 bytes
//!
//! Records (repeated):
//! - key length: u16, key bytes (UTF-8)
//! - version tag: [u8; 32]
//! - content hash: u64
//! - updated_at: i64 (unix seconds)
//! - dimension: u16, vector: f32 * dimension
//! - metadata length: u32, metadata (JSON)

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::library::ItemMetadata;

const MAGIC: &[u8; 4] = b"ZSEM";
const FORMAT_VERSION: u8 = 1;
const HEADER_SIZE: usize = 17;

const VECTORS_FILE: &str = "vectors.bin";
const STATE_FILE: &str = "sync_state.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vector index corrupted ({0}); run `zotsem rebuild` to regenerate it")]
    Corrupted(String),

    #[error(
        "unsupported index format version {found} (supported {supported}); \
         run `zotsem rebuild` to regenerate it"
    )]
    UnsupportedVersion { found: u8, supported: u8 },

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("cannot store or search with a zero-norm vector")]
    ZeroNormVector,
}

/// One persisted embedding for an `(item key, version tag)` pair.
#[derive(Clone, Debug)]
pub struct VectorEntry {
    pub version_tag: [u8; 32],
    pub content_hash: u64,
    pub updated_at: i64,
    pub embedding: Vec<f32>,
    pub metadata: ItemMetadata,
}

/// Process-wide sync bookkeeping, written after every successful pass.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default)]
    pub last_sync_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_full_rebuild_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub item_count: usize,
    /// Hex version tag of the configuration that last wrote the index. A
    /// reopened store can report which vector space it holds without the
    /// provider being built.
    #[serde(default)]
    pub last_version_tag: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct QueryHit {
    pub key: String,
    pub score: f32,
    pub metadata: ItemMetadata,
}

/// Optional metadata predicate applied before ranking.
#[derive(Clone, Debug, Default)]
pub struct MetadataFilter {
    pub item_type: Option<String>,
    pub tag: Option<String>,
}

impl MetadataFilter {
    pub fn is_empty(&self) -> bool {
        self.item_type.is_none() && self.tag.is_none()
    }

    pub fn matches(&self, metadata: &ItemMetadata) -> bool {
        if let Some(item_type) = &self.item_type {
            if !metadata.item_type.eq_ignore_ascii_case(item_type) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !metadata.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                return false;
            }
        }
        true
    }
}

pub struct VectorStore {
    /// Item key -> entries, at most one per version tag.
    entries: HashMap<String, Vec<VectorEntry>>,
    state: SyncState,
    dir: PathBuf,
}

impl VectorStore {
    /// Open the store under `dir`, loading any persisted index and sync
    /// state. A missing index starts empty; an unreadable one surfaces a
    /// corruption error instead of being silently repaired.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;

        let mut store = Self {
            entries: HashMap::new(),
            state: SyncState::default(),
            dir: dir.to_path_buf(),
        };

        let vectors_path = store.vectors_path();
        if vectors_path.exists() {
            store.entries = load_entries(&vectors_path)?;
            log::info!(
                "loaded {} vectors for {} items",
                store.total_entries(),
                store.entries.len()
            );
        }

        let state_path = store.state_path();
        if state_path.exists() {
            let bytes = std::fs::read(&state_path)?;
            store.state = serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Corrupted(format!("sync state unreadable: {e}")))?;
        }

        Ok(store)
    }

    fn vectors_path(&self) -> PathBuf {
        self.dir.join(VECTORS_FILE)
    }

    fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    /// Insert or replace the entry for `(key, entry.version_tag)`. Within
    /// one version tag the dimension is fixed, so a replacement with a
    /// different dimension is rejected as inconsistent.
    pub fn upsert(&mut self, key: &str, entry: VectorEntry) -> Result<(), StoreError> {
        if l2_norm(&entry.embedding) < f32::EPSILON {
            return Err(StoreError::ZeroNormVector);
        }

        let slot = self.entries.entry(key.to_string()).or_default();
        match slot.iter_mut().find(|e| e.version_tag == entry.version_tag) {
            Some(existing) => {
                if existing.embedding.len() != entry.embedding.len() {
                    return Err(StoreError::DimensionMismatch {
                        expected: existing.embedding.len(),
                        got: entry.embedding.len(),
                    });
                }
                *existing = entry;
            }
            None => slot.push(entry),
        }
        Ok(())
    }

    /// Remove every entry for the given keys, regardless of version tag.
    pub fn delete(&mut self, keys: &[String]) -> usize {
        let mut removed = 0;
        for key in keys {
            if self.entries.remove(key).is_some() {
                removed += 1;
            }
        }
        removed
    }

    pub fn entry(&self, key: &str, version_tag: &[u8; 32]) -> Option<&VectorEntry> {
        self.entries
            .get(key)?
            .iter()
            .find(|e| &e.version_tag == version_tag)
    }

    pub fn contains(&self, key: &str, version_tag: &[u8; 32]) -> bool {
        self.entry(key, version_tag).is_some()
    }

    /// Total persisted entries across all version tags.
    pub fn total_entries(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }

    /// Entries under the given (active) version tag.
    pub fn active_count(&self, version_tag: &[u8; 32]) -> usize {
        self.entries
            .values()
            .filter(|v| v.iter().any(|e| &e.version_tag == version_tag))
            .count()
    }

    /// Entries persisted under a version tag other than the active one.
    /// They are invisible to queries until re-embedded or collected.
    pub fn stale_count(&self, version_tag: &[u8; 32]) -> usize {
        self.entries
            .values()
            .flatten()
            .filter(|e| &e.version_tag != version_tag)
            .count()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Drop entries whose key is absent from `live` and entries persisted
    /// under a non-active version tag. Runs at the end of a full rebuild,
    /// bounding the store to the current library extent.
    pub fn collect_garbage(
        &mut self,
        live: &HashSet<String>,
        active_tag: &[u8; 32],
    ) -> usize {
        let before = self.total_entries();

        self.entries.retain(|key, slot| {
            if !live.contains(key) {
                return false;
            }
            slot.retain(|e| &e.version_tag == active_tag);
            !slot.is_empty()
        });

        before - self.total_entries()
    }

    /// Nearest neighbors under the active version tag, by cosine
    /// similarity. Ties break by most recent `updated_at`, then by key
    /// ascending, so repeated identical queries return a stable order.
    pub fn query(
        &self,
        vector: &[f32],
        k: usize,
        active_tag: &[u8; 32],
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>, StoreError> {
        let query_norm = l2_norm(vector);
        if query_norm < f32::EPSILON {
            return Err(StoreError::ZeroNormVector);
        }

        let mut scored: Vec<(&String, &VectorEntry, f32)> = self
            .entries
            .iter()
            .filter_map(|(key, slot)| {
                let entry = slot.iter().find(|e| &e.version_tag == active_tag)?;
                if entry.embedding.len() != vector.len() {
                    return None;
                }
                if let Some(filter) = filter {
                    if !filter.matches(&entry.metadata) {
                        return None;
                    }
                }
                let score = cosine_similarity(vector, &entry.embedding, query_norm);
                Some((key, entry, score))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.1.updated_at.cmp(&a.1.updated_at))
                .then_with(|| a.0.cmp(b.0))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(key, entry, score)| QueryHit {
                key: key.clone(),
                score,
                metadata: entry.metadata.clone(),
            })
            .collect())
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn set_state(&mut self, state: SyncState) {
        self.state = state;
    }

    /// Persist the index. Atomic: temp file, fsync, rename.
    pub fn save(&self) -> Result<(), StoreError> {
        let path = self.vectors_path();
        let temp_path = path.with_extension("bin.tmp");

        if let Err(e) = self.write_entries(&temp_path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }

        std::fs::rename(&temp_path, &path)?;
        Ok(())
    }

    /// Persist the sync state snapshot.
    pub fn save_state(&self) -> Result<(), StoreError> {
        let path = self.state_path();
        let temp_path = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec_pretty(&self.state)
            .map_err(|e| StoreError::Corrupted(format!("sync state unserializable: {e}")))?;

        std::fs::write(&temp_path, bytes)?;
        std::fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn write_entries(&self, path: &Path) -> Result<(), StoreError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let mut header = [0u8; HEADER_SIZE];
        header[0..4].copy_from_slice(MAGIC);
        header[4] = FORMAT_VERSION;
        header[5..13].copy_from_slice(&(self.total_entries() as u64).to_le_bytes());
        let checksum = crc32fast::hash(&header[0..13]);
        header[13..17].copy_from_slice(&checksum.to_le_bytes());
        writer.write_all(&header)?;

        for (key, slot) in &self.entries {
            for entry in slot {
                write_entry(&mut writer, key, entry)?;
            }
        }

        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e.to_string()))?;
        file.sync_all()?;
        Ok(())
    }
}

fn write_entry(
    writer: &mut impl Write,
    key: &str,
    entry: &VectorEntry,
) -> Result<(), StoreError> {
    let key_bytes = key.as_bytes();
    writer.write_all(&(key_bytes.len() as u16).to_le_bytes())?;
    writer.write_all(key_bytes)?;
    writer.write_all(&entry.version_tag)?;
    writer.write_all(&entry.content_hash.to_le_bytes())?;
    writer.write_all(&entry.updated_at.to_le_bytes())?;
    writer.write_all(&(entry.embedding.len() as u16).to_le_bytes())?;
    for value in &entry.embedding {
        writer.write_all(&value.to_le_bytes())?;
    }

    let metadata = serde_json::to_vec(&entry.metadata)
        .map_err(|e| StoreError::Corrupted(format!("metadata unserializable: {e}")))?;
    writer.write_all(&(metadata.len() as u32).to_le_bytes())?;
    writer.write_all(&metadata)?;
    Ok(())
}

fn load_entries(path: &Path) -> Result<HashMap<String, Vec<VectorEntry>>, StoreError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header).map_err(map_eof)?;

    if &header[0..4] != MAGIC {
        return Err(StoreError::Corrupted("bad magic bytes".to_string()));
    }

    let version = header[4];
    if version != FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: version,
            supported: FORMAT_VERSION,
        });
    }

    let entry_count = u64::from_le_bytes(header[5..13].try_into().expect("8 bytes"));
    let stored_checksum = u32::from_le_bytes(header[13..17].try_into().expect("4 bytes"));
    if stored_checksum != crc32fast::hash(&header[0..13]) {
        return Err(StoreError::Corrupted("header checksum mismatch".to_string()));
    }

    let mut entries: HashMap<String, Vec<VectorEntry>> = HashMap::new();
    for _ in 0..entry_count {
        let (key, entry) = read_entry(&mut reader)?;
        entries.entry(key).or_default().push(entry);
    }

    Ok(entries)
}

fn read_entry(reader: &mut impl Read) -> Result<(String, VectorEntry), StoreError> {
    let key_len = read_u16(reader)? as usize;
    let mut key_bytes = vec![0u8; key_len];
    reader.read_exact(&mut key_bytes).map_err(map_eof)?;
    let key = String::from_utf8(key_bytes)
        .map_err(|_| StoreError::Corrupted("non-UTF-8 item key".to_string()))?;

    let mut version_tag = [0u8; 32];
    reader.read_exact(&mut version_tag).map_err(map_eof)?;

    let mut hash_bytes = [0u8; 8];
    reader.read_exact(&mut hash_bytes).map_err(map_eof)?;
    let content_hash = u64::from_le_bytes(hash_bytes);

    let mut time_bytes = [0u8; 8];
    reader.read_exact(&mut time_bytes).map_err(map_eof)?;
    let updated_at = i64::from_le_bytes(time_bytes);

    let dimension = read_u16(reader)? as usize;
    let mut embedding = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let mut value = [0u8; 4];
        reader.read_exact(&mut value).map_err(map_eof)?;
        embedding.push(f32::from_le_bytes(value));
    }

    let mut meta_len_bytes = [0u8; 4];
    reader.read_exact(&mut meta_len_bytes).map_err(map_eof)?;
    let meta_len = u32::from_le_bytes(meta_len_bytes) as usize;
    let mut meta_bytes = vec![0u8; meta_len];
    reader.read_exact(&mut meta_bytes).map_err(map_eof)?;
    let metadata: ItemMetadata = serde_json::from_slice(&meta_bytes)
        .map_err(|e| StoreError::Corrupted(format!("metadata unreadable: {e}")))?;

    Ok((
        key,
        VectorEntry {
            version_tag,
            content_hash,
            updated_at,
            embedding,
            metadata,
        },
    ))
}

fn read_u16(reader: &mut impl Read) -> Result<u16, StoreError> {
    let mut bytes = [0u8; 2];
    reader.read_exact(&mut bytes).map_err(map_eof)?;
    Ok(u16::from_le_bytes(bytes))
}

fn map_eof(err: std::io::Error) -> StoreError {
    if err.kind() == ErrorKind::UnexpectedEof {
        StoreError::Corrupted("truncated index file".to_string())
    } else {
        StoreError::Io(err)
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine_similarity(query: &[f32], target: &[f32], query_norm: f32) -> f32 {
    let target_norm = l2_norm(target);
    if target_norm < f32::EPSILON {
        return 0.0;
    }
    let dot: f32 = query.iter().zip(target.iter()).map(|(a, b)| a * b).sum();
    dot / (query_norm * target_norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG_A: [u8; 32] = [0xAA; 32];
    const TAG_B: [u8; 32] = [0xBB; 32];

    fn entry(tag: [u8; 32], hash: u64, embedding: Vec<f32>, updated_at: i64) -> VectorEntry {
        VectorEntry {
            version_tag: tag,
            content_hash: hash,
            updated_at,
            embedding,
            metadata: ItemMetadata::default(),
        }
    }

    fn open_temp() -> (tempfile::TempDir, VectorStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn upsert_replaces_same_key_and_tag() {
        let (_dir, mut store) = open_temp();

        store.upsert("K1", entry(TAG_A, 1, vec![1.0, 0.0], 10)).unwrap();
        store.upsert("K1", entry(TAG_A, 2, vec![0.0, 1.0], 20)).unwrap();

        assert_eq!(store.total_entries(), 1);
        assert_eq!(store.entry("K1", &TAG_A).unwrap().content_hash, 2);
    }

    #[test]
    fn entries_under_different_tags_coexist() {
        let (_dir, mut store) = open_temp();

        store.upsert("K1", entry(TAG_A, 1, vec![1.0, 0.0], 10)).unwrap();
        store.upsert("K1", entry(TAG_B, 1, vec![0.0, 1.0], 10)).unwrap();

        assert_eq!(store.total_entries(), 2);
        assert_eq!(store.active_count(&TAG_A), 1);
        assert_eq!(store.stale_count(&TAG_A), 1);
    }

    #[test]
    fn upsert_rejects_dimension_change_within_tag() {
        let (_dir, mut store) = open_temp();
        store.upsert("K1", entry(TAG_A, 1, vec![1.0, 0.0], 10)).unwrap();

        let result = store.upsert("K1", entry(TAG_A, 2, vec![1.0, 0.0, 0.0], 20));
        assert!(matches!(
            result,
            Err(StoreError::DimensionMismatch { expected: 2, got: 3 })
        ));
    }

    #[test]
    fn zero_norm_vectors_are_rejected() {
        let (_dir, mut store) = open_temp();
        let result = store.upsert("K1", entry(TAG_A, 1, vec![0.0, 0.0], 10));
        assert!(matches!(result, Err(StoreError::ZeroNormVector)));
    }

    #[test]
    fn delete_removes_all_tags_for_key() {
        let (_dir, mut store) = open_temp();
        store.upsert("K1", entry(TAG_A, 1, vec![1.0, 0.0], 10)).unwrap();
        store.upsert("K1", entry(TAG_B, 1, vec![0.0, 1.0], 10)).unwrap();
        store.upsert("K2", entry(TAG_A, 1, vec![1.0, 1.0], 10)).unwrap();

        let removed = store.delete(&["K1".to_string()]);
        assert_eq!(removed, 1);
        assert_eq!(store.total_entries(), 1);
        assert!(store.entry("K1", &TAG_A).is_none());
    }

    #[test]
    fn query_ranks_by_similarity() {
        let (_dir, mut store) = open_temp();
        store.upsert("K1", entry(TAG_A, 1, vec![1.0, 0.0], 10)).unwrap();
        store.upsert("K2", entry(TAG_A, 2, vec![0.0, 1.0], 10)).unwrap();

        let hits = store.query(&[1.0, 0.1], 10, &TAG_A, None).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].key, "K1");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn query_hides_non_active_versions() {
        let (_dir, mut store) = open_temp();
        store.upsert("K1", entry(TAG_A, 1, vec![1.0, 0.0], 10)).unwrap();

        let hits = store.query(&[1.0, 0.0], 10, &TAG_B, None).unwrap();
        assert!(hits.is_empty());
        // The entry is still physically present.
        assert_eq!(store.total_entries(), 1);
    }

    #[test]
    fn query_tie_break_is_stable() {
        let (_dir, mut store) = open_temp();
        // Identical vectors, identical scores.
        store.upsert("KB", entry(TAG_A, 1, vec![1.0, 0.0], 10)).unwrap();
        store.upsert("KA", entry(TAG_A, 2, vec![1.0, 0.0], 10)).unwrap();
        store.upsert("KC", entry(TAG_A, 3, vec![1.0, 0.0], 99)).unwrap();

        for _ in 0..3 {
            let hits = store.query(&[1.0, 0.0], 10, &TAG_A, None).unwrap();
            let keys: Vec<&str> = hits.iter().map(|h| h.key.as_str()).collect();
            // Most recent updated_at first, then key ascending.
            assert_eq!(keys, vec!["KC", "KA", "KB"]);
        }
    }

    #[test]
    fn query_applies_metadata_filter() {
        let (_dir, mut store) = open_temp();

        let mut book = entry(TAG_A, 1, vec![1.0, 0.0], 10);
        book.metadata.item_type = "book".to_string();
        book.metadata.tags = vec!["ml".to_string()];
        store.upsert("K1", book).unwrap();

        let mut article = entry(TAG_A, 2, vec![1.0, 0.0], 10);
        article.metadata.item_type = "journalArticle".to_string();
        store.upsert("K2", article).unwrap();

        let filter = MetadataFilter {
            item_type: Some("book".to_string()),
            tag: None,
        };
        let hits = store.query(&[1.0, 0.0], 10, &TAG_A, Some(&filter)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "K1");

        let filter = MetadataFilter {
            item_type: None,
            tag: Some("ML".to_string()),
        };
        let hits = store.query(&[1.0, 0.0], 10, &TAG_A, Some(&filter)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "K1");
    }

    #[test]
    fn query_with_zero_norm_vector_fails() {
        let (_dir, store) = open_temp();
        let result = store.query(&[0.0, 0.0], 10, &TAG_A, None);
        assert!(matches!(result, Err(StoreError::ZeroNormVector)));
    }

    #[test]
    fn garbage_collection_drops_dead_and_stale() {
        let (_dir, mut store) = open_temp();
        store.upsert("K1", entry(TAG_A, 1, vec![1.0, 0.0], 10)).unwrap();
        store.upsert("K1", entry(TAG_B, 1, vec![0.0, 1.0], 10)).unwrap();
        store.upsert("K2", entry(TAG_A, 2, vec![1.0, 1.0], 10)).unwrap();
        store.upsert("K3", entry(TAG_B, 3, vec![1.0, 1.0], 10)).unwrap();

        let live: HashSet<String> = ["K1".to_string(), "K2".to_string()].into();
        let removed = store.collect_garbage(&live, &TAG_A);

        // K1's TAG_B entry, K2 kept, K3 gone entirely.
        assert_eq!(removed, 2);
        assert_eq!(store.total_entries(), 2);
        assert!(store.entry("K1", &TAG_B).is_none());
        assert!(store.entry("K3", &TAG_B).is_none());
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();

        {
            let mut store = VectorStore::open(dir.path()).unwrap();
            let mut e = entry(TAG_A, 42, vec![0.5, -0.5, 1.0], 1234);
            e.metadata.title = "A Paper".to_string();
            e.metadata.tags = vec!["nlp".to_string()];
            store.upsert("KEY1", e).unwrap();
            store.upsert("KEY1", entry(TAG_B, 7, vec![1.0, 0.0, 0.0], 99)).unwrap();
            store.save().unwrap();

            store.set_state(SyncState {
                last_sync_at: Some(Utc::now()),
                last_full_rebuild_at: None,
                item_count: 1,
                last_version_tag: Some(hex::encode(TAG_A)),
            });
            store.save_state().unwrap();
        }

        let store = VectorStore::open(dir.path()).unwrap();
        assert_eq!(store.total_entries(), 2);

        let e = store.entry("KEY1", &TAG_A).unwrap();
        assert_eq!(e.content_hash, 42);
        assert_eq!(e.updated_at, 1234);
        assert_eq!(e.embedding, vec![0.5, -0.5, 1.0]);
        assert_eq!(e.metadata.title, "A Paper");

        assert_eq!(store.state().item_count, 1);
        assert!(store.state().last_sync_at.is_some());
        assert_eq!(
            store.state().last_version_tag.as_deref(),
            Some(hex::encode(TAG_A).as_str())
        );
    }

    #[test]
    fn corrupted_header_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();

        {
            let mut store = VectorStore::open(dir.path()).unwrap();
            store.upsert("K1", entry(TAG_A, 1, vec![1.0], 10)).unwrap();
            store.save().unwrap();
        }

        // Flip a byte inside the header.
        let path = dir.path().join(VECTORS_FILE);
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[6] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        let result = VectorStore::open(dir.path());
        assert!(matches!(result, Err(StoreError::Corrupted(_))));
    }

    #[test]
    fn truncated_file_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();

        {
            let mut store = VectorStore::open(dir.path()).unwrap();
            store.upsert("K1", entry(TAG_A, 1, vec![1.0, 2.0], 10)).unwrap();
            store.save().unwrap();
        }

        let path = dir.path().join(VECTORS_FILE);
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();

        let result = VectorStore::open(dir.path());
        assert!(matches!(result, Err(StoreError::Corrupted(_))));
    }

    #[test]
    fn unsupported_version_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = VectorStore::open(dir.path()).unwrap();
            store.save().unwrap();
        }

        let path = dir.path().join(VECTORS_FILE);
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[4] = FORMAT_VERSION + 1;
        let checksum = crc32fast::hash(&bytes[0..13]);
        bytes[13..17].copy_from_slice(&checksum.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        let result = VectorStore::open(dir.path());
        assert!(matches!(
            result,
            Err(StoreError::UnsupportedVersion { .. })
        ));
    }
}
