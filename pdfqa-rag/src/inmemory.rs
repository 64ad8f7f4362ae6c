//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. The whole store can be
//! persisted to a JSON snapshot and loaded back.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{CollectionInfo, VectorStore};

const BACKEND: &str = "InMemory";
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredChunk {
    /// Insertion sequence, used to break score ties.
    seq: u64,
    chunk: Chunk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Collection {
    info: CollectionInfo,
    next_seq: u64,
    entries: HashMap<String, StoredChunk>,
}

impl Collection {
    fn new(info: CollectionInfo) -> Self {
        Self { info, next_seq: 0, entries: HashMap::new() }
    }

    fn check_dimensions(&self, name: &str, chunks: &[Chunk]) -> Result<()> {
        match chunks.iter().find(|c| c.embedding.len() != self.info.dimensions) {
            Some(chunk) => Err(RagError::VectorStore {
                backend: BACKEND.to_string(),
                message: format!(
                    "chunk '{}' has {} dimensions, collection '{name}' expects {}",
                    chunk.id,
                    chunk.embedding.len(),
                    self.info.dimensions
                ),
            }),
            None => Ok(()),
        }
    }

    /// Insert a chunk, keeping the sequence number of an entry it replaces.
    fn insert(&mut self, chunk: Chunk, previous_seq: Option<u64>) {
        let seq = previous_seq.unwrap_or_else(|| {
            let seq = self.next_seq;
            self.next_seq += 1;
            seq
        });
        self.entries.insert(chunk.id.clone(), StoredChunk { seq, chunk });
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    collections: BTreeMap<String, Collection>,
}

/// An in-memory vector store using cosine similarity for search.
///
/// Collections are stored as nested `HashMap`s: collection name → chunk ID → chunk.
/// All operations are async-safe via `tokio::sync::RwLock`; every mutation
/// happens under a single write guard, so searches never observe a
/// half-applied write.
///
/// # Example
///
/// ```rust,ignore
/// use pdfqa_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::open("data/index.json").await?;
/// store.save("data/index.json").await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a snapshot written by [`save`](Self::save).
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(RagError::VectorStore {
                backend: BACKEND.to_string(),
                message: format!(
                    "unsupported snapshot version {} in {}",
                    snapshot.version,
                    path.display()
                ),
            });
        }
        info!(path = %path.display(), collections = snapshot.collections.len(), "loaded index snapshot");
        Ok(Self { collections: RwLock::new(snapshot.collections.into_iter().collect()) })
    }

    /// Load the snapshot at `path` if it exists, otherwise start empty.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if tokio::fs::try_exists(path).await? {
            Self::load(path).await
        } else {
            debug!(path = %path.display(), "no index snapshot found, starting empty");
            Ok(Self::new())
        }
    }

    /// Persist the store as a JSON snapshot.
    ///
    /// The snapshot is written to a sibling temporary file and renamed into
    /// place, so a crash never leaves a truncated snapshot behind.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = {
            let collections = self.collections.read().await;
            let snapshot = SnapshotRef { version: SNAPSHOT_VERSION, collections: &collections };
            serde_json::to_vec(&snapshot)?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;

        info!(path = %path.display(), bytes = bytes.len(), "saved index snapshot");
        Ok(())
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    collections: &'a HashMap<String, Collection>,
}

fn missing_collection(name: &str) -> RagError {
    RagError::VectorStore {
        backend: BACKEND.to_string(),
        message: format!("collection '{name}' does not exist"),
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, info: CollectionInfo) -> Result<()> {
        let mut collections = self.collections.write().await;
        match collections.get(name) {
            Some(existing) if existing.info != info => Err(RagError::ModelMismatch {
                collection: name.to_string(),
                indexed_model: existing.info.embedding_model.clone(),
                indexed_dimensions: existing.info.dimensions,
                requested_model: info.embedding_model,
                requested_dimensions: info.dimensions,
            }),
            Some(_) => Ok(()),
            None => {
                collections.insert(name.to_string(), Collection::new(info));
                Ok(())
            }
        }
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let collections = self.collections.read().await;
        Ok(collections.get(name).map(|c| c.info.clone()))
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;
        store.check_dimensions(collection, chunks)?;
        for chunk in chunks {
            let previous = store.entries.get(&chunk.id).map(|e| e.seq);
            store.insert(chunk.clone(), previous);
        }
        Ok(())
    }

    async fn replace_document(
        &self,
        collection: &str,
        document_id: &str,
        chunks: &[Chunk],
    ) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;
        store.check_dimensions(collection, chunks)?;
        if let Some(chunk) = chunks.iter().find(|c| c.document_id != document_id) {
            return Err(RagError::VectorStore {
                backend: BACKEND.to_string(),
                message: format!("chunk '{}' does not belong to document '{document_id}'", chunk.id),
            });
        }

        let mut previous: HashMap<String, u64> = HashMap::new();
        store.entries.retain(|id, entry| {
            if entry.chunk.document_id == document_id {
                previous.insert(id.clone(), entry.seq);
                false
            } else {
                true
            }
        });
        for chunk in chunks {
            let seq = previous.get(&chunk.id).copied();
            store.insert(chunk.clone(), seq);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;
        for id in ids {
            store.entries.remove(*id);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing_collection(collection))?;

        let mut scored: Vec<(u64, SearchResult)> = store
            .entries
            .values()
            .map(|entry| {
                let score = cosine_similarity(&entry.chunk.embedding, embedding);
                (entry.seq, SearchResult { chunk: entry.chunk.clone(), score })
            })
            .collect();

        scored.sort_by(|(seq_a, a), (seq_b, b)| b.score.total_cmp(&a.score).then(seq_a.cmp(seq_b)));
        scored.truncate(top_k);
        Ok(scored.into_iter().map(|(_, result)| result).collect())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing_collection(collection))?;
        Ok(store.entries.len())
    }

    async fn document_ids(&self, collection: &str) -> Result<Vec<String>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing_collection(collection))?;
        let mut ids: Vec<String> =
            store.entries.values().map(|e| e.chunk.document_id.clone()).collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}
