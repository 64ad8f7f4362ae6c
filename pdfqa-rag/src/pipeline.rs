//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the ingest-and-query workflow by composing
//! an [`EmbeddingProvider`], a [`VectorStore`] and a [`Chunker`].
//!
//! # Example
//!
//! ```rust,ignore
//! use pdfqa_rag::{RagPipeline, RagConfig, InMemoryVectorStore};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! pipeline.create_collection("docs").await?;
//! let report = pipeline.ingest_batch("docs", &documents).await?;
//! let results = pipeline.query("docs", "search query").await?;
//! ```

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use futures::stream;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::{CollectionInfo, VectorStore};

/// Maximum number of chunk texts sent to the embedding provider per call.
const EMBED_BATCH_SIZE: usize = 32;

/// Outcome of ingesting a single document.
#[derive(Debug)]
pub enum DocumentOutcome {
    Indexed { document_id: String, chunk_count: usize },
    Failed { document_id: String, error: RagError },
}

/// Per-document results of a batch ingestion.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub outcomes: Vec<DocumentOutcome>,
}

impl IngestReport {
    /// IDs of the documents that were fully indexed.
    pub fn indexed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                DocumentOutcome::Indexed { document_id, .. } => Some(document_id.as_str()),
                DocumentOutcome::Failed { .. } => None,
            })
            .collect()
    }

    /// The documents that failed, with their errors.
    pub fn failed(&self) -> Vec<(&str, &RagError)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                DocumentOutcome::Failed { document_id, error } => Some((document_id.as_str(), error)),
                DocumentOutcome::Indexed { .. } => None,
            })
            .collect()
    }

    /// Total number of chunks written.
    pub fn chunk_count(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                DocumentOutcome::Indexed { chunk_count, .. } => *chunk_count,
                DocumentOutcome::Failed { .. } => 0,
            })
            .sum()
    }
}

/// Summary of a collection's contents.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IndexStats {
    pub collection: String,
    pub embedding_model: Option<String>,
    pub dimensions: Option<usize>,
    pub chunk_count: usize,
    pub document_ids: Vec<String>,
}

/// The RAG pipeline orchestrator.
///
/// Coordinates document ingestion (chunk → embed → store) and query
/// execution (embed → search → filter). Construct one via
/// [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    fn provider_info(&self) -> CollectionInfo {
        CollectionInfo {
            embedding_model: self.embedding_provider.model_id().to_string(),
            dimensions: self.embedding_provider.dimensions(),
        }
    }

    /// Create a named collection bound to the provider's embedding model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ModelMismatch`] if the collection already exists
    /// with a different embedding model.
    pub async fn create_collection(&self, name: &str) -> Result<()> {
        self.vector_store.create_collection(name, self.provider_info()).await.inspect_err(|e| {
            error!(collection = name, error = %e, "failed to create collection");
        })
    }

    /// Delete a named collection from the vector store.
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        self.vector_store.delete_collection(name).await.inspect_err(|e| {
            error!(collection = name, error = %e, "failed to delete collection");
        })
    }

    /// Check that `collection` was indexed with this pipeline's embedding model.
    ///
    /// Returns `false` if the collection does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ModelMismatch`] if the recorded model or
    /// dimensionality differs from the provider's.
    pub async fn ensure_compatible(&self, collection: &str) -> Result<bool> {
        let Some(indexed) = self.vector_store.collection_info(collection).await? else {
            return Ok(false);
        };
        let requested = self.provider_info();
        if indexed != requested {
            warn!(
                collection,
                indexed_model = %indexed.embedding_model,
                requested_model = %requested.embedding_model,
                "embedding model mismatch"
            );
            return Err(RagError::ModelMismatch {
                collection: collection.to_string(),
                indexed_model: indexed.embedding_model,
                indexed_dimensions: indexed.dimensions,
                requested_model: requested.embedding_model,
                requested_dimensions: requested.dimensions,
            });
        }
        Ok(true)
    }

    /// Ingest a single document: chunk → embed → store.
    ///
    /// The document's chunks are written in one atomic replace, so a failure
    /// anywhere leaves no partial entries and re-ingesting the same document
    /// replaces its previous chunks instead of duplicating them.
    ///
    /// Returns the chunks that were stored (with embeddings attached).
    pub async fn ingest(&self, collection: &str, document: &Document) -> Result<Vec<Chunk>> {
        if !self.ensure_compatible(collection).await? {
            self.create_collection(collection).await?;
        }
        self.ingest_into_existing(collection, document).await
    }

    async fn ingest_into_existing(&self, collection: &str, document: &Document) -> Result<Vec<Chunk>> {
        let chunks = self.embed_document(document).await?;
        self.commit_document(collection, document, chunks).await
    }

    /// Chunk and embed a document without touching the store.
    async fn embed_document(&self, document: &Document) -> Result<Vec<Chunk>> {
        let mut chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            return Ok(chunks);
        }

        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let vectors = self.embedding_provider.embed_batch(&texts).await.inspect_err(|e| {
                error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
            })?;
            if vectors.len() != texts.len() {
                return Err(RagError::EmbeddingService {
                    provider: self.embedding_provider.model_id().to_string(),
                    message: format!(
                        "expected {} embeddings for document '{}', received {}",
                        texts.len(),
                        document.id,
                        vectors.len()
                    ),
                    retryable: false,
                });
            }
            embeddings.extend(vectors);
        }

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }
        Ok(chunks)
    }

    async fn commit_document(
        &self,
        collection: &str,
        document: &Document,
        chunks: Vec<Chunk>,
    ) -> Result<Vec<Chunk>> {
        self.vector_store.replace_document(collection, &document.id, &chunks).await.inspect_err(
            |e| error!(document.id = %document.id, error = %e, "store write failed during ingestion"),
        )?;

        info!(document.id = %document.id, chunk_count = chunks.len(), "ingested document");
        Ok(chunks)
    }

    /// Ingest multiple documents, up to `ingest_workers` at a time.
    ///
    /// Documents are embedded concurrently but written to the store in input
    /// order, so chunks with equal scores always rank in the order their
    /// documents were given. A failing document is logged and recorded in
    /// the report; the other documents are still indexed.
    ///
    /// # Errors
    ///
    /// Fails as a whole only if the collection cannot be prepared (for
    /// example on an embedding model mismatch).
    pub async fn ingest_batch(&self, collection: &str, documents: &[Document]) -> Result<IngestReport> {
        if !self.ensure_compatible(collection).await? {
            self.create_collection(collection).await?;
        }

        let started = Instant::now();
        let outcomes: Vec<DocumentOutcome> = stream::iter(documents)
            .map(|document| async move { (document, self.embed_document(document).await) })
            .buffered(self.config.ingest_workers)
            .then(|(document, embedded)| async move {
                let stored = match embedded {
                    Ok(chunks) => self.commit_document(collection, document, chunks).await,
                    Err(error) => Err(error),
                };
                match stored {
                    Ok(chunks) => DocumentOutcome::Indexed {
                        document_id: document.id.clone(),
                        chunk_count: chunks.len(),
                    },
                    Err(error) => {
                        warn!(document.id = %document.id, error = %error, "document failed to ingest");
                        DocumentOutcome::Failed { document_id: document.id.clone(), error }
                    }
                }
            })
            .collect()
            .await;

        let report = IngestReport { outcomes };
        info!(
            collection,
            indexed = report.indexed().len(),
            failed = report.failed().len(),
            chunk_count = report.chunk_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch ingestion finished"
        );
        Ok(report)
    }

    /// Query with the configured `top_k`.
    pub async fn query(&self, collection: &str, query: &str) -> Result<Vec<SearchResult>> {
        self.query_top_k(collection, query, self.config.top_k).await
    }

    /// Query the pipeline: check model → embed → search → filter by threshold.
    ///
    /// Returns at most `top_k` results ordered by descending score, with ties
    /// in insertion order. An empty or missing collection yields an empty
    /// result rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `top_k` is zero,
    /// [`RagError::ModelMismatch`] if the collection was indexed with another
    /// embedding model, and [`RagError::EmbeddingService`] if the query
    /// cannot be embedded.
    pub async fn query_top_k(
        &self,
        collection: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if !self.ensure_compatible(collection).await? {
            debug!(collection, "query against missing collection");
            return Ok(Vec::new());
        }
        if self.vector_store.count(collection).await? == 0 {
            debug!(collection, "query against empty collection");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedding_provider.embed(query).await.inspect_err(|e| {
            error!(error = %e, "embedding failed during query");
        })?;

        let results = self.vector_store.search(collection, &query_embedding, top_k).await.inspect_err(
            |e| error!(collection, error = %e, "vector store search failed"),
        )?;

        let filtered: Vec<SearchResult> = match self.config.similarity_threshold {
            Some(threshold) => results.into_iter().filter(|r| r.score >= threshold).collect(),
            None => results,
        };

        debug!(collection, top_k, result_count = filtered.len(), "query completed");
        Ok(filtered)
    }

    /// Summarize the contents of a collection.
    pub async fn stats(&self, collection: &str) -> Result<IndexStats> {
        let info = self.vector_store.collection_info(collection).await?;
        let (chunk_count, document_ids) = match info {
            Some(_) => (
                self.vector_store.count(collection).await?,
                self.vector_store.document_ids(collection).await?,
            ),
            None => (0, Vec::new()),
        };
        Ok(IndexStats {
            collection: collection.to_string(),
            embedding_model: info.as_ref().map(|i| i.embedding_model.clone()),
            dimensions: info.map(|i| i.dimensions),
            chunk_count,
            document_ids,
        })
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `embedding_provider` and `vector_store` are required. Without an explicit
/// chunker, a [`FixedSizeChunker`] is built from the config's chunk size and
/// overlap.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration. Defaults to [`RagConfig::default`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`RagPipeline`], validating the config and required fields.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the config is invalid or a required
    /// field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?),
        };

        Ok(RagPipeline { config, embedding_provider, vector_store, chunker })
    }
}
