//! # pdfqa-rag
//!
//! Document ingestion and retrieval for pdfqa.
//!
//! ## Overview
//!
//! - [`DocumentLoader`] extracts text from a directory of PDFs.
//! - [`FixedSizeChunker`] splits text into overlapping character windows.
//! - [`EmbeddingProvider`] turns text into vectors; [`OllamaEmbeddingProvider`]
//!   talks to a local Ollama server.
//! - [`VectorStore`] stores and searches vectors; [`InMemoryVectorStore`] keeps
//!   them in memory and persists JSON snapshots.
//! - [`RagPipeline`] ties these together for ingestion and top-k retrieval.

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod inmemory;
pub mod loader;
pub mod ollama;
pub mod pipeline;
pub mod retry;
pub mod vectorstore;

pub use chunking::{Chunker, FixedSizeChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, PageSpan, SearchResult, SourceRef};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use inmemory::InMemoryVectorStore;
pub use loader::{DocumentLoader, LoadFailure, LoadReport, PdfExtractor, TextExtractor};
pub use ollama::{OllamaEmbeddingConfig, OllamaEmbeddingProvider};
pub use pipeline::{DocumentOutcome, IndexStats, IngestReport, RagPipeline, RagPipelineBuilder};
pub use retry::RetryPolicy;
pub use vectorstore::{CollectionInfo, VectorStore};
