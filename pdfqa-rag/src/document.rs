//! Data types for documents, chunks, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Start of a page within a [`Document`]'s cleaned text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageSpan {
    /// 1-based page number.
    pub number: usize,
    /// Character offset of the first character of the page.
    pub start: usize,
}

/// A source document containing extracted text and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document (the source file stem).
    pub id: String,
    /// File name the text was extracted from.
    pub source: String,
    /// The cleaned text content of the document.
    pub text: String,
    /// Page boundaries, empty when the text did not come from a paged source.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<PageSpan>,
    /// Key-value metadata associated with the document.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document without page information.
    pub fn new(id: impl Into<String>, source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            text: text.into(),
            pages: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Return the page number containing the given character offset.
    pub fn page_at(&self, offset: usize) -> Option<usize> {
        self.pages.iter().take_while(|page| page.start <= offset).last().map(|page| page.number)
    }

    /// Number of characters in the document text.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Number of whitespace-separated words in the document text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// A segment of a [`Document`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk, `{document_id}_{index}`.
    pub id: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// Position of the chunk within its document.
    pub index: usize,
    /// Character offset where the chunk starts (inclusive).
    pub start: usize,
    /// Character offset where the chunk ends (exclusive).
    pub end: usize,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text. Empty until embedded.
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// Key-value metadata inherited from the parent document plus chunk-specific fields.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    /// The file name of the parent document, if recorded.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").map(String::as_str)
    }

    /// The page the chunk starts on, if known.
    pub fn page(&self) -> Option<usize> {
        self.metadata.get("page").and_then(|p| p.parse().ok())
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

const EXCERPT_CHARS: usize = 200;

/// A compact citation of a retrieved chunk, kept with each answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    pub chunk_id: String,
    pub document_id: String,
    pub source: String,
    pub chunk_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    pub score: f32,
    pub excerpt: String,
}

impl From<&SearchResult> for SourceRef {
    fn from(result: &SearchResult) -> Self {
        let chunk = &result.chunk;
        let mut excerpt: String = chunk.text.chars().take(EXCERPT_CHARS).collect();
        if chunk.text.chars().count() > EXCERPT_CHARS {
            excerpt.push('…');
        }
        Self {
            chunk_id: chunk.id.clone(),
            document_id: chunk.document_id.clone(),
            source: chunk.source().unwrap_or(&chunk.document_id).to_string(),
            chunk_index: chunk.index,
            page: chunk.page(),
            score: result.score,
            excerpt,
        }
    }
}
