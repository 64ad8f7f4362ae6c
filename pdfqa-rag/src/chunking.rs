//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`FixedSizeChunker`], which
//! splits text into overlapping windows of a fixed number of characters.

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    /// Each returned chunk has an empty embedding vector.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text into fixed-size windows by character count with a fixed overlap.
///
/// Window `i` starts at character `i * (chunk_size - chunk_overlap)`. The final
/// window ends at the end of the text, and every pair of consecutive windows
/// shares exactly `chunk_overlap` characters. Offsets count Unicode scalar
/// values, so multi-byte text is never split inside a character.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`. Each chunk inherits
/// the parent document's metadata plus `chunk_index`, `source` and, when the
/// document has page boundaries, `page`.
///
/// # Example
///
/// ```rust,ignore
/// use pdfqa_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(500, 100)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Distance between the starts of consecutive chunks.
    pub fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }

    /// Compute the `[start, end)` character windows for a text of `len` characters.
    pub fn windows(&self, len: usize) -> Vec<(usize, usize)> {
        let mut windows = Vec::new();
        let mut start = 0;
        while start < len {
            let end = (start + self.chunk_size).min(len);
            windows.push((start, end));
            if end == len {
                break;
            }
            start += self.step();
        }
        windows
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() {
            return Vec::new();
        }

        let text = &document.text;
        // Byte offset of every char boundary, including the end of the text.
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        let char_len = boundaries.len() - 1;

        self.windows(char_len)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (start, end))| {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".to_string(), chunk_index.to_string());
                metadata.insert("source".to_string(), document.source.clone());
                if let Some(page) = document.page_at(start) {
                    metadata.insert("page".to_string(), page.to_string());
                }

                Chunk {
                    id: format!("{}_{chunk_index}", document.id),
                    document_id: document.id.clone(),
                    index: chunk_index,
                    start,
                    end,
                    text: text[boundaries[start]..boundaries[end]].to_string(),
                    embedding: Vec::new(),
                    metadata,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PageSpan;

    fn doc(text: &str) -> Document {
        Document::new("doc", "doc.pdf", text)
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(matches!(FixedSizeChunker::new(100, 100), Err(RagError::Config(_))));
        assert!(matches!(FixedSizeChunker::new(100, 150), Err(RagError::Config(_))));
        assert!(matches!(FixedSizeChunker::new(0, 0), Err(RagError::Config(_))));
        assert!(FixedSizeChunker::new(100, 0).is_ok());
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = FixedSizeChunker::new(10, 2).unwrap();
        assert!(chunker.chunk(&doc("")).is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = FixedSizeChunker::new(500, 100).unwrap();
        let chunks = chunker.chunk(&doc("hello world"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello world");
        assert_eq!((chunks[0].start, chunks[0].end), (0, 11));
        assert_eq!(chunks[0].id, "doc_0");
    }

    #[test]
    fn no_trailing_chunk_contained_in_previous() {
        // 900 chars: windows 0..500 and 400..900; 800..900 would be redundant.
        let chunker = FixedSizeChunker::new(500, 100).unwrap();
        assert_eq!(chunker.windows(900), vec![(0, 500), (400, 900)]);
        assert_eq!(chunker.windows(1000), vec![(0, 500), (400, 900), (800, 1000)]);
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let text = "ação é ótima ".repeat(20);
        let chunker = FixedSizeChunker::new(17, 5).unwrap();
        let chunks = chunker.chunk(&doc(&text));
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].text.chars().collect();
            let next: Vec<char> = pair[1].text.chars().collect();
            assert_eq!(&prev[prev.len() - 5..], &next[..5]);
        }
        let rebuilt: String = chunks
            .iter()
            .enumerate()
            .flat_map(|(i, c)| c.text.chars().skip(if i == 0 { 0 } else { 5 }))
            .collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn chunks_carry_page_and_source_metadata() {
        let mut document = doc(&"a".repeat(40));
        document.pages =
            vec![PageSpan { number: 1, start: 0 }, PageSpan { number: 2, start: 25 }];
        let chunks = FixedSizeChunker::new(20, 5).unwrap().chunk(&document);
        assert_eq!(chunks[0].page(), Some(1));
        assert_eq!(chunks[1].start, 15);
        assert_eq!(chunks[1].page(), Some(1));
        assert_eq!(chunks[2].start, 30);
        assert_eq!(chunks[2].page(), Some(2));
        assert!(chunks.iter().all(|c| c.source() == Some("doc.pdf")));
    }

    #[test]
    fn three_page_document_chunks_start_400_apart() {
        let page = "lorem ipsum dolor sit amet consectetur ".repeat(30);
        let text = format!("{page} {page} {page}");
        let mut document = doc(&text);
        let page_len = page.chars().count() + 1;
        document.pages = (0..3).map(|i| PageSpan { number: i + 1, start: i * page_len }).collect();

        let chunks = FixedSizeChunker::new(500, 100).unwrap().chunk(&document);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].start - pair[0].start, 400);
        }
        assert_eq!(chunks.first().map(|c| c.start), Some(0));
        assert_eq!(chunks.last().map(|c| c.end), Some(document.char_len()));
    }
}
