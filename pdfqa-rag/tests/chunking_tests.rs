//! Property tests for fixed-size chunking coverage and overlap.

use pdfqa_rag::chunking::{Chunker, FixedSizeChunker};
use pdfqa_rag::document::Document;
use proptest::prelude::*;

fn arb_size_and_overlap() -> impl Strategy<Value = (usize, usize)> {
    (1usize..64).prop_flat_map(|size| (Just(size), 0..size))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Chunks cover the whole text without gaps and consecutive chunks share
    /// exactly `overlap` characters.
    #[test]
    fn chunks_cover_text_with_exact_overlap(
        text in "[a-zA-Z0-9 çãéü\n]{0,400}",
        (size, overlap) in arb_size_and_overlap(),
    ) {
        let chunker = FixedSizeChunker::new(size, overlap).unwrap();
        let document = Document::new("doc", "doc.pdf", text.clone());
        let chunks = chunker.chunk(&document);
        let chars: Vec<char> = text.chars().collect();

        if chars.is_empty() {
            prop_assert!(chunks.is_empty());
            return Ok(());
        }

        prop_assert_eq!(chunks[0].start, 0);
        prop_assert_eq!(chunks.last().unwrap().end, chars.len());

        for (i, chunk) in chunks.iter().enumerate() {
            prop_assert_eq!(chunk.index, i);
            prop_assert!(chunk.end - chunk.start <= size);
            let expected: String = chars[chunk.start..chunk.end].iter().collect();
            prop_assert_eq!(&chunk.text, &expected);
        }

        for pair in chunks.windows(2) {
            // No gap, and exactly `overlap` shared characters.
            prop_assert_eq!(pair[0].end - pair[1].start, overlap);
            prop_assert_eq!(pair[1].start - pair[0].start, size - overlap);
        }
    }

    /// Chunking is a pure function of text and configuration.
    #[test]
    fn chunking_is_deterministic(
        text in "[a-z ]{0,300}",
        (size, overlap) in arb_size_and_overlap(),
    ) {
        let chunker = FixedSizeChunker::new(size, overlap).unwrap();
        let document = Document::new("doc", "doc.pdf", text);
        prop_assert_eq!(chunker.chunk(&document), chunker.chunk(&document));
    }
}
