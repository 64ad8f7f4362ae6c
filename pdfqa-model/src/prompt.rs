//! Prompt assembly for grounded question answering.

use std::fmt::Write as _;

use pdfqa_rag::SearchResult;
use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;

const ROLE_INSTRUCTIONS: &str = "You are an assistant that answers questions using the documents provided. \
Your goal is to give accurate, clear and well-grounded answers.";

const ANSWER_INSTRUCTIONS: &str = "Instructions:
1. Answer directly and objectively.
2. Cite the relevant sources by their [number].
3. If you are uncertain, say how confident you are.
4. Stay focused on the document context provided.
5. Use examples when appropriate.";

const NO_CONTEXT: &str = "No relevant document context was found for this question. \
Say so plainly, then answer from general knowledge if you can.";

/// A previous question and the answer it received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

impl Exchange {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self { question: question.into(), answer: answer.into() }
    }
}

/// Renders retrieved context, recent history and the question into chat
/// messages.
///
/// Only the last `history_window` exchanges are included, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBuilder {
    history_window: usize,
}

impl PromptBuilder {
    pub fn new(history_window: usize) -> Self {
        Self { history_window }
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// Build the system and user messages for one question.
    pub fn build(
        &self,
        question: &str,
        context: &[SearchResult],
        history: &[Exchange],
    ) -> Vec<ChatMessage> {
        let mut prompt = String::new();

        prompt.push_str("Document context:\n");
        if context.is_empty() {
            prompt.push_str(NO_CONTEXT);
            prompt.push('\n');
        } else {
            for (i, result) in context.iter().enumerate() {
                let _ = writeln!(prompt, "[{}] {}", i + 1, source_label(result));
                prompt.push_str(result.chunk.text.trim());
                prompt.push_str("\n\n");
            }
        }

        prompt.push_str("\nConversation so far:\n");
        let recent = self.recent(history);
        if recent.is_empty() {
            prompt.push_str("(none)\n");
        } else {
            for exchange in recent {
                let _ = writeln!(prompt, "User: {}", exchange.question);
                let _ = writeln!(prompt, "Assistant: {}", exchange.answer);
            }
        }

        let _ = write!(prompt, "\nCurrent question: {}\n\n{ANSWER_INSTRUCTIONS}\n\nAnswer:", question.trim());

        vec![ChatMessage::system(ROLE_INSTRUCTIONS), ChatMessage::user(prompt)]
    }

    fn recent<'a>(&self, history: &'a [Exchange]) -> &'a [Exchange] {
        let start = history.len().saturating_sub(self.history_window);
        &history[start..]
    }
}

fn source_label(result: &SearchResult) -> String {
    let chunk = &result.chunk;
    let source = chunk.source().unwrap_or(&chunk.document_id);
    match chunk.page() {
        Some(page) => format!("Source: {source}, page {page}"),
        None => format!("Source: {source}"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pdfqa_rag::Chunk;

    use super::*;
    use crate::chat::Role;

    fn result(text: &str, source: &str, page: Option<usize>) -> SearchResult {
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), source.to_string());
        if let Some(page) = page {
            metadata.insert("page".to_string(), page.to_string());
        }
        SearchResult {
            chunk: Chunk {
                id: "doc_0".to_string(),
                document_id: "doc".to_string(),
                index: 0,
                start: 0,
                end: text.chars().count(),
                text: text.to_string(),
                embedding: Vec::new(),
                metadata,
            },
            score: 0.9,
        }
    }

    #[test]
    fn numbers_context_blocks_with_sources() {
        let messages = PromptBuilder::new(5).build(
            "What is ownership?",
            &[result("Ownership rules.", "rust.pdf", Some(2)), result("Borrowing.", "book.pdf", None)],
            &[],
        );

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        let user = &messages[1].content;
        assert!(user.contains("[1] Source: rust.pdf, page 2\nOwnership rules."));
        assert!(user.contains("[2] Source: book.pdf\nBorrowing."));
        assert!(user.contains("Current question: What is ownership?"));
        assert!(user.ends_with("Answer:"));
    }

    #[test]
    fn history_is_bounded_to_the_window() {
        let history: Vec<Exchange> =
            (1..=4).map(|i| Exchange::new(format!("q{i}"), format!("a{i}"))).collect();
        let messages = PromptBuilder::new(2).build("next", &[], &history);
        let user = &messages[1].content;

        assert!(!user.contains("User: q2"));
        assert!(user.contains("User: q3\nAssistant: a3\nUser: q4\nAssistant: a4"));
    }

    #[test]
    fn missing_context_is_stated() {
        let messages = PromptBuilder::new(5).build("anything?", &[], &[]);
        assert!(messages[1].content.contains(NO_CONTEXT));
        assert!(messages[1].content.contains("(none)"));
    }
}
