//! A bounded cache of answers keyed by question and conversation history.

use std::collections::{HashMap, VecDeque};

use crate::generator::Answer;
use crate::prompt::Exchange;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    question: String,
    history: Vec<Exchange>,
}

impl CacheKey {
    fn new(question: &str, history: &[Exchange]) -> Self {
        Self { question: question.trim().to_string(), history: history.to_vec() }
    }
}

/// Answers for repeated questions asked with the same history.
///
/// Evicts the oldest entry once `capacity` is reached. A capacity of zero
/// disables caching.
#[derive(Debug, Default)]
pub struct ResponseCache {
    capacity: usize,
    entries: HashMap<CacheKey, Answer>,
    order: VecDeque<CacheKey>,
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: HashMap::new(), order: VecDeque::new() }
    }

    pub fn get(&self, question: &str, history: &[Exchange]) -> Option<Answer> {
        self.entries.get(&CacheKey::new(question, history)).cloned()
    }

    pub fn insert(&mut self, question: &str, history: &[Exchange], answer: Answer) {
        if self.capacity == 0 {
            return;
        }
        let key = CacheKey::new(question, history);
        if self.entries.insert(key.clone(), answer).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(text: &str) -> Answer {
        Answer { text: text.to_string(), sources: Vec::new(), model: "mock".to_string() }
    }

    #[test]
    fn hit_requires_same_history() {
        let mut cache = ResponseCache::new(4);
        let history = vec![Exchange::new("q0", "a0")];
        cache.insert("What is Rust?", &history, answer("a language"));

        assert_eq!(cache.get(" What is Rust? ", &history).unwrap().text, "a language");
        assert!(cache.get("What is Rust?", &[]).is_none());
    }

    #[test]
    fn evicts_oldest_entry() {
        let mut cache = ResponseCache::new(2);
        cache.insert("one", &[], answer("1"));
        cache.insert("two", &[], answer("2"));
        cache.insert("three", &[], answer("3"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("one", &[]).is_none());
        assert!(cache.get("three", &[]).is_some());
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let mut cache = ResponseCache::new(0);
        cache.insert("one", &[], answer("1"));
        assert!(cache.is_empty());
    }
}
