//! Bounded rolling memory of completed exchanges.
//!
//! Maintains a sliding window of recent (prompt, reasoning, response)
//! triples used to enrich the reasoning prompt of future requests. The
//! store is owned by the orchestrator and survives only for the life of
//! the process.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// A completed exchange retained as short-term memory
#[derive(Debug, Clone)]
pub struct ContextEntry {
    /// When the exchange completed
    pub timestamp: DateTime<Utc>,
    /// The caller's original prompt
    pub prompt: String,
    /// Intermediate rationale from the reasoning stage
    pub reasoning: String,
    /// Final answer from the response stage
    pub response: String,
    /// Model id that produced the response
    pub model: String,
}

/// Fixed-capacity FIFO of recent exchanges.
///
/// When a new entry would exceed capacity, the oldest entry is evicted.
#[derive(Debug)]
pub struct ContextStore {
    max_entries: usize,
    entries: VecDeque<ContextEntry>,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ContextStore {
    /// Create a store with the given capacity
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            entries: VecDeque::with_capacity(max_entries),
        }
    }

    /// Append an exchange, evicting the oldest entry beyond capacity
    pub fn push(&mut self, entry: ContextEntry) {
        if self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Entries in insertion order
    pub fn entries(&self) -> impl Iterator<Item = &ContextEntry> {
        self.entries.iter()
    }

    /// Render the store as Question/Reasoning/Answer triples for prompts
    pub fn format_for_prompt(&self) -> String {
        self.entries
            .iter()
            .map(|entry| {
                format!(
                    "Question: {}\nReasoning: {}\nAnswer: {}",
                    entry.prompt, entry.reasoning, entry.response
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> ContextEntry {
        ContextEntry {
            timestamp: Utc::now(),
            prompt: format!("prompt {}", n),
            reasoning: format!("reasoning {}", n),
            response: format!("response {}", n),
            model: "test-model".to_string(),
        }
    }

    #[test]
    fn push_and_len() {
        let mut store = ContextStore::new(10);
        assert!(store.is_empty());

        store.push(entry(1));
        store.push(entry(2));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn fifo_eviction_beyond_capacity() {
        let mut store = ContextStore::new(10);
        for n in 0..13 {
            store.push(entry(n));
        }

        // First 3 evicted, remaining are exactly the last 10 in order
        assert_eq!(store.len(), 10);
        let prompts: Vec<&str> = store.entries().map(|e| e.prompt.as_str()).collect();
        assert_eq!(prompts[0], "prompt 3");
        assert_eq!(prompts[9], "prompt 12");
        for (i, p) in prompts.iter().enumerate() {
            assert_eq!(*p, format!("prompt {}", i + 3));
        }
    }

    #[test]
    fn clear_empties_store() {
        let mut store = ContextStore::new(5);
        store.push(entry(1));
        store.push(entry(2));
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.format_for_prompt(), "");
    }

    #[test]
    fn format_renders_triples_in_order() {
        let mut store = ContextStore::new(5);
        store.push(entry(1));
        store.push(entry(2));

        let formatted = store.format_for_prompt();
        assert!(formatted.starts_with("Question: prompt 1\nReasoning: reasoning 1\nAnswer: response 1"));
        assert!(formatted.contains("\n\nQuestion: prompt 2"));
    }
}
