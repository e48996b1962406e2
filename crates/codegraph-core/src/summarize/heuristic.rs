use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::{DEFAULT_FALLBACK_MAX_CHARS, DEFAULT_SUMMARY_MAX_WORDS};
use crate::docstrings::DocstringSections;

use super::{SummaryError, SummaryGenerator, SummaryRequest};

const EMPTY_SUMMARY: &str = "No summary available.";

/// Offline summaries: the first sentence of the docstring's summary section.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicSummarizer {
    max_words: usize,
    max_chars: usize,
}

impl Default for HeuristicSummarizer {
    fn default() -> Self {
        Self::new(DEFAULT_SUMMARY_MAX_WORDS)
    }
}

impl HeuristicSummarizer {
    pub fn new(max_words: usize) -> Self {
        Self {
            max_words,
            max_chars: DEFAULT_FALLBACK_MAX_CHARS,
        }
    }

    /// Summarize one docstring.
    pub fn summarize(&self, text: &str) -> String {
        let sections = DocstringSections::parse(text);
        let source = if sections.summary.is_empty() {
            text.trim()
        } else {
            sections.summary.as_str()
        };

        let flat = source.split_whitespace().collect::<Vec<_>>().join(" ");
        let sentence = match flat.find(". ") {
            Some(end) => &flat[..end],
            None => flat.trim_end_matches('.'),
        };

        let words: Vec<&str> = sentence.split_whitespace().collect();
        if words.is_empty() {
            return EMPTY_SUMMARY.to_string();
        }

        let mut summary = words[..words.len().min(self.max_words)].join(" ");
        if summary.chars().count() > self.max_chars {
            summary = summary.chars().take(self.max_chars.saturating_sub(3)).collect();
            summary.push_str("...");
        }
        summary
    }
}

#[async_trait]
impl SummaryGenerator for HeuristicSummarizer {
    async fn summarize_batch(
        &self,
        requests: Vec<SummaryRequest>,
    ) -> Result<HashMap<String, String>, SummaryError> {
        Ok(requests
            .into_iter()
            .map(|r| {
                let summary = self.summarize(&r.text);
                (r.key, summary)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sentence() {
        let s = HeuristicSummarizer::default();
        assert_eq!(
            s.summarize("Create a user. Stores it in the db.\n\nArgs:\n    name: the name"),
            "Create a user"
        );
    }

    #[test]
    fn test_respects_max_words() {
        let s = HeuristicSummarizer::new(3);
        assert_eq!(s.summarize("one two three four five"), "one two three");
    }

    #[test]
    fn test_char_cap() {
        let s = HeuristicSummarizer::new(100);
        let long = "word ".repeat(60);
        let out = s.summarize(&long);
        assert_eq!(out.chars().count(), DEFAULT_FALLBACK_MAX_CHARS);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_empty() {
        assert_eq!(HeuristicSummarizer::default().summarize("  \n "), EMPTY_SUMMARY);
    }

    #[tokio::test]
    async fn test_batch_keyed() {
        let s = HeuristicSummarizer::default();
        let out = s
            .summarize_batch(vec![
                SummaryRequest::new("b", "Second thing."),
                SummaryRequest::new("a", "First thing."),
            ])
            .await
            .unwrap();
        assert_eq!(out["a"], "First thing");
        assert_eq!(out["b"], "Second thing");
    }
}
