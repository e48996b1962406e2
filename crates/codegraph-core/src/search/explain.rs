use crate::config::DEFAULT_EXPLAIN_SYSTEM_PROMPT;
use crate::llm::{complete_with_retry, RetryPolicy, LLM};

use super::{HitItem, SearchHit};

/// Explains search hits with an LLM, or lists them when none is available.
pub struct SearchExplainer {
    llm: Option<Box<dyn LLM>>,
    policy: RetryPolicy,
}

impl SearchExplainer {
    pub fn new(llm: Box<dyn LLM>, policy: RetryPolicy) -> Self {
        Self {
            llm: Some(llm),
            policy,
        }
    }

    /// An explainer that always uses the plain listing.
    pub fn offline() -> Self {
        Self {
            llm: None,
            policy: RetryPolicy::none(),
        }
    }

    /// Explain `hits` for `query`. Never fails: LLM errors fall back to
    /// [`SearchExplainer::fallback`].
    pub async fn explain(&self, query: &str, hits: &[SearchHit]) -> String {
        let Some(llm) = &self.llm else {
            return Self::fallback(query, hits);
        };

        let mut sorted: Vec<&SearchHit> = hits.iter().collect();
        sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

        let prompt = format!(
            "I searched for: \"{}\"\n\n\
             Here are the search results in order of relevance (highest similarity score first):\n\n{}\n\
             Please explain these results as one cohesive narrative, starting with the most relevant result.",
            query,
            format_hits(&sorted)
        );

        match complete_with_retry(llm.as_ref(), DEFAULT_EXPLAIN_SYSTEM_PROMPT, &prompt, &self.policy).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => Self::fallback(query, hits),
            Err(e) => {
                tracing::warn!(error = %e, "Explanation request failed. Using fallback explanation.");
                Self::fallback(query, hits)
            }
        }
    }

    /// Deterministic listing of the hits.
    pub fn fallback(query: &str, hits: &[SearchHit]) -> String {
        let mut out = format!("Search results for: {}\n\n", query);
        for (i, hit) in hits.iter().enumerate() {
            out.push_str(&format!("Result {} (Relevance Score: {:.4}):\n", i + 1, hit.score));
            match &hit.item {
                HitItem::Node {
                    name,
                    node_type,
                    docstring,
                } => {
                    out.push_str(&format!("- Found a {} named '{}'\n", node_type, name));
                    if let Some(doc) = docstring {
                        out.push_str(&format!("  Summary: {}\n", doc.summary));
                    }
                }
                HitItem::Edge {
                    source,
                    target,
                    relation,
                } => {
                    out.push_str(&format!(
                        "- Found a relationship: {} -> {} ({})\n",
                        source, target, relation
                    ));
                }
            }
        }
        out
    }
}

fn format_hits(hits: &[&SearchHit]) -> String {
    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        out.push_str(&format!("Result {} (Relevance Score: {:.4}):\n", i + 1, hit.score));
        match &hit.item {
            HitItem::Node {
                name,
                node_type,
                docstring,
            } => {
                out.push_str(&format!("Type: Node\nName: {}\nNode Type: {}\n", name, node_type));
                if let Some(doc) = docstring {
                    out.push_str(&format!("Summary: {}\n", doc.summary));
                    if !doc.parameters.is_empty() {
                        out.push_str("Parameters:\n");
                        for (param, desc) in &doc.parameters {
                            out.push_str(&format!("  - {}: {}\n", param, desc));
                        }
                    }
                    for (label, value) in [
                        ("Returns", &doc.returns),
                        ("Raises", &doc.raises),
                        ("Note", &doc.note),
                        ("Example", &doc.example),
                    ] {
                        if !value.is_empty() {
                            out.push_str(&format!("{}: {}\n", label, value));
                        }
                    }
                }
            }
            HitItem::Edge {
                source,
                target,
                relation,
            } => {
                out.push_str(&format!(
                    "Type: Edge\nSource: {}\nTarget: {}\nRelation: {}\n",
                    source, target, relation
                ));
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docstrings::DocstringSections;
    use crate::llm::LLMError;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    fn hits() -> Vec<SearchHit> {
        vec![
            SearchHit {
                graph_id: "g".to_string(),
                item_id: "n1".to_string(),
                score: 0.5,
                item: HitItem::Edge {
                    source: "api.py".to_string(),
                    target: "create_user".to_string(),
                    relation: "contains".to_string(),
                },
            },
            SearchHit {
                graph_id: "g".to_string(),
                item_id: "n2".to_string(),
                score: 0.91234,
                item: HitItem::Node {
                    name: "create_user".to_string(),
                    node_type: "function".to_string(),
                    docstring: Some(DocstringSections {
                        summary: "Create a user.".to_string(),
                        ..Default::default()
                    }),
                },
            },
        ]
    }

    struct Recorder {
        prompt: Arc<Mutex<String>>,
        reply: Result<String, ()>,
    }

    #[async_trait]
    impl LLM for Recorder {
        async fn complete(&self, prompt: &str) -> Result<String, LLMError> {
            self.complete_with_system("", prompt).await
        }

        async fn complete_with_system(&self, _system: &str, prompt: &str) -> Result<String, LLMError> {
            *self.prompt.lock().unwrap() = prompt.to_string();
            self.reply.clone().map_err(|_| LLMError::Network("down".to_string()))
        }
    }

    #[test]
    fn test_fallback_listing() {
        let text = SearchExplainer::fallback("users", &hits());
        assert!(text.starts_with("Search results for: users\n\n"));
        assert!(text.contains("Result 1 (Relevance Score: 0.5000):\n- Found a relationship: api.py -> create_user (contains)"));
        assert!(text.contains("Result 2 (Relevance Score: 0.9123):\n- Found a function named 'create_user'\n  Summary: Create a user."));
    }

    #[tokio::test]
    async fn test_llm_sees_hits_best_first() {
        let prompt = Arc::new(Mutex::new(String::new()));
        let recorder = Recorder {
            prompt: Arc::clone(&prompt),
            reply: Ok("They create users.".to_string()),
        };
        let explainer = SearchExplainer::new(Box::new(recorder), RetryPolicy::none());
        let text = explainer.explain("users", &hits()).await;
        assert_eq!(text, "They create users.");

        let sent = prompt.lock().unwrap().clone();
        assert!(sent.starts_with("I searched for: \"users\""));
        assert!(sent.contains("Result 1 (Relevance Score: 0.9123):\nType: Node\nName: create_user"));
    }

    #[tokio::test]
    async fn test_llm_failure_falls_back() {
        let recorder = Recorder {
            prompt: Arc::new(Mutex::new(String::new())),
            reply: Err(()),
        };
        let explainer = SearchExplainer::new(Box::new(recorder), RetryPolicy::none());
        let text = explainer.explain("users", &hits()).await;
        assert!(text.starts_with("Search results for: users"));
    }
}
