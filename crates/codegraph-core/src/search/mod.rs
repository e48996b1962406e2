//! Semantic search over stored graphs.
//!
//! Nodes with docstring data and all edges are embedded when a graph is
//! stored; queries are embedded the same way and ranked by cosine
//! similarity. [`SearchExplainer`] turns the hits into prose.

mod embedder;
mod explain;
mod text;

pub use embedder::{EmbedError, Embedder, FastEmbedder};
pub use explain::SearchExplainer;
pub use text::{edge_text, node_text, preprocess_text};

use serde::Serialize;

use crate::docstrings::DocstringSections;

/// What a hit points at.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HitItem {
    Node {
        name: String,
        node_type: String,
        docstring: Option<DocstringSections>,
    },
    Edge {
        source: String,
        target: String,
        relation: String,
    },
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub graph_id: String,
    /// Node or edge record id inside the stored graph.
    pub item_id: String,
    /// Cosine similarity, higher is closer.
    pub score: f64,
    #[serde(flatten)]
    pub item: HitItem,
}

impl SearchHit {
    /// Short label for listings: the node name or `source -> target`.
    pub fn label(&self) -> String {
        match &self.item {
            HitItem::Node { name, .. } => name.clone(),
            HitItem::Edge { source, target, .. } => format!("{} -> {}", source, target),
        }
    }
}
