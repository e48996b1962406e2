//! Shapes persisted in the document store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::docstrings::DocstringSections;

/// Hex characters kept from a content hash.
const ID_LEN: usize = 16;

/// Stable id derived from the given parts.
pub fn content_id(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0x1f]);
        }
        hasher.update(part.as_bytes());
    }
    let mut id = hex::encode(hasher.finalize());
    id.truncate(ID_LEN);
    id
}

/// Record id of a node inside one stored graph.
pub fn node_record_id(graph_id: &str, kind: &str, name: &str) -> String {
    format!("{}-{}", graph_id, content_id(&[kind, name]))
}

/// Record id of an edge, from its endpoint record ids.
pub fn edge_record_id(source_id: &str, relation: &str, target_id: &str) -> String {
    content_id(&[source_id, relation, target_id])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Generated summary, empty when none was produced.
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<DocstringSections>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: String,
    /// Source node name.
    pub source: String,
    /// Target node name.
    pub target: String,
    pub relation: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// One stored graph document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredGraph {
    pub graph_id: String,
    pub project_name: String,
    pub node_count: usize,
    pub edge_count: usize,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl StoredGraph {
    pub fn node(&self, name: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// Listing entry for a stored graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub graph_id: String,
    pub project_name: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_stable_and_scoped() {
        let a = node_record_id("g1", "function", "run");
        assert_eq!(a, node_record_id("g1", "function", "run"));
        assert_ne!(a, node_record_id("g2", "function", "run"));
        assert_ne!(a, node_record_id("g1", "file", "run"));
        assert_eq!(a.len(), "g1-".len() + ID_LEN);
    }

    #[test]
    fn test_parts_are_separated() {
        assert_ne!(content_id(&["ab", "c"]), content_id(&["a", "bc"]));
    }

    #[test]
    fn test_edge_id_depends_on_relation() {
        assert_ne!(edge_record_id("a", "calls", "b"), edge_record_id("a", "imports", "b"));
        assert_ne!(edge_record_id("a", "calls", "b"), edge_record_id("b", "calls", "a"));
    }
}
