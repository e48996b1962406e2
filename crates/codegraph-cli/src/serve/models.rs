//! JSON shapes shared by the live server and the standalone HTML page.

use serde::{Deserialize, Serialize};

// =============================================================================
// Graph Data Models (for Sigma.js/Graphology)
// =============================================================================

/// Full graph payload for `/api/graph` and the embedded page data.
#[derive(Debug, Clone, Serialize)]
pub struct GraphData {
    /// Layout the positions were computed with.
    pub layout: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    /// Node name; unique within a graph.
    pub key: String,
    pub attributes: NodeAttributes,
}

/// Node attributes read by Sigma.js.
#[derive(Debug, Clone, Serialize)]
pub struct NodeAttributes {
    pub label: String,
    /// `file`, `function` or `unknown`. Named `category` so it does not
    /// clash with Sigma's render type.
    pub category: String,
    pub color: String,
    pub size: u32,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub key: String,
    pub source: String,
    pub target: String,
    pub attributes: EdgeAttributes,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeAttributes {
    /// `contains`, `imports` or `calls`.
    pub relationship: String,
    pub color: String,
}

// =============================================================================
// Node Details Model (for `/api/node/{name}`)
// =============================================================================

#[derive(Debug, Serialize)]
pub struct NodeDetails {
    pub name: String,
    pub node_type: String,
    pub attributes: std::collections::BTreeMap<String, String>,
    /// Outgoing neighbours with the relation of each edge.
    pub outgoing: Vec<Neighbour>,
    /// Incoming neighbours with the relation of each edge.
    pub incoming: Vec<Neighbour>,
}

#[derive(Debug, Serialize)]
pub struct Neighbour {
    pub name: String,
    pub relation: String,
}

// =============================================================================
// Version and Search Models
// =============================================================================

/// Bumped after every completed rebuild.
#[derive(Debug, Serialize)]
pub struct VersionInfo {
    pub version: u64,
    pub nodes: usize,
    pub edges: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

/// A node whose name matches the query.
#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub key: String,
    pub node_type: String,
    /// 2 for an exact match, 1 for a prefix, 0 for a substring.
    pub score: u8,
}
