//! Conversion from [`CodeGraph`] to the Sigma.js/Graphology payload.

use codegraph_core::graph::layout;
use codegraph_core::{CodeGraph, Layout};

use super::models::{
    EdgeAttributes, GraphData, GraphEdge, GraphNode, Neighbour, NodeAttributes, NodeDetails,
    SearchResult,
};

/// Sigma renders on a larger canvas than the unit square.
const CANVAS_SCALE: f64 = 100.0;

/// Nodes with their layout positions and edges keyed by their endpoints.
pub fn graph_data(graph: &CodeGraph, layout_kind: Layout) -> GraphData {
    let positions = layout::compute(graph, layout_kind);

    let nodes = graph
        .nodes()
        .map(|node| {
            let point = positions.get(&node.name).copied().unwrap_or_default();
            GraphNode {
                key: node.name.clone(),
                attributes: NodeAttributes {
                    label: node.name.clone(),
                    category: node.kind.as_str().to_string(),
                    color: node.kind.color().to_string(),
                    size: node.kind.size() / 3,
                    x: point.x * CANVAS_SCALE,
                    // Screen y grows downwards; Sigma's grows upwards.
                    y: (1.0 - point.y) * CANVAS_SCALE,
                },
            }
        })
        .collect();

    let edges = graph
        .edges()
        .map(|view| GraphEdge {
            key: format!("{}->{}", view.source.name, view.target.name),
            source: view.source.name.clone(),
            target: view.target.name.clone(),
            attributes: EdgeAttributes {
                relationship: view.edge.relation.as_str().to_string(),
                color: view.edge.relation.color().to_string(),
            },
        })
        .collect();

    GraphData {
        layout: layout_kind.to_string(),
        nodes,
        edges,
    }
}

/// Attributes and neighbours of one node.
pub fn node_details(graph: &CodeGraph, name: &str) -> Option<NodeDetails> {
    let node = graph.node(name)?;

    let neighbour = |source: &str, target: &str, other: &str| Neighbour {
        name: other.to_string(),
        relation: graph
            .edge(source, target)
            .map(|e| e.relation.as_str().to_string())
            .unwrap_or_default(),
    };

    Some(NodeDetails {
        name: node.name.clone(),
        node_type: node.kind.as_str().to_string(),
        attributes: node.attributes.clone(),
        outgoing: graph
            .successors(name)
            .into_iter()
            .map(|t| neighbour(name, t, t))
            .collect(),
        incoming: graph
            .predecessors(name)
            .into_iter()
            .map(|s| neighbour(s, name, s))
            .collect(),
    })
}

/// Case-insensitive name match. Exact matches first, then prefixes, then
/// substrings, each group alphabetical.
pub fn search_nodes(graph: &CodeGraph, query: &str, limit: usize) -> Vec<SearchResult> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut results: Vec<SearchResult> = graph
        .nodes()
        .filter_map(|node| {
            let name = node.name.to_lowercase();
            let score = if name == needle {
                2
            } else if name.starts_with(&needle) {
                1
            } else if name.contains(&needle) {
                0
            } else {
                return None;
            };
            Some(SearchResult {
                key: node.name.clone(),
                node_type: node.kind.as_str().to_string(),
                score,
            })
        })
        .collect();

    results.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.key.cmp(&b.key)));
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{NodeKind, Relation};

    fn sample() -> CodeGraph {
        let mut g = CodeGraph::new();
        g.add_node("main.py", NodeKind::File);
        g.add_node("run", NodeKind::Function);
        g.add_node("run_all", NodeKind::Function);
        g.add_node("prerun", NodeKind::Function);
        g.add_edge("main.py", "run", Relation::Contains);
        g.add_edge("run", "run_all", Relation::Calls);
        g.add_edge("prerun", "run", Relation::Calls);
        g
    }

    #[test]
    fn test_graph_data_carries_styles() {
        let data = graph_data(&sample(), Layout::Circular);
        assert_eq!(data.nodes.len(), 4);
        assert_eq!(data.edges.len(), 3);
        assert_eq!(data.layout, "circular");

        let file = data.nodes.iter().find(|n| n.key == "main.py").unwrap();
        assert_eq!(file.attributes.color, "#4287f5");
        assert_eq!(file.attributes.category, "file");
        assert!((0.0..=CANVAS_SCALE).contains(&file.attributes.x));

        let contains = data.edges.iter().find(|e| e.source == "main.py").unwrap();
        assert_eq!(contains.attributes.relationship, "contains");
        assert_eq!(contains.attributes.color, "#2ecc71");
    }

    #[test]
    fn test_node_details() {
        let g = sample();
        let details = node_details(&g, "run").unwrap();
        assert_eq!(details.node_type, "function");
        assert_eq!(details.outgoing.len(), 1);
        assert_eq!(details.outgoing[0].name, "run_all");
        assert_eq!(details.outgoing[0].relation, "calls");
        let incoming: Vec<_> = details.incoming.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(incoming, vec!["main.py", "prerun"]);

        assert!(node_details(&g, "missing").is_none());
    }

    #[test]
    fn test_search_nodes_ranking() {
        let g = sample();
        let keys: Vec<_> = search_nodes(&g, "RUN", 10).into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["run", "run_all", "prerun"]);
        assert_eq!(search_nodes(&g, "run", 1).len(), 1);
        assert!(search_nodes(&g, "  ", 10).is_empty());
    }
}
