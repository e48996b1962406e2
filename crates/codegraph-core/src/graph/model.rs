//! In-memory code graph on top of petgraph.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

/// What a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Function,
    Unknown,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Function => "function",
            Self::Unknown => "unknown",
        }
    }

    /// Hex color used by every renderer.
    pub fn color(&self) -> &'static str {
        match self {
            Self::File => "#4287f5",
            Self::Function => "#f5a742",
            Self::Unknown => "#aaaaaa",
        }
    }

    /// Relative node size used by every renderer.
    pub fn size(&self) -> u32 {
        match self {
            Self::File => 30,
            Self::Function => 25,
            Self::Unknown => 20,
        }
    }
}

impl From<&str> for NodeKind {
    fn from(s: &str) -> Self {
        match s {
            "file" => Self::File,
            "function" => Self::Function,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed relation between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// file -> function
    Contains,
    /// file -> file
    Imports,
    /// function -> function
    Calls,
}

impl Relation {
    pub const ALL: [Relation; 3] = [Relation::Contains, Relation::Imports, Relation::Calls];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Imports => "imports",
            Self::Calls => "calls",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Contains => "#2ecc71",
            Self::Imports => "#e74c3c",
            Self::Calls => "#9b59b6",
        }
    }
}

impl FromStr for Relation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contains" => Ok(Self::Contains),
            "imports" => Ok(Self::Imports),
            "calls" => Ok(Self::Calls),
            other => Err(format!("unknown relation '{}'", other)),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file or function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeNode {
    pub name: String,
    pub kind: NodeKind,
    /// Free-form attributes; always contains `type`.
    pub attributes: BTreeMap<String, String>,
}

impl CodeNode {
    fn new(name: &str, kind: NodeKind) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert("type".to_string(), kind.as_str().to_string());
        Self {
            name: name.to_string(),
            kind,
            attributes,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// A relation with its attributes; always contains `relation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeEdge {
    pub relation: Relation,
    pub attributes: BTreeMap<String, String>,
}

impl CodeEdge {
    fn new(relation: Relation) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert("relation".to_string(), relation.as_str().to_string());
        Self { relation, attributes }
    }
}

/// Borrowed view of one edge with its endpoints.
#[derive(Debug, Clone, Copy)]
pub struct EdgeView<'a> {
    pub source: &'a CodeNode,
    pub target: &'a CodeNode,
    pub edge: &'a CodeEdge,
}

/// Directed graph of files and functions keyed by node name.
///
/// At most one edge exists per ordered pair of nodes. Adding an existing node
/// or edge again updates it in place.
#[derive(Debug, Clone, Default)]
pub struct CodeGraph {
    graph: DiGraph<CodeNode, CodeEdge>,
    index: HashMap<String, NodeIndex>,
}

impl CodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node or update an existing one. The kind is overwritten and
    /// attributes are merged, later values winning.
    pub fn add_node(&mut self, name: &str, kind: NodeKind) -> NodeIndex {
        self.add_node_with(name, kind, std::iter::empty::<(String, String)>())
    }

    pub fn add_node_with<I, K, V>(&mut self, name: &str, kind: NodeKind, attributes: I) -> NodeIndex
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                let idx = self.graph.add_node(CodeNode::new(name, kind));
                self.index.insert(name.to_string(), idx);
                idx
            }
        };

        let node = &mut self.graph[idx];
        node.kind = kind;
        node.attributes.insert("type".to_string(), kind.as_str().to_string());
        for (k, v) in attributes {
            node.attributes.insert(k.into(), v.into());
        }
        idx
    }

    /// Add an edge, creating missing endpoints as `unknown` nodes.
    pub fn add_edge(&mut self, source: &str, target: &str, relation: Relation) {
        let a = self.intern(source);
        let b = self.intern(target);
        match self.graph.find_edge(a, b) {
            Some(e) => self.graph[e] = CodeEdge::new(relation),
            None => {
                self.graph.add_edge(a, b, CodeEdge::new(relation));
            }
        }
    }

    fn intern(&mut self, name: &str) -> NodeIndex {
        match self.index.get(name) {
            Some(&idx) => idx,
            None => self.add_node(name, NodeKind::Unknown),
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node(&self, name: &str) -> Option<&CodeNode> {
        self.index.get(name).map(|&idx| &self.graph[idx])
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &CodeNode> {
        self.graph.node_weights()
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeView<'_>> {
        self.graph.edge_references().map(move |e| EdgeView {
            source: &self.graph[e.source()],
            target: &self.graph[e.target()],
            edge: e.weight(),
        })
    }

    pub fn edge(&self, source: &str, target: &str) -> Option<&CodeEdge> {
        let a = *self.index.get(source)?;
        let b = *self.index.get(target)?;
        self.graph.find_edge(a, b).map(|e| &self.graph[e])
    }

    pub fn count_kind(&self, kind: NodeKind) -> usize {
        self.nodes().filter(|n| n.kind == kind).count()
    }

    pub fn count_relation(&self, relation: Relation) -> usize {
        self.graph
            .edge_weights()
            .filter(|e| e.relation == relation)
            .count()
    }

    /// Names of nodes this node points to.
    pub fn successors(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Names of nodes pointing to this node.
    pub fn predecessors(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Incoming)
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<&str> {
        let Some(&idx) = self.index.get(name) else {
            return Vec::new();
        };
        let mut names: Vec<&str> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Copy keeping only edges with one of the given relations. All nodes are
    /// kept; combine with [`CodeGraph::without_isolates`] for display.
    pub fn filter_relations(&self, relations: &[Relation]) -> CodeGraph {
        let mut out = CodeGraph::new();
        for node in self.nodes() {
            out.add_node_with(&node.name, node.kind, node.attributes.clone());
        }
        for view in self.edges() {
            if relations.contains(&view.edge.relation) {
                out.add_edge(&view.source.name, &view.target.name, view.edge.relation);
            }
        }
        out
    }

    /// Copy without nodes that have no incident edge.
    pub fn without_isolates(&self) -> CodeGraph {
        let mut out = CodeGraph::new();
        for idx in self.graph.node_indices() {
            let connected = self.graph.neighbors_undirected(idx).next().is_some();
            if connected {
                let node = &self.graph[idx];
                out.add_node_with(&node.name, node.kind, node.attributes.clone());
            }
        }
        for view in self.edges() {
            out.add_edge(&view.source.name, &view.target.name, view.edge.relation);
        }
        out
    }

    /// The graph that renderers show: filtered by relation, isolates dropped.
    pub fn display_graph(&self, relations: Option<&[Relation]>) -> CodeGraph {
        match relations {
            Some(r) if !r.is_empty() => self.filter_relations(r).without_isolates(),
            _ => self.without_isolates(),
        }
    }

    /// Underlying petgraph graph, for layout algorithms.
    pub fn inner(&self) -> &DiGraph<CodeNode, CodeEdge> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CodeGraph {
        let mut g = CodeGraph::new();
        g.add_node("main.py", NodeKind::File);
        g.add_node("utils.py", NodeKind::File);
        g.add_node("run", NodeKind::Function);
        g.add_node("helper", NodeKind::Function);
        g.add_node("lonely", NodeKind::Function);
        g.add_edge("main.py", "run", Relation::Contains);
        g.add_edge("main.py", "utils.py", Relation::Imports);
        g.add_edge("run", "helper", Relation::Calls);
        g
    }

    #[test]
    fn test_counts() {
        let g = sample();
        assert_eq!(g.node_count(), 5);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.count_kind(NodeKind::File), 2);
        assert_eq!(g.count_kind(NodeKind::Function), 3);
        assert_eq!(g.count_relation(Relation::Calls), 1);
    }

    #[test]
    fn test_re_adding_merges() {
        let mut g = sample();
        g.add_node_with("run", NodeKind::Function, [("line", "3")]);
        g.add_edge("main.py", "run", Relation::Contains);
        assert_eq!(g.node_count(), 5);
        assert_eq!(g.edge_count(), 3);
        let run = g.node("run").unwrap();
        assert_eq!(run.attr("line"), Some("3"));
        assert_eq!(run.attr("type"), Some("function"));
    }

    #[test]
    fn test_missing_endpoint_is_unknown() {
        let mut g = CodeGraph::new();
        g.add_edge("a", "b", Relation::Calls);
        assert_eq!(g.node("b").unwrap().kind, NodeKind::Unknown);
        assert_eq!(g.edge("a", "b").unwrap().attributes["relation"], "calls");
    }

    #[test]
    fn test_display_graph_filters_and_drops_isolates() {
        let g = sample();
        let all = g.display_graph(None);
        assert!(!all.contains_node("lonely"));
        assert_eq!(all.edge_count(), 3);

        let calls = g.display_graph(Some(&[Relation::Calls]));
        assert_eq!(calls.node_count(), 2);
        assert_eq!(calls.edge_count(), 1);
        assert!(calls.contains_node("run") && calls.contains_node("helper"));
    }

    #[test]
    fn test_neighbors() {
        let g = sample();
        assert_eq!(g.successors("main.py"), vec!["run", "utils.py"]);
        assert_eq!(g.predecessors("helper"), vec!["run"]);
        assert!(g.successors("missing").is_empty());
    }
}
