//! Node placement for the static and interactive renderers.
//!
//! Every layout returns one position per node, normalized into the unit
//! square with the aspect ratio kept.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use petgraph::graph::NodeIndex;
use petgraph::visit::{depth_first_search, DfsEvent, EdgeRef};
use serde::Serialize;

use super::model::CodeGraph;

/// A position in the unit square.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Node name to position, in graph node order.
pub type Positions = IndexMap<String, Point>;

/// Available layout algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Layers by longest path from the sources, top to bottom.
    #[default]
    Hierarchical,
    Circular,
    /// Fruchterman-Reingold force simulation.
    Spring,
    /// Stress minimization over shortest-path distances.
    KamadaKawai,
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "hierarchical" => Ok(Self::Hierarchical),
            "circular" => Ok(Self::Circular),
            "spring" => Ok(Self::Spring),
            "kamada_kawai" => Ok(Self::KamadaKawai),
            other => Err(format!("unknown layout '{}'", other)),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hierarchical => "hierarchical",
            Self::Circular => "circular",
            Self::Spring => "spring",
            Self::KamadaKawai => "kamada_kawai",
        })
    }
}

const SPRING_ITERATIONS: usize = 50;
const STRESS_ITERATIONS: usize = 150;

/// Compute positions for every node of `graph`.
pub fn compute(graph: &CodeGraph, layout: Layout) -> Positions {
    let n = graph.node_count();
    let raw = match n {
        0 => Vec::new(),
        1 => vec![(0.0, 0.0)],
        _ => match layout {
            Layout::Hierarchical => hierarchical(graph),
            Layout::Circular => circular(n),
            Layout::Spring => spring(graph),
            Layout::KamadaKawai => kamada_kawai(graph),
        },
    };

    let normalized = normalize(&raw);
    graph
        .nodes()
        .map(|node| node.name.clone())
        .zip(normalized)
        .collect()
}

fn circular(n: usize) -> Vec<(f64, f64)> {
    (0..n)
        .map(|i| {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            (angle.cos(), angle.sin())
        })
        .collect()
}

fn hierarchical(graph: &CodeGraph) -> Vec<(f64, f64)> {
    let g = graph.inner();
    let n = g.node_count();

    // Ignore back edges so cycles do not prevent layering.
    let mut back: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
    depth_first_search(g, g.node_indices(), |event| {
        if let DfsEvent::BackEdge(u, v) = event {
            back.insert((u, v));
        }
    });

    let forward: Vec<(usize, usize)> = g
        .edge_references()
        .filter(|e| !back.contains(&(e.source(), e.target())))
        .map(|e| (e.source().index(), e.target().index()))
        .collect();

    let mut indegree = vec![0usize; n];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
    for &(s, t) in &forward {
        indegree[t] += 1;
        outgoing[s].push(t);
    }

    let mut layer = vec![0usize; n];
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    while let Some(u) = queue.pop_front() {
        for &t in &outgoing[u] {
            layer[t] = layer[t].max(layer[u] + 1);
            indegree[t] -= 1;
            if indegree[t] == 0 {
                queue.push_back(t);
            }
        }
    }

    let layers = layer.iter().copied().max().unwrap_or(0) + 1;
    let mut per_layer = vec![0usize; layers];
    for &l in &layer {
        per_layer[l] += 1;
    }

    let widest = per_layer.iter().copied().max().unwrap_or(1) as f64;
    let mut seen = vec![0usize; layers];
    layer
        .iter()
        .map(|&l| {
            seen[l] += 1;
            let x = seen[l] as f64 / (per_layer[l] + 1) as f64 * widest;
            (x, l as f64)
        })
        .collect()
}

fn undirected_edges(graph: &CodeGraph) -> Vec<(usize, usize)> {
    graph
        .inner()
        .edge_references()
        .filter(|e| e.source() != e.target())
        .map(|e| (e.source().index(), e.target().index()))
        .collect()
}

fn spring(graph: &CodeGraph) -> Vec<(f64, f64)> {
    let n = graph.node_count();
    let edges = undirected_edges(graph);
    let k = (1.0 / n as f64).sqrt();
    let mut pos = circular(n);
    let mut temperature = 0.1;
    let cooling = temperature / (SPRING_ITERATIONS as f64 + 1.0);

    for _ in 0..SPRING_ITERATIONS {
        let mut disp = vec![(0.0f64, 0.0f64); n];

        for i in 0..n {
            for j in (i + 1)..n {
                let (dx, dy) = (pos[i].0 - pos[j].0, pos[i].1 - pos[j].1);
                let dist = (dx * dx + dy * dy).sqrt().max(0.01);
                let force = k * k / dist;
                let (fx, fy) = (dx / dist * force, dy / dist * force);
                disp[i].0 += fx;
                disp[i].1 += fy;
                disp[j].0 -= fx;
                disp[j].1 -= fy;
            }
        }

        for &(a, b) in &edges {
            let (dx, dy) = (pos[a].0 - pos[b].0, pos[a].1 - pos[b].1);
            let dist = (dx * dx + dy * dy).sqrt().max(0.01);
            let force = dist * dist / k;
            let (fx, fy) = (dx / dist * force, dy / dist * force);
            disp[a].0 -= fx;
            disp[a].1 -= fy;
            disp[b].0 += fx;
            disp[b].1 += fy;
        }

        for i in 0..n {
            let len = (disp[i].0 * disp[i].0 + disp[i].1 * disp[i].1).sqrt();
            if len > 0.0 {
                let step = len.min(temperature);
                pos[i].0 += disp[i].0 / len * step;
                pos[i].1 += disp[i].1 / len * step;
            }
        }
        temperature -= cooling;
    }

    pos
}

/// Unweighted shortest path lengths, ignoring direction. Unreachable pairs
/// get one more than the longest finite distance.
fn graph_distances(n: usize, edges: &[(usize, usize)]) -> Vec<Vec<f64>> {
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for &(a, b) in edges {
        adjacency[a].push(b);
        adjacency[b].push(a);
    }

    let mut dist = vec![vec![f64::INFINITY; n]; n];
    for (start, row) in dist.iter_mut().enumerate() {
        row[start] = 0.0;
        let mut queue = VecDeque::from([start]);
        while let Some(u) = queue.pop_front() {
            for &v in &adjacency[u] {
                if row[v].is_infinite() {
                    row[v] = row[u] + 1.0;
                    queue.push_back(v);
                }
            }
        }
    }

    let longest = dist
        .iter()
        .flatten()
        .copied()
        .filter(|d| d.is_finite())
        .fold(1.0f64, f64::max);
    for d in dist.iter_mut().flatten() {
        if d.is_infinite() {
            *d = longest + 1.0;
        }
    }
    dist
}

fn kamada_kawai(graph: &CodeGraph) -> Vec<(f64, f64)> {
    let n = graph.node_count();
    let dist = graph_distances(n, &undirected_edges(graph));
    let mut pos: Vec<(f64, f64)> = circular(n)
        .into_iter()
        .map(|(x, y)| (x * n as f64 / 4.0, y * n as f64 / 4.0))
        .collect();

    // Stress majorization: each node moves to the weighted average of where
    // its neighbors say it should be.
    for _ in 0..STRESS_ITERATIONS {
        for i in 0..n {
            let (mut sx, mut sy, mut sw) = (0.0, 0.0, 0.0);
            for j in 0..n {
                if i == j {
                    continue;
                }
                let d = dist[i][j];
                let w = 1.0 / (d * d);
                let (dx, dy) = (pos[i].0 - pos[j].0, pos[i].1 - pos[j].1);
                let norm = (dx * dx + dy * dy).sqrt().max(1e-9);
                sx += w * (pos[j].0 + d * dx / norm);
                sy += w * (pos[j].1 + d * dy / norm);
                sw += w;
            }
            if sw > 0.0 {
                pos[i] = (sx / sw, sy / sw);
            }
        }
    }

    pos
}

fn normalize(raw: &[(f64, f64)]) -> Vec<Point> {
    if raw.is_empty() {
        return Vec::new();
    }
    let (min_x, max_x) = bounds(raw.iter().map(|p| p.0));
    let (min_y, max_y) = bounds(raw.iter().map(|p| p.1));
    let span = (max_x - min_x).max(max_y - min_y);

    if span <= f64::EPSILON {
        return vec![Point { x: 0.5, y: 0.5 }; raw.len()];
    }

    let pad_x = (1.0 - (max_x - min_x) / span) / 2.0;
    let pad_y = (1.0 - (max_y - min_y) / span) / 2.0;
    raw.iter()
        .map(|&(x, y)| Point {
            x: ((x - min_x) / span + pad_x).clamp(0.0, 1.0),
            y: ((y - min_y) / span + pad_y).clamp(0.0, 1.0),
        })
        .collect()
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeKind, Relation};

    fn chain() -> CodeGraph {
        let mut g = CodeGraph::new();
        g.add_node("a.py", NodeKind::File);
        g.add_node("f", NodeKind::Function);
        g.add_node("g", NodeKind::Function);
        g.add_node("h", NodeKind::Function);
        g.add_edge("a.py", "f", Relation::Contains);
        g.add_edge("f", "g", Relation::Calls);
        g.add_edge("g", "h", Relation::Calls);
        g.add_edge("h", "f", Relation::Calls);
        g
    }

    #[test]
    fn test_every_layout_covers_all_nodes() {
        let g = chain();
        for layout in [Layout::Hierarchical, Layout::Circular, Layout::Spring, Layout::KamadaKawai] {
            let pos = compute(&g, layout);
            assert_eq!(pos.len(), g.node_count(), "{}", layout);
            for p in pos.values() {
                assert!((0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y), "{}: {:?}", layout, p);
                assert!(p.x.is_finite() && p.y.is_finite());
            }
        }
    }

    #[test]
    fn test_hierarchical_layers_follow_edges() {
        let pos = compute(&chain(), Layout::Hierarchical);
        assert!(pos["a.py"].y < pos["f"].y);
        assert!(pos["f"].y < pos["g"].y);
        assert!(pos["g"].y < pos["h"].y);
    }

    #[test]
    fn test_single_and_empty() {
        let mut g = CodeGraph::new();
        assert!(compute(&g, Layout::Spring).is_empty());
        g.add_node("solo", NodeKind::Function);
        assert_eq!(compute(&g, Layout::KamadaKawai)["solo"], Point { x: 0.5, y: 0.5 });
    }

    #[test]
    fn test_parse_layout() {
        assert_eq!("kamada-kawai".parse::<Layout>().unwrap(), Layout::KamadaKawai);
        assert_eq!("kamada_kawai".parse::<Layout>().unwrap(), Layout::KamadaKawai);
        assert!("grid".parse::<Layout>().is_err());
    }
}
