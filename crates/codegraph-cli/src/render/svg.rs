//! Self-contained SVG rendering of a display graph.

use codegraph_core::graph::{Positions, Relation};
use codegraph_core::{CodeGraph, NodeKind};

const WIDTH: f64 = 1600.0;
const HEIGHT: f64 = 1200.0;
const MARGIN: f64 = 80.0;
const TOP: f64 = 110.0;

pub const TITLE: &str = "Knowledge Graph of Codebase";

fn place(positions: &Positions, name: &str) -> (f64, f64) {
    let p = positions.get(name).copied().unwrap_or_default();
    (
        MARGIN + p.x * (WIDTH - 2.0 * MARGIN),
        TOP + p.y * (HEIGHT - TOP - MARGIN),
    )
}

fn radius(kind: NodeKind) -> f64 {
    f64::from(kind.size()) / 2.0
}

/// Draw `graph` at `positions`: edges first with relation labels, then
/// nodes coloured by kind with their names, a title and a legend.
pub fn render_svg(graph: &CodeGraph, positions: &Positions) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
        w = WIDTH,
        h = HEIGHT
    ));
    out.push('\n');
    out.push_str(r##"<rect width="100%" height="100%" fill="#ffffff"/>"##);
    out.push('\n');

    out.push_str("<defs>\n");
    for relation in Relation::ALL {
        out.push_str(&format!(
            r#"<marker id="arrow-{id}" viewBox="0 0 10 10" refX="10" refY="5" markerWidth="8" markerHeight="8" orient="auto-start-reverse"><path d="M 0 0 L 10 5 L 0 10 z" fill="{color}"/></marker>"#,
            id = relation.as_str(),
            color = relation.color()
        ));
        out.push('\n');
    }
    out.push_str("</defs>\n");

    out.push_str(&format!(
        r#"<text x="{}" y="50" text-anchor="middle" font-size="28" font-weight="bold">{}</text>"#,
        WIDTH / 2.0,
        TITLE
    ));
    out.push('\n');

    out.push_str("<g class=\"edges\">\n");
    for view in graph.edges() {
        let (x1, y1) = place(positions, &view.source.name);
        let (x2, y2) = place(positions, &view.target.name);
        let (dx, dy) = (x2 - x1, y2 - y1);
        let len = (dx * dx + dy * dy).sqrt();
        if len < f64::EPSILON {
            continue;
        }
        // Stop the line at the target's rim so the arrow head stays visible.
        let r = radius(view.target.kind) + 2.0;
        let (ex, ey) = (x2 - dx / len * r, y2 - dy / len * r);
        let relation = view.edge.relation;

        out.push_str(&format!(
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="1.5" stroke-opacity="0.7" marker-end="url(#arrow-{})"/>"#,
            x1,
            y1,
            ex,
            ey,
            relation.color(),
            relation.as_str()
        ));
        out.push('\n');
        out.push_str(&format!(
            r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="9" fill="#555555">{}</text>"##,
            (x1 + x2) / 2.0,
            (y1 + y2) / 2.0,
            relation.as_str()
        ));
        out.push('\n');
    }
    out.push_str("</g>\n");

    out.push_str("<g class=\"nodes\">\n");
    for node in graph.nodes() {
        let (x, y) = place(positions, &node.name);
        let r = radius(node.kind);
        out.push_str(&format!(
            r#"<circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="{}" fill-opacity="0.9" stroke="black" stroke-width="1"><title>Type: {}</title></circle>"#,
            x,
            y,
            r,
            node.kind.color(),
            node.kind
        ));
        out.push('\n');
        out.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="12" font-weight="bold">{}</text>"#,
            x,
            y - r - 6.0,
            xml_escape(&node.name)
        ));
        out.push('\n');
    }
    out.push_str("</g>\n");

    out.push_str(&legend());
    out.push_str("</svg>\n");
    out
}

fn legend() -> String {
    let entries = [
        (NodeKind::File.color(), "File"),
        (NodeKind::Function.color(), "Function"),
        (Relation::Contains.color(), "Contains"),
        (Relation::Imports.color(), "Imports"),
        (Relation::Calls.color(), "Calls"),
    ];

    let x = WIDTH - 200.0;
    let mut out = String::from("<g class=\"legend\">\n");
    out.push_str(&format!(
        r##"<rect x="{}" y="80" width="170" height="{}" fill="#ffffff" stroke="#cccccc"/>"##,
        x,
        entries.len() as f64 * 24.0 + 16.0
    ));
    out.push('\n');
    for (i, (color, label)) in entries.iter().enumerate() {
        let y = 96.0 + i as f64 * 24.0;
        out.push_str(&format!(
            r#"<rect x="{}" y="{}" width="16" height="16" fill="{}"/><text x="{}" y="{}" font-size="14">{}</text>"#,
            x + 12.0,
            y,
            color,
            x + 36.0,
            y + 13.0,
            label
        ));
        out.push('\n');
    }
    out.push_str("</g>\n");
    out
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::graph::layout;
    use codegraph_core::Layout;

    fn sample() -> CodeGraph {
        let mut g = CodeGraph::new();
        g.add_node("main.py", NodeKind::File);
        g.add_node("run", NodeKind::Function);
        g.add_node("a<b>", NodeKind::Function);
        g.add_edge("main.py", "run", Relation::Contains);
        g.add_edge("run", "a<b>", Relation::Calls);
        g
    }

    #[test]
    fn test_svg_contains_every_label() {
        let g = sample();
        let svg = render_svg(&g, &layout::compute(&g, Layout::Hierarchical));
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains(">main.py</text>"));
        assert!(svg.contains(">run</text>"));
        assert!(svg.contains(">a&lt;b&gt;</text>"));
        assert!(svg.contains(TITLE));
    }

    #[test]
    fn test_svg_colours() {
        let g = sample();
        let svg = render_svg(&g, &layout::compute(&g, Layout::Circular));
        assert!(svg.contains(r##"fill="#4287f5""##));
        assert!(svg.contains(r##"fill="#f5a742""##));
        assert!(svg.contains(r##"stroke="#2ecc71""##));
        assert!(svg.contains(r##"stroke="#9b59b6""##));
        assert!(svg.contains("marker-end=\"url(#arrow-calls)\""));
        assert_eq!(svg.matches("<circle").count(), 3);
    }
}
