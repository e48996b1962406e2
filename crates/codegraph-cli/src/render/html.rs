//! Standalone interactive page with the graph inlined.

use codegraph_core::{CodeGraph, Layout};

use crate::serve::graph::graph_data;
use crate::serve::templates::{embed_json, render_page, PageData};

pub fn render_html(graph: &CodeGraph, layout: Layout, project_name: &str) -> Result<String, serde_json::Error> {
    let json = embed_json(&graph_data(graph, layout))?;
    Ok(render_page(project_name, PageData::Embedded(json)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{NodeKind, Relation};

    #[test]
    fn test_html_embeds_graph_json() {
        let mut g = CodeGraph::new();
        g.add_node("api.py", NodeKind::File);
        g.add_node("get_user", NodeKind::Function);
        g.add_edge("api.py", "get_user", Relation::Contains);

        let html = render_html(&g, Layout::Spring, "demo").unwrap();
        assert!(html.contains("window.CODEGRAPH_DATA = {\"layout\":\"spring\""));
        assert!(html.contains("\"key\":\"get_user\""));
        assert!(html.contains("\"relationship\":\"contains\""));
        assert!(html.contains("sigma"));
        assert!(!html.contains("{{"));
    }
}
