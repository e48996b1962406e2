//! HTML page assembly for the graph view.
//!
//! Templates are stored as separate files:
//! - `templates/index.html` - HTML structure
//! - `templates/styles.css` - CSS styles
//! - `templates/app.js` - JavaScript application code
//!
//! Files are embedded at compile time using `include_str!`. The same page
//! serves the live view, which fetches `/api/graph`, and the standalone
//! export, which carries the graph inline.

use super::models::GraphData;

const HTML_TEMPLATE: &str = include_str!("templates/index.html");
const STYLES: &str = include_str!("templates/styles.css");
const SCRIPT: &str = include_str!("templates/app.js");

/// Where the page gets its graph from.
pub enum PageData {
    /// Fetch from the API and poll for rebuilds.
    Live,
    /// Graph JSON produced by [`embed_json`].
    Embedded(String),
}

/// Assemble the page. User-controlled values are substituted last.
pub fn render_page(project_name: &str, data: PageData) -> String {
    let graph_data = match data {
        PageData::Live => "null".to_string(),
        PageData::Embedded(json) => json,
    };

    HTML_TEMPLATE
        .replace("{{STYLES}}", STYLES)
        .replace("{{SCRIPT}}", SCRIPT)
        .replace("{{PROJECT_NAME}}", &html_escape(project_name))
        .replace("{{GRAPH_DATA}}", &graph_data)
}

/// Serialize `data` for inclusion in a `<script>` element.
pub fn embed_json(data: &GraphData) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(data)?;
    Ok(json.replace("</", "<\\/"))
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_page_has_no_inline_graph() {
        let page = render_page("demo <app>", PageData::Live);
        assert!(page.contains("demo &lt;app&gt;"));
        assert!(page.contains("window.CODEGRAPH_DATA = null;"));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn test_embedded_json_cannot_close_script() {
        let data = GraphData {
            layout: "circular".to_string(),
            nodes: Vec::new(),
            edges: Vec::new(),
        };
        let json = embed_json(&data).unwrap();
        let page = render_page("p", PageData::Embedded(json));
        assert!(page.contains(r#"window.CODEGRAPH_DATA = {"layout":"circular","nodes":[],"edges":[]};"#));
        assert_eq!(html_escape("</script>"), "&lt;/script&gt;");
    }
}
