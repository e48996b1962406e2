//! Static and interactive renderings of a code graph.

pub mod html;
pub mod svg;

use std::path::{Path, PathBuf};

use color_eyre::eyre::WrapErr;
use color_eyre::Result;

use codegraph_core::graph::layout;
use codegraph_core::{CodeGraph, Layout, Relation};

pub const EMPTY_MESSAGE: &str = "No nodes to display with current filter";

/// Static SVG or interactive HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Interactive,
    Static,
}

impl View {
    fn extension(self) -> &'static str {
        match self {
            View::Interactive => "html",
            View::Static => "svg",
        }
    }
}

pub struct DrawOptions<'a> {
    pub view: View,
    pub layout: Layout,
    /// Relations to keep; empty keeps all.
    pub relations: &'a [Relation],
    /// Write here instead of a temporary file, without opening a browser.
    pub output: Option<&'a Path>,
    pub project_name: &'a str,
    pub open_browser: bool,
}

/// Render the display graph of `graph`. Returns the written file, or `None`
/// when the filter leaves nothing to draw.
pub fn draw_graph(graph: &CodeGraph, options: &DrawOptions<'_>) -> Result<Option<PathBuf>> {
    let display = graph.display_graph(Some(options.relations));
    if display.is_empty() {
        println!("{}", EMPTY_MESSAGE);
        return Ok(None);
    }

    let content = match options.view {
        View::Interactive => html::render_html(&display, options.layout, options.project_name)?,
        View::Static => svg::render_svg(&display, &layout::compute(&display, options.layout)),
    };

    if let Some(path) = options.output {
        std::fs::write(path, content).wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        println!("Graph saved to {}", path.display());
        return Ok(Some(path.to_path_buf()));
    }

    let path = write_temp(&content, options.view.extension())?;
    if options.open_browser {
        if let Err(e) = open::that(&path) {
            eprintln!("Could not open browser: {}", e);
        }
    }

    match options.view {
        View::Interactive => {
            println!("Interactive graph opened in your web browser. You can drag the view and click nodes to inspect them.");
            println!("Temporary file created at: {}", path.display());
        }
        View::Static => println!("Graph saved to {}", path.display()),
    }
    Ok(Some(path))
}

fn write_temp(content: &str, extension: &str) -> Result<PathBuf> {
    let file = tempfile::Builder::new()
        .prefix("codegraph-")
        .suffix(&format!(".{}", extension))
        .tempfile()?;
    std::fs::write(file.path(), content)?;
    let (_, path) = file.keep()?;
    Ok(path)
}
