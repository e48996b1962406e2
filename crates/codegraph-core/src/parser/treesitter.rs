//! Tree-sitter helpers shared by the Python parser.

use tree_sitter::{Language, Node, Parser as TSParser, Point, Tree};

use super::ParseError;

/// Base tree-sitter parser with shared functionality.
pub struct TreeSitterParser {
    language: Language,
    language_name: &'static str,
    extensions: &'static [&'static str],
}

impl TreeSitterParser {
    pub fn new(language: Language, language_name: &'static str, extensions: &'static [&'static str]) -> Self {
        Self { language, language_name, extensions }
    }

    pub fn language_name(&self) -> &'static str {
        self.language_name
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        self.extensions
    }

    /// Parse source code into a tree-sitter tree.
    ///
    /// Tree-sitter recovers from errors, so a tree is always produced for
    /// text input. A tree containing error or missing nodes is rejected here
    /// so callers see invalid syntax the same way a compiler would.
    pub fn parse_tree(&self, content: &str) -> Result<Tree, ParseError> {
        let mut parser = TSParser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| ParseError::Language(e.to_string()))?;

        let tree = parser.parse(content, None).ok_or(ParseError::Aborted)?;

        let root = tree.root_node();
        if root.has_error() {
            let at = first_error(root).map(|n| n.start_position()).unwrap_or(Point { row: 0, column: 0 });
            return Err(ParseError::Syntax {
                line: at.row + 1,
                column: at.column + 1,
            });
        }

        Ok(tree)
    }

    /// Get text for a node from source content.
    pub fn node_text<'a>(node: &Node, content: &'a str) -> &'a str {
        &content[node.byte_range()]
    }

    /// Get line number (1-based) for a node.
    pub fn node_line(node: &Node) -> u32 {
        node.start_position().row as u32 + 1
    }

    /// Get end line number (1-based) for a node.
    pub fn node_end_line(node: &Node) -> u32 {
        node.end_position().row as u32 + 1
    }
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error())
        .find_map(first_error)
}
