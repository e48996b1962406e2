//! Core parser trait.

use super::result::ParseResult;
use super::ParseError;

/// Source parser trait.
///
/// Python is the only language the graph understands today; the trait keeps
/// the docstring and graph passes independent of the tree-sitter plumbing.
pub trait Parser: Send + Sync {
    /// Parse a source file and extract functions, imports and calls.
    ///
    /// # Arguments
    /// * `path` - Path of the file, recorded in the result
    /// * `content` - Source code content
    fn parse_file(&self, path: &str, content: &str) -> Result<ParseResult, ParseError>;

    /// Human-readable language name.
    fn language_name(&self) -> &'static str;

    /// File extensions this parser handles.
    fn supported_extensions(&self) -> &[&'static str];

    /// Check if this parser can handle the given file extension.
    fn can_parse(&self, extension: &str) -> bool {
        self.supported_extensions()
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}
