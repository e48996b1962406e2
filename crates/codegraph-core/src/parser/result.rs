//! Parse result types for one Python module.

/// Everything the graph and docstring passes need from one source file.
#[derive(Debug, Default)]
pub struct ParseResult {
    /// File path that was parsed.
    pub file_path: String,

    /// Function definitions, in tree walk order.
    pub functions: Vec<ParsedFunction>,

    /// Import statements naming a module.
    pub imports: Vec<ParsedImport>,

    /// Calls to bare names.
    pub calls: Vec<ParsedCall>,
}

impl ParseResult {
    /// Create a new parse result for the given file.
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Default::default()
        }
    }

    /// Get statistics about the parse result.
    pub fn stats(&self) -> ParseStats {
        ParseStats {
            functions: self.functions.len(),
            documented: self.functions.iter().filter(|f| f.docstring.is_some()).count(),
            imports: self.imports.len(),
            calls: self.calls.len(),
        }
    }
}

/// A `def` or `async def`, at any nesting depth.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFunction {
    pub name: String,
    pub start_line: u32,
    pub end_line: u32,
    pub is_async: bool,
    /// Cleaned docstring, if the body starts with a plain string literal.
    pub docstring: Option<String>,
}

/// How a module was brought in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `import a.b`
    Plain,
    /// `from a.b import c`
    From,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedImport {
    /// Dotted module path with any relative-import dots stripped.
    pub module: String,
    pub kind: ImportKind,
    /// Number of leading dots of a relative import.
    pub level: usize,
    pub line: u32,
}

impl ParsedImport {
    /// First component of the dotted path.
    pub fn top_level(&self) -> &str {
        self.module.split('.').next().unwrap_or(&self.module)
    }
}

/// A call whose callee is a bare identifier, e.g. `helper(x)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCall {
    pub callee: String,
    /// Innermost enclosing function, if the call is inside one.
    pub caller: Option<String>,
    pub line: u32,
}

/// Counts over one parse result.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseStats {
    pub functions: usize,
    pub documented: usize,
    pub imports: usize,
    pub calls: usize,
}
