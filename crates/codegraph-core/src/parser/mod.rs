//! Python source parsing on top of tree-sitter.
//!
//! ## Components
//!
//! - `Parser` trait - common interface used by the docstring and graph passes
//! - `PythonParser` - tree-sitter Python implementation
//! - `ParseResult` - functions, imports and calls found in one module

mod python;
mod result;
mod traits;
mod treesitter;

pub use python::{clean_docstring, PythonParser};
pub use result::{ImportKind, ParseResult, ParseStats, ParsedCall, ParsedFunction, ParsedImport};
pub use traits::Parser;

use thiserror::Error;

/// Errors raised while turning source text into a syntax tree.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to set language: {0}")]
    Language(String),

    #[error("Parser gave up before producing a tree")]
    Aborted,

    #[error("invalid syntax at line {line}, column {column}")]
    Syntax { line: usize, column: usize },
}
