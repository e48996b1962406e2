//! Knowledge graphs of Python codebases.
//!
//! The pipeline: [`walk`] finds sources, [`parser`] reads them with
//! tree-sitter, [`docstrings`] and [`graph`] turn the parse results into a
//! docstring map and a [`graph::CodeGraph`], [`store`] persists graphs with
//! [`summarize`]d docstrings, and [`search`] ranks stored nodes and edges by
//! meaning.

pub mod config;
pub mod docstrings;
pub mod error;
pub mod graph;
pub mod llm;
pub mod parser;
pub mod search;
pub mod store;
pub mod summarize;
pub mod walk;

pub use config::{Config, ConfigError, LLMConfig};
pub use docstrings::{extract_from_directory, extract_from_file, find_docstring, ResolutionStrategy};
pub use error::Severity;
pub use graph::{BuildOptions, CodeGraph, CodeGraphBuilder, Layout, NodeKind, Relation};
pub use store::{GraphStore, StoreError, StoredGraph};
