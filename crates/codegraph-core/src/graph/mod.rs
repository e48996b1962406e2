//! Code graph model, construction and layout.

mod builder;
mod builtins;
pub mod layout;
mod model;

pub use builder::{BuildOptions, BuildStats, CodeGraphBuilder};
pub use builtins::{is_builtin, is_stdlib_module, PYTHON_BUILTINS, STDLIB_MODULES};
pub use layout::{Layout, Point, Positions};
pub use model::{CodeEdge, CodeGraph, CodeNode, EdgeView, NodeKind, Relation};
