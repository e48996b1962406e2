//! Builds a [`CodeGraph`] from a directory of Python sources.

use std::path::{Path, PathBuf};

use crate::config::GraphConfig;
use crate::docstrings::ExtractError;
use crate::parser::{ParseResult, Parser, PythonParser};
use crate::walk;

use super::builtins::{is_builtin, is_stdlib_module};
use super::model::{CodeGraph, NodeKind, Relation};

/// What to leave out of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Skip calls to Python builtins.
    pub exclude_builtins: bool,
    /// Skip imports of standard library modules.
    pub exclude_stdlib: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            exclude_builtins: true,
            exclude_stdlib: true,
        }
    }
}

impl From<&GraphConfig> for BuildOptions {
    fn from(config: &GraphConfig) -> Self {
        Self {
            exclude_builtins: !config.include_builtins,
            exclude_stdlib: !config.include_stdlib,
        }
    }
}

/// Counts from one build.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    pub files_parsed: usize,
    pub files_skipped: usize,
}

/// Walks a project and records `contains`, `imports` and `calls` relations.
///
/// Nodes are keyed by name: a file node by its base name, a function node by
/// its simple name. Two functions with the same name in different files are
/// one node.
pub struct CodeGraphBuilder {
    root: PathBuf,
    options: BuildOptions,
    config: GraphConfig,
    parser: PythonParser,
    graph: CodeGraph,
    stats: BuildStats,
}

impl CodeGraphBuilder {
    /// Create a builder with the default walk settings.
    pub fn new(root: impl Into<PathBuf>, options: BuildOptions) -> Self {
        Self::with_config(root, options, GraphConfig::default())
    }

    /// Create a builder with explicit walk settings.
    pub fn with_config(root: impl Into<PathBuf>, options: BuildOptions, config: GraphConfig) -> Self {
        Self {
            root: root.into(),
            options,
            config,
            parser: PythonParser::new(),
            graph: CodeGraph::new(),
            stats: BuildStats::default(),
        }
    }

    /// Parse every source file under the root.
    ///
    /// Files that cannot be read or parsed are logged and skipped.
    pub fn parse_project(mut self) -> CodeGraph {
        self.build().0
    }

    /// Like [`CodeGraphBuilder::parse_project`], also returning file counts.
    pub fn build(&mut self) -> (CodeGraph, BuildStats) {
        for path in walk::source_files(&self.root, &self.config) {
            match self.parse_file(&path) {
                Ok(()) => self.stats.files_parsed += 1,
                Err(e) => {
                    tracing::warn!(severity = %e.severity(), "Skipping {}: {}", path.display(), e);
                    self.stats.files_skipped += 1;
                }
            }
        }

        tracing::info!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "Built graph from {} files ({} skipped)",
            self.stats.files_parsed,
            self.stats.files_skipped
        );

        (std::mem::take(&mut self.graph), std::mem::take(&mut self.stats))
    }

    /// Add one file's nodes and edges to the graph.
    pub fn parse_file(&mut self, path: &Path) -> Result<(), ExtractError> {
        let content = std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let relative = self.relative(path);
        let parsed = self
            .parser
            .parse_file(&relative, &content)
            .map_err(|source| ExtractError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let file_node = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| relative.clone());

        self.add_parsed(&file_node, &relative, parsed);
        Ok(())
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .ok()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }

    fn add_parsed(&mut self, file_node: &str, relative: &str, parsed: ParseResult) {
        self.graph
            .add_node_with(file_node, NodeKind::File, [("path", relative)]);

        for func in &parsed.functions {
            self.graph.add_node_with(
                &func.name,
                NodeKind::Function,
                [
                    ("file".to_string(), relative.to_string()),
                    ("line".to_string(), func.start_line.to_string()),
                ],
            );
            self.graph.add_edge(file_node, &func.name, Relation::Contains);
        }

        for import in &parsed.imports {
            if self.options.exclude_stdlib && import.level == 0 && is_stdlib_module(&import.module) {
                continue;
            }
            let imported = format!("{}.py", import.module);
            if !self.graph.contains_node(&imported) {
                self.graph.add_node(&imported, NodeKind::File);
            }
            self.graph.add_edge(file_node, &imported, Relation::Imports);
        }

        for call in &parsed.calls {
            if self.options.exclude_builtins && is_builtin(&call.callee) {
                continue;
            }
            if !self.graph.contains_node(&call.callee) {
                self.graph.add_node(&call.callee, NodeKind::Function);
            }
            if let Some(caller) = &call.caller {
                self.graph.add_edge(caller, &call.callee, Relation::Calls);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("main.py"),
            "import os\nfrom utils import helper\n\ndef run():\n    print('hi')\n    helper()\n",
        )
        .unwrap();
        fs::write(dir.path().join("utils.py"), "def helper():\n    return len([])\n").unwrap();
        dir
    }

    #[test]
    fn test_relations() {
        let dir = project();
        let graph = CodeGraphBuilder::new(dir.path(), BuildOptions::default()).parse_project();

        assert_eq!(graph.edge("main.py", "run").unwrap().relation, Relation::Contains);
        assert_eq!(graph.edge("utils.py", "helper").unwrap().relation, Relation::Contains);
        assert_eq!(graph.edge("main.py", "utils.py").unwrap().relation, Relation::Imports);
        assert_eq!(graph.edge("run", "helper").unwrap().relation, Relation::Calls);
        assert!(!graph.contains_node("print"));
        assert!(!graph.contains_node("os.py"));
        assert_eq!(graph.node("run").unwrap().attr("file"), Some("main.py"));
        assert_eq!(graph.node("utils.py").unwrap().attr("path"), Some("utils.py"));
    }

    #[test]
    fn test_include_builtins_and_stdlib() {
        let dir = project();
        let options = BuildOptions {
            exclude_builtins: false,
            exclude_stdlib: false,
        };
        let graph = CodeGraphBuilder::new(dir.path(), options).parse_project();

        assert_eq!(graph.edge("run", "print").unwrap().relation, Relation::Calls);
        assert_eq!(graph.edge("helper", "len").unwrap().relation, Relation::Calls);
        assert_eq!(graph.edge("main.py", "os.py").unwrap().relation, Relation::Imports);
    }

    #[test]
    fn test_invalid_file_is_skipped() {
        let dir = project();
        fs::write(dir.path().join("broken.py"), "def nope(:\n").unwrap();

        let mut builder = CodeGraphBuilder::new(dir.path(), BuildOptions::default());
        let (graph, stats) = builder.build();
        assert_eq!(stats.files_parsed, 2);
        assert_eq!(stats.files_skipped, 1);
        assert!(!graph.contains_node("broken.py"));
    }
}
