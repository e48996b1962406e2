//! Function docstring extraction for single files and whole directories.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;

use crate::config::{GraphConfig, NO_DOCSTRING_PLACEHOLDER};
use crate::error::Severity;
use crate::parser::{ParseError, Parser, PythonParser};
use crate::walk;

/// Function simple name to docstring text, in tree walk order.
pub type FunctionDocstrings = IndexMap<String, String>;

/// File path to that file's docstrings, in directory walk order.
pub type DirectoryDocstrings = IndexMap<PathBuf, FunctionDocstrings>;

/// Errors for a single file. Always recoverable.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

impl ExtractError {
    pub fn severity(&self) -> Severity {
        Severity::Recoverable
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Parse { path, .. } => path,
        }
    }
}

/// Extract docstrings from already-loaded source text.
///
/// Functions without a docstring get the fixed placeholder. When a name is
/// defined more than once the last definition in walk order wins.
pub fn docstrings_from_source(path: &Path, content: &str) -> Result<FunctionDocstrings, ExtractError> {
    let parsed = PythonParser::new()
        .parse_file(&path.to_string_lossy(), content)
        .map_err(|source| ExtractError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut docstrings = FunctionDocstrings::new();
    for func in parsed.functions {
        let doc = func
            .docstring
            .unwrap_or_else(|| NO_DOCSTRING_PLACEHOLDER.to_string());
        docstrings.insert(func.name, doc);
    }
    Ok(docstrings)
}

/// Extract docstrings from one file, surfacing read and syntax errors.
pub fn try_extract_from_file(path: &Path) -> Result<FunctionDocstrings, ExtractError> {
    let content = std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    docstrings_from_source(path, &content)
}

/// Extract docstrings from one file.
///
/// Unreadable files and files with invalid syntax are logged and yield an
/// empty map.
pub fn extract_from_file(path: &Path) -> FunctionDocstrings {
    match try_extract_from_file(path) {
        Ok(docstrings) => docstrings,
        Err(e) => {
            tracing::warn!(severity = %e.severity(), "Skipping {}: {}", e.path().display(), e);
            FunctionDocstrings::new()
        }
    }
}

/// Extract docstrings from every Python file under `root` with the default
/// walk settings.
pub fn extract_from_directory(root: &Path) -> DirectoryDocstrings {
    extract_from_directory_with(root, &GraphConfig::default())
}

/// Extract docstrings from every recognized file under `root`.
///
/// Only files whose extraction is non-empty are recorded.
pub fn extract_from_directory_with(root: &Path, config: &GraphConfig) -> DirectoryDocstrings {
    let mut result = DirectoryDocstrings::new();
    for path in walk::source_files(root, config) {
        let docstrings = extract_from_file(&path);
        if docstrings.is_empty() {
            tracing::debug!("No functions in {}", path.display());
            continue;
        }
        result.insert(path, docstrings);
    }
    tracing::debug!("Extracted docstrings from {} files", result.len());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extract_example_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.py");
        fs::write(&path, "def foo(): pass\ndef bar():\n    \"\"\"does bar\"\"\"\n").unwrap();

        let docs = extract_from_file(&path);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs["foo"], NO_DOCSTRING_PLACEHOLDER);
        assert_eq!(docs["bar"], "does bar");
    }

    #[test]
    fn test_last_definition_wins() {
        let src = "def dup():\n    'first'\n\ndef dup():\n    'second'\n";
        let docs = docstrings_from_source(Path::new("dup.py"), src).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs["dup"], "second");
    }

    #[test]
    fn test_missing_file_is_empty() {
        let docs = extract_from_file(Path::new("/definitely/not/here.py"));
        assert!(docs.is_empty());
    }

    #[test]
    fn test_invalid_syntax_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.py");
        fs::write(&path, "def broken(:\n").unwrap();

        assert!(extract_from_file(&path).is_empty());
        let err = try_extract_from_file(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Parse { .. }));
        assert_eq!(err.severity(), Severity::Recoverable);
    }
}
