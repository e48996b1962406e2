//! Docstring lookup by function name across a directory map.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use super::DirectoryDocstrings;
use crate::error::Severity;

/// Policy for a function name defined in more than one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionStrategy {
    /// The first file in map order wins; later definitions are hidden.
    #[default]
    FirstMatch,
    /// A name defined in several files is an error.
    Strict,
    /// Every definition is returned.
    All,
}

impl FromStr for ResolutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "first-match" | "first" => Ok(Self::FirstMatch),
            "strict" => Ok(Self::Strict),
            "all" => Ok(Self::All),
            other => Err(format!("unknown resolution strategy '{}'", other)),
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstMatch => write!(f, "first-match"),
            Self::Strict => write!(f, "strict"),
            Self::All => write!(f, "all"),
        }
    }
}

/// One definition of a function name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocstringMatch {
    pub path: PathBuf,
    pub docstring: String,
}

/// Outcome of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    NotFound,
    Found(DocstringMatch),
    Many(Vec<DocstringMatch>),
}

impl Resolution {
    /// The single docstring this resolution stands for, if any. For `Many`
    /// the first definition is used.
    pub fn docstring(&self) -> Option<&str> {
        match self {
            Self::NotFound => None,
            Self::Found(m) => Some(&m.docstring),
            Self::Many(all) => all.first().map(|m| m.docstring.as_str()),
        }
    }
}

/// A name found in several files under [`ResolutionStrategy::Strict`].
#[derive(Debug, Error)]
#[error("function '{name}' is defined in {} files: {}", .paths.len(), display_paths(.paths))]
pub struct AmbiguousName {
    pub name: String,
    pub paths: Vec<PathBuf>,
}

impl AmbiguousName {
    pub fn severity(&self) -> Severity {
        Severity::Recoverable
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Message returned when no file defines the requested function.
pub fn not_found_message(function_name: &str) -> String {
    format!("Function '{}' not found.", function_name)
}

/// Whether `text` is the not-found message for `function_name`.
pub fn is_not_found_message(function_name: &str, text: &str) -> bool {
    text == not_found_message(function_name)
}

/// Return the docstring from the first file defining `function_name`, or a
/// not-found message naming it.
pub fn find_docstring(function_name: &str, docstrings: &DirectoryDocstrings) -> String {
    docstrings
        .values()
        .find_map(|funcs| funcs.get(function_name))
        .cloned()
        .unwrap_or_else(|| not_found_message(function_name))
}

/// Resolve `function_name` with an explicit policy.
pub fn resolve(
    function_name: &str,
    docstrings: &DirectoryDocstrings,
    strategy: ResolutionStrategy,
) -> Result<Resolution, AmbiguousName> {
    let mut matches = docstrings.iter().filter_map(|(path, funcs)| {
        funcs.get(function_name).map(|doc| DocstringMatch {
            path: path.clone(),
            docstring: doc.clone(),
        })
    });

    match strategy {
        ResolutionStrategy::FirstMatch => Ok(matches
            .next()
            .map(Resolution::Found)
            .unwrap_or(Resolution::NotFound)),
        ResolutionStrategy::Strict => {
            let all: Vec<_> = matches.collect();
            match all.len() {
                0 => Ok(Resolution::NotFound),
                1 => Ok(all.into_iter().next().map(Resolution::Found).unwrap_or(Resolution::NotFound)),
                _ => Err(AmbiguousName {
                    name: function_name.to_string(),
                    paths: all.into_iter().map(|m| m.path).collect(),
                }),
            }
        }
        ResolutionStrategy::All => {
            let mut all: Vec<_> = matches.collect();
            Ok(match all.len() {
                0 => Resolution::NotFound,
                1 => Resolution::Found(all.remove(0)),
                _ => Resolution::Many(all),
            })
        }
    }
}
