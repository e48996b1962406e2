//! Project walking shared by the docstring extractor and the graph builder.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::config::GraphConfig;

/// Collect every recognized source file under `root`.
///
/// Entries are sorted by file name within each directory so the order, and
/// with it first-match resolution, is the same on every filesystem. Every
/// directory is visited except `exclude_dirs`; hidden and gitignored paths
/// are skipped only when the config asks for it.
pub fn source_files(root: &Path, config: &GraphConfig) -> Vec<PathBuf> {
    if root.is_file() {
        return if config.is_source(root) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    let exclude_dirs = config.exclude_dirs.clone();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(config.skip_hidden)
        .git_ignore(config.respect_gitignore)
        .git_exclude(config.respect_gitignore)
        .git_global(config.respect_gitignore)
        .parents(config.respect_gitignore)
        .require_git(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            !(is_dir && exclude_dirs.iter().any(|d| entry.file_name() == d.as_str()))
        })
        .build();

    walker
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.into_path())
        .filter(|path| config.is_source(path))
        .collect()
}
