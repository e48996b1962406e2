//! Rebuild the served graph when Python sources change.
//!
//! The debouncer coalesces events; each batch that touches a source file
//! triggers one full rebuild on the blocking pool. Rebuilds are never
//! cancelled: a batch arriving mid-rebuild queues another run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, Debouncer};
use tokio::sync::mpsc;

use codegraph_core::config::GraphConfig;
use codegraph_core::{BuildOptions, CodeGraphBuilder};

use super::AppState;

/// Start watching `root`. Dropping the returned debouncer stops the watch.
pub fn spawn_watcher(
    state: Arc<AppState>,
    root: PathBuf,
    config: GraphConfig,
    options: BuildOptions,
    debounce: Duration,
) -> notify::Result<Debouncer<RecommendedWatcher>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<BTreeSet<PathBuf>>();

    let filter_root = root.clone();
    let filter_config = config.clone();
    let mut debouncer = new_debouncer(
        debounce,
        move |result: notify_debouncer_mini::DebounceEventResult| match result {
            Ok(events) => {
                let dirty = dirty_sources(&events, &filter_root, &filter_config);
                if !dirty.is_empty() {
                    let _ = tx.send(dirty);
                }
            }
            Err(error) => tracing::warn!(error = %error, "Watcher error"),
        },
    )?;

    debouncer.watcher().watch(&root, RecursiveMode::Recursive)?;
    tracing::info!(path = %root.display(), "Watching for changes");

    tokio::spawn(async move {
        while let Some(mut dirty) = rx.recv().await {
            // Fold batches that arrived while the previous rebuild ran.
            while let Ok(more) = rx.try_recv() {
                dirty.extend(more);
            }
            tracing::info!(files = dirty.len(), "Sources changed, rebuilding graph");
            for path in &dirty {
                tracing::debug!(path = %path.display(), "Changed");
            }

            let root = root.clone();
            let config = config.clone();
            let rebuilt = tokio::task::spawn_blocking(move || {
                CodeGraphBuilder::with_config(root, options, config).parse_project()
            })
            .await;

            match rebuilt {
                Ok(graph) => {
                    *state.graph.write().await = graph;
                    let version = state.version.fetch_add(1, Ordering::SeqCst) + 1;
                    tracing::info!(version, "Graph updated");
                }
                Err(e) => tracing::error!(error = %e, "Rebuild task failed"),
            }
        }
    });

    Ok(debouncer)
}

/// Source files under `root` touched by a batch, sorted.
fn dirty_sources(events: &[DebouncedEvent], root: &Path, config: &GraphConfig) -> BTreeSet<PathBuf> {
    events
        .iter()
        .map(|e| e.path.as_path())
        .filter(|p| is_watched(p, root, config))
        .map(Path::to_path_buf)
        .collect()
}

/// Exclusions apply only to components below `root`, matching the walk.
fn is_watched(path: &Path, root: &Path, config: &GraphConfig) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let excluded = relative.components().any(|c| {
        let part = c.as_os_str().to_string_lossy();
        (config.skip_hidden && part.starts_with('.'))
            || config.exclude_dirs.iter().any(|d| d == part.as_ref())
    });
    !excluded && config.is_source(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify_debouncer_mini::DebouncedEventKind;

    fn event(path: &str) -> DebouncedEvent {
        DebouncedEvent {
            path: PathBuf::from(path),
            kind: DebouncedEventKind::Any,
        }
    }

    fn dirty(events: &[DebouncedEvent], root: &str, config: &GraphConfig) -> Vec<PathBuf> {
        dirty_sources(events, Path::new(root), config).into_iter().collect()
    }

    #[test]
    fn test_only_python_sources_are_dirty() {
        let config = GraphConfig::default();
        let events = vec![
            event("/p/b.py"),
            event("/p/a.py"),
            event("/p/a.py"),
            event("/p/notes.txt"),
            event("/p/stubs.pyi"),
            event("/p/__pycache__/a.py"),
            event("/p/.venv/lib/x.py"),
        ];
        assert_eq!(
            dirty(&events, "/p", &config),
            vec![
                PathBuf::from("/p/.venv/lib/x.py"),
                PathBuf::from("/p/a.py"),
                PathBuf::from("/p/b.py"),
            ]
        );
    }

    #[test]
    fn test_exclusions_ignore_components_above_root() {
        let config = GraphConfig {
            exclude_dirs: vec!["__pycache__".into(), "build".into()],
            skip_hidden: true,
            ..Default::default()
        };
        let events = vec![
            event("/srv/build/.work/app/main.py"),
            event("/srv/build/.work/app/pkg/util.py"),
            event("/srv/build/.work/app/__pycache__/main.py"),
            event("/srv/build/.work/app/build/gen.py"),
            event("/srv/build/.work/app/.venv/x.py"),
        ];
        assert_eq!(
            dirty(&events, "/srv/build/.work/app", &config),
            vec![
                PathBuf::from("/srv/build/.work/app/main.py"),
                PathBuf::from("/srv/build/.work/app/pkg/util.py"),
            ]
        );
    }
}
