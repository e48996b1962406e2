//! Live graph view.
//!
//! Serves a Sigma.js page backed by a JSON API and keeps the graph current
//! by rebuilding it when Python sources change.
//!
//! # Module Structure
//!
//! - `handlers` - HTTP route handlers
//! - `models` - API response types
//! - `graph` - CodeGraph to Sigma.js conversion
//! - `templates` - page assembly
//! - `watch` - debounced file watcher

pub mod graph;
mod handlers;
pub mod models;
pub mod templates;
mod watch;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

use codegraph_core::config::GraphConfig;
use codegraph_core::{BuildOptions, CodeGraph, Layout, Relation};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state for the server.
pub struct AppState {
    /// Latest completed build.
    pub graph: RwLock<CodeGraph>,
    /// Incremented after each rebuild.
    pub version: AtomicU64,
    pub project_name: String,
    pub layout: Layout,
    /// Relations shown; empty shows all.
    pub relations: Vec<Relation>,
}

impl AppState {
    pub fn new(graph: CodeGraph, project_name: impl Into<String>, layout: Layout, relations: Vec<Relation>) -> Self {
        Self {
            graph: RwLock::new(graph),
            version: AtomicU64::new(1),
            project_name: project_name.into(),
            layout,
            relations,
        }
    }

    /// The graph as rendered: filtered and without isolated nodes.
    pub async fn display_graph(&self) -> CodeGraph {
        let graph = self.graph.read().await;
        graph.display_graph(Some(self.relations.as_slice()))
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

pub struct ServeConfig {
    pub port: u16,
    pub open_browser: bool,
    pub project_path: PathBuf,
    pub graph: GraphConfig,
    pub options: BuildOptions,
    pub debounce: Duration,
}

// =============================================================================
// Server Entry Point
// =============================================================================

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/graph", get(handlers::api_graph))
        .route("/api/node/{name}", get(handlers::api_node))
        .route("/api/version", get(handlers::api_version))
        .route("/api/search", get(handlers::api_search))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

/// Serve `state` until interrupted, rebuilding on source changes.
pub async fn start_server(config: ServeConfig, state: Arc<AppState>) -> color_eyre::Result<()> {
    let _debouncer = watch::spawn_watcher(
        state.clone(),
        config.project_path.clone(),
        config.graph.clone(),
        config.options,
        config.debounce,
    )?;

    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let url = format!("http://localhost:{}", config.port);

    println!("Serving live graph of {}", config.project_path.display());
    println!("Dashboard: {}", url);
    println!("Press Ctrl+C to stop\n");

    if config.open_browser {
        if let Err(e) = open::that(&url) {
            eprintln!("Could not open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
