//! HTTP route handlers for the live view.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    Json,
};

use super::graph::{graph_data, node_details, search_nodes};
use super::models::{GraphData, NodeDetails, SearchQuery, SearchResult, VersionInfo};
use super::templates::{render_page, PageData};
use super::AppState;

/// GET `/` - the page; data is fetched from the API.
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_page(&state.project_name, PageData::Live))
}

/// GET `/api/graph` - display graph with layout positions.
pub async fn api_graph(State(state): State<Arc<AppState>>) -> Json<GraphData> {
    let graph = state.display_graph().await;
    Json(graph_data(&graph, state.layout))
}

/// GET `/api/node/{name}` - attributes and neighbours of one node.
pub async fn api_node(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<NodeDetails>, StatusCode> {
    let graph = state.graph.read().await;
    node_details(&graph, &name).map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// GET `/api/version` - polled by the page to pick up rebuilds.
pub async fn api_version(State(state): State<Arc<AppState>>) -> Json<VersionInfo> {
    let graph = state.graph.read().await;
    Json(VersionInfo {
        version: state.version.load(Ordering::SeqCst),
        nodes: graph.node_count(),
        edges: graph.edge_count(),
    })
}

/// GET `/api/search?q=...&limit=...` - node names matching the query.
pub async fn api_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Json<Vec<SearchResult>> {
    let graph = state.display_graph().await;
    Json(search_nodes(&graph, &params.q, params.limit))
}
