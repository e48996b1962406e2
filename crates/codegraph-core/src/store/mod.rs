//! Persistence of code graphs in SurrealDB.
//!
//! One document per stored graph in the configured table, keyed by a fresh
//! graph id. When a project directory is given, function nodes are enriched
//! with their docstring sections and a generated summary, and an attached
//! [`VectorIndex`] receives their embeddings.

mod records;
mod vectors;

pub use records::{
    content_id, edge_record_id, node_record_id, EdgeRecord, GraphSummary, NodeRecord, StoredGraph,
};
pub use vectors::VectorIndex;

use std::collections::HashMap;
use std::path::Path;

use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use thiserror::Error;

use crate::config::{Config, ConfigError, GraphConfig, StoreConfig, DEFAULT_NODE_DESCRIPTION, NO_DOCSTRING_PLACEHOLDER};
use crate::docstrings::{extract_from_directory_with, resolve, DocstringSections, Resolution, ResolutionStrategy};
use crate::error::Severity;
use crate::graph::CodeGraph;
use crate::search::{EmbedError, Embedder, SearchHit};
use crate::summarize::{HeuristicSummarizer, SummaryError, SummaryGenerator, SummaryRequest};

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to connect to {url}: {message}")]
    Connection { url: String, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Store is closed")]
    Closed,

    #[error(transparent)]
    Summary(#[from] SummaryError),

    #[error(transparent)]
    Embedding(#[from] EmbedError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StoreError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Summary(e) => e.severity(),
            _ => Severity::Fatal,
        }
    }
}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Handle to the document store.
pub struct GraphStore {
    db: Option<Surreal<Any>>,
    table: String,
    graph_config: GraphConfig,
    strategy: ResolutionStrategy,
    summarizer: Box<dyn SummaryGenerator>,
    vectors: Option<VectorIndex>,
}

impl GraphStore {
    /// Connect, sign in when credentials are configured, select the
    /// namespace and database, and define the graph table.
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let strategy = config.docstrings.strategy()?;

        let db = match open(&config.store).await {
            Ok(db) => db,
            Err(e) => {
                tracing::error!(url = %config.store.url, error = %e, "Failed to connect to document store");
                return Err(StoreError::Connection {
                    url: config.store.url.clone(),
                    message: e.to_string(),
                });
            }
        };

        tracing::info!(url = %config.store.url, table = %config.store.table, "Connected to document store");

        Ok(Self {
            db: Some(db),
            table: config.store.table.clone(),
            graph_config: config.graph.clone(),
            strategy,
            summarizer: Box::new(HeuristicSummarizer::new(config.summary.max_words)),
            vectors: None,
        })
    }

    /// Replace the summary generator used by [`GraphStore::store_graph`].
    pub fn with_summarizer(mut self, summarizer: Box<dyn SummaryGenerator>) -> Self {
        self.summarizer = summarizer;
        self
    }

    /// Attach an embedding table in the same database.
    pub async fn attach_vectors(&mut self, table: &str, embedder: Box<dyn Embedder>) -> Result<(), StoreError> {
        let db = self.db()?.clone();
        self.vectors = Some(VectorIndex::open(db, table, embedder).await?);
        Ok(())
    }

    pub fn has_vectors(&self) -> bool {
        self.vectors.is_some()
    }

    fn db(&self) -> Result<&Surreal<Any>, StoreError> {
        self.db.as_ref().ok_or(StoreError::Closed)
    }

    /// Store `graph` under a fresh graph id and return it.
    ///
    /// With a `directory`, function nodes get their docstring sections and a
    /// summary, and embeddings are written when a vector index is attached.
    /// Embedding failures are logged; the graph stays stored either way.
    pub async fn store_graph(
        &self,
        graph: &CodeGraph,
        project_name: &str,
        directory: Option<&Path>,
    ) -> Result<String, StoreError> {
        let db = self.db()?;
        let graph_id = uuid::Uuid::new_v4().to_string();

        let mut nodes: Vec<NodeRecord> = graph
            .nodes()
            .map(|node| NodeRecord {
                id: node_record_id(&graph_id, node.kind.as_str(), &node.name),
                name: node.name.clone(),
                node_type: node.kind.as_str().to_string(),
                attributes: node.attributes.clone(),
                description: DEFAULT_NODE_DESCRIPTION.to_string(),
                docstring: None,
            })
            .collect();

        if let Some(dir) = directory {
            self.enrich(&mut nodes, dir).await?;
        }

        let ids: HashMap<&str, &str> = nodes.iter().map(|n| (n.name.as_str(), n.id.as_str())).collect();
        let edges: Vec<EdgeRecord> = graph
            .edges()
            .map(|view| {
                let source_id = ids.get(view.source.name.as_str()).copied().unwrap_or_default();
                let target_id = ids.get(view.target.name.as_str()).copied().unwrap_or_default();
                EdgeRecord {
                    id: edge_record_id(source_id, view.edge.relation.as_str(), target_id),
                    source: view.source.name.clone(),
                    target: view.target.name.clone(),
                    relation: view.edge.relation.as_str().to_string(),
                    attributes: view.edge.attributes.clone(),
                }
            })
            .collect();

        let record = StoredGraph {
            graph_id: graph_id.clone(),
            project_name: project_name.to_string(),
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            nodes,
            edges,
        };

        db.query("CREATE type::thing($tb, $id) CONTENT $doc")
            .bind(("tb", self.table.clone()))
            .bind(("id", graph_id.clone()))
            .bind(("doc", record.clone()))
            .await?
            .check()?;

        // Vectors are best effort once the document exists.
        if let (Some(vectors), Some(_)) = (&self.vectors, directory) {
            if let Err(e) = vectors.index_graph(&record).await {
                tracing::warn!(graph_id = %graph_id, error = %e, "Failed to store embeddings");
            }
        }

        tracing::info!(
            graph_id = %graph_id,
            project = project_name,
            nodes = record.node_count,
            edges = record.edge_count,
            "Stored graph"
        );
        Ok(graph_id)
    }

    async fn enrich(&self, nodes: &mut [NodeRecord], directory: &Path) -> Result<(), StoreError> {
        let docstrings = extract_from_directory_with(directory, &self.graph_config);

        let mut requests = Vec::new();
        let mut sections: HashMap<String, DocstringSections> = HashMap::new();

        for node in nodes.iter().filter(|n| n.node_type == "function") {
            let resolution = match resolve(&node.name, &docstrings, self.strategy) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(severity = %e.severity(), "Skipping docstring: {}", e);
                    continue;
                }
            };
            let text = match resolution {
                Resolution::NotFound => continue,
                Resolution::Found(m) => m.docstring,
                Resolution::Many(all) => all
                    .into_iter()
                    .map(|m| m.docstring)
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            };
            if text == NO_DOCSTRING_PLACEHOLDER {
                continue;
            }
            sections.insert(node.id.clone(), DocstringSections::parse(&text));
            requests.push(SummaryRequest::new(node.id.clone(), text));
        }

        if requests.is_empty() {
            return Ok(());
        }

        tracing::debug!(count = requests.len(), "Summarizing docstrings");
        let mut summaries = self.summarizer.summarize_batch(requests).await?;

        for node in nodes.iter_mut() {
            if let Some(summary) = summaries.remove(&node.id) {
                node.description = summary;
            }
            if let Some(doc) = sections.remove(&node.id) {
                node.docstring = Some(doc);
            }
        }
        Ok(())
    }

    /// The stored document for `graph_id`, if any.
    pub async fn get_graph_metadata(&self, graph_id: &str) -> Result<Option<StoredGraph>, StoreError> {
        let found: Vec<StoredGraph> = self
            .db()?
            .query(
                "SELECT graph_id, project_name, node_count, edge_count, timestamp, nodes, edges \
                 FROM type::thing($tb, $id)",
            )
            .bind(("tb", self.table.clone()))
            .bind(("id", graph_id.to_string()))
            .await?
            .take(0)?;
        Ok(found.into_iter().next())
    }

    /// All stored graphs, oldest first.
    pub async fn list_graphs(&self) -> Result<Vec<GraphSummary>, StoreError> {
        let graphs: Vec<GraphSummary> = self
            .db()?
            .query(
                "SELECT graph_id, project_name, node_count, edge_count, timestamp \
                 FROM type::table($tb) ORDER BY timestamp ASC",
            )
            .bind(("tb", self.table.clone()))
            .await?
            .take(0)?;
        Ok(graphs)
    }

    /// Delete a stored graph and its vectors. Returns false when no graph
    /// has that id.
    pub async fn delete_graph(&self, graph_id: &str) -> Result<bool, StoreError> {
        let db = self.db()?;
        let existing: Vec<String> = db
            .query("SELECT VALUE graph_id FROM type::thing($tb, $id)")
            .bind(("tb", self.table.clone()))
            .bind(("id", graph_id.to_string()))
            .await?
            .take(0)?;

        if existing.is_empty() {
            return Ok(false);
        }

        db.query("DELETE type::thing($tb, $id)")
            .bind(("tb", self.table.clone()))
            .bind(("id", graph_id.to_string()))
            .await?
            .check()?;

        if let Some(vectors) = &self.vectors {
            vectors.delete_graph(graph_id).await?;
        }

        tracing::info!(graph_id, "Deleted graph");
        Ok(true)
    }

    /// Semantic search over stored vectors, best first. Empty when no vector
    /// index is attached.
    pub async fn search_by_text(
        &self,
        query: &str,
        top_k: usize,
        graph_id: Option<&str>,
    ) -> Result<Vec<SearchHit>, StoreError> {
        self.db()?;
        match &self.vectors {
            Some(vectors) => vectors.search(query, top_k, graph_id).await,
            None => Ok(Vec::new()),
        }
    }

    /// Drop the connection. Safe to call more than once.
    pub fn close(&mut self) {
        self.vectors = None;
        if self.db.take().is_some() {
            tracing::debug!("Closed document store");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.db.is_none()
    }
}

async fn open(store: &StoreConfig) -> Result<Surreal<Any>, surrealdb::Error> {
    if let Some(path) = store.url.strip_prefix("rocksdb://") {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(path = %parent.display(), error = %e, "Could not create store directory");
            }
        }
    }

    let db = any::connect(store.url.as_str()).await?;

    if let (Some(username), Some(password)) = (&store.username, &store.password) {
        db.signin(Root {
            username: username.as_str(),
            password: password.as_str(),
        })
        .await?;
    }

    db.use_ns(store.namespace.as_str())
        .use_db(store.database.as_str())
        .await?;
    db.query(format!("DEFINE TABLE IF NOT EXISTS {} SCHEMALESS", store.table))
        .await?
        .check()?;

    Ok(db)
}
