//! Embedding table living next to the graph documents.

use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::Surreal;

use crate::docstrings::DocstringSections;
use crate::search::{edge_text, node_text, preprocess_text, Embedder, HitItem, SearchHit};

use super::records::StoredGraph;
use super::StoreError;

#[derive(Debug, Serialize)]
struct VectorRecord {
    graph_id: String,
    item_id: String,
    kind: &'static str,
    text: String,
    embedding: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    node_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    docstring: Option<DocstringSections>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    relation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VectorRow {
    graph_id: String,
    item_id: String,
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    node_type: Option<String>,
    #[serde(default)]
    docstring: Option<DocstringSections>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    relation: Option<String>,
    score: f64,
}

impl From<VectorRow> for SearchHit {
    fn from(row: VectorRow) -> Self {
        let item = if row.kind == "edge" {
            HitItem::Edge {
                source: row.source.unwrap_or_default(),
                target: row.target.unwrap_or_default(),
                relation: row.relation.unwrap_or_default(),
            }
        } else {
            HitItem::Node {
                name: row.name.unwrap_or_default(),
                node_type: row.node_type.unwrap_or_else(|| "unknown".to_string()),
                docstring: row.docstring,
            }
        };
        SearchHit {
            graph_id: row.graph_id,
            item_id: row.item_id,
            score: row.score,
            item,
        }
    }
}

/// Node and edge embeddings, one record each, tagged with their graph id.
pub struct VectorIndex {
    db: Surreal<Any>,
    table: String,
    embedder: Box<dyn Embedder>,
}

impl VectorIndex {
    /// Define the table on an open connection. `table` must be a validated
    /// identifier.
    pub async fn open(db: Surreal<Any>, table: &str, embedder: Box<dyn Embedder>) -> Result<Self, StoreError> {
        db.query(format!(
            "DEFINE TABLE IF NOT EXISTS {table} SCHEMALESS;\
             DEFINE INDEX IF NOT EXISTS {table}_graph ON {table} FIELDS graph_id;"
        ))
        .await?
        .check()?;

        tracing::debug!(table, model = embedder.model_name(), "Vector index ready");

        Ok(Self {
            db,
            table: table.to_string(),
            embedder,
        })
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Embed the nodes carrying docstring data and every edge of `graph`.
    /// Returns the number of vectors written.
    pub async fn index_graph(&self, graph: &StoredGraph) -> Result<usize, StoreError> {
        let mut records = Vec::new();

        for node in &graph.nodes {
            let Some(doc) = &node.docstring else { continue };
            records.push(VectorRecord {
                graph_id: graph.graph_id.clone(),
                item_id: node.id.clone(),
                kind: "node",
                text: preprocess_text(&node_text(&node.name, &node.node_type, doc)),
                embedding: Vec::new(),
                name: Some(node.name.clone()),
                node_type: Some(node.node_type.clone()),
                docstring: Some(doc.clone()),
                source: None,
                target: None,
                relation: None,
            });
        }

        for edge in &graph.edges {
            records.push(VectorRecord {
                graph_id: graph.graph_id.clone(),
                item_id: edge.id.clone(),
                kind: "edge",
                text: preprocess_text(&edge_text(&edge.source, &edge.target, &edge.relation)),
                embedding: Vec::new(),
                name: None,
                node_type: None,
                docstring: None,
                source: Some(edge.source.clone()),
                target: Some(edge.target.clone()),
                relation: Some(edge.relation.clone()),
            });
        }

        if records.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts)?;
        for (record, embedding) in records.iter_mut().zip(embeddings) {
            record.embedding = embedding;
        }

        let count = records.len();
        self.db
            .query(format!("INSERT INTO {} $rows", self.table))
            .bind(("rows", records))
            .await?
            .check()?;

        tracing::info!(graph_id = %graph.graph_id, vectors = count, "Stored embeddings");
        Ok(count)
    }

    /// Rank stored vectors by cosine similarity to `query`, best first.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        graph_id: Option<&str>,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let text = preprocess_text(query);
        let embedding = self
            .embedder
            .embed(&[text])?
            .into_iter()
            .next()
            .unwrap_or_default();

        let filter = if graph_id.is_some() {
            "WHERE graph_id = $graph_id"
        } else {
            ""
        };
        let sql = format!(
            r#"
            SELECT
                graph_id, item_id, kind, name, node_type, docstring, source, target, relation,
                vector::similarity::cosine(embedding, $embedding) AS score
            FROM {}
            {}
            ORDER BY score DESC
            LIMIT $limit
            "#,
            self.table, filter
        );

        let rows: Vec<VectorRow> = self
            .db
            .query(sql)
            .bind(("embedding", embedding))
            .bind(("graph_id", graph_id.unwrap_or_default().to_string()))
            .bind(("limit", top_k))
            .await?
            .take(0)?;

        Ok(rows.into_iter().map(SearchHit::from).collect())
    }

    /// Remove the vectors of one graph.
    pub async fn delete_graph(&self, graph_id: &str) -> Result<(), StoreError> {
        self.db
            .query(format!("DELETE {} WHERE graph_id = $graph_id", self.table))
            .bind(("graph_id", graph_id.to_string()))
            .await?
            .check()?;
        Ok(())
    }
}
