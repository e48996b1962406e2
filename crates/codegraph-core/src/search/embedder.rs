//! Embedding generation for semantic search.

use std::path::PathBuf;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use thiserror::Error;

use crate::error::Severity;

/// Embedding model failure.
#[derive(Debug, Error)]
#[error("Embedding error: {0}")]
pub struct EmbedError(pub String);

impl EmbedError {
    /// Without a working model there is nothing to search with.
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

/// Trait for embedding generation.
pub trait Embedder: Send + Sync {
    /// Generate embeddings for a batch of text.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Get the model name.
    fn model_name(&self) -> &str;
}

/// FastEmbed-based embedder.
pub struct FastEmbedder {
    model: TextEmbedding,
    dimension: usize,
    model_name: String,
}

impl FastEmbedder {
    /// Create an embedder for a configured model name such as
    /// `all-MiniLM-L6-v2` or `bge-small-en-v1.5`.
    /// Uses `~/.codegraph/cache/` as the model cache directory.
    pub fn from_name(name: &str) -> Result<Self, EmbedError> {
        let model = parse_model(name)?;
        Self::with_model_and_cache(model, Self::default_cache_dir())
    }

    /// Create a new FastEmbed embedder with a specific model and cache directory.
    pub fn with_model_and_cache(model: EmbeddingModel, cache_dir: PathBuf) -> Result<Self, EmbedError> {
        let model_name = format!("{:?}", model);

        std::fs::create_dir_all(&cache_dir)
            .map_err(|e| EmbedError(format!("Failed to create cache directory: {}", e)))?;

        let text_embedding = TextEmbedding::try_new(
            InitOptions::new(model)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(false),
        )
        .map_err(|e| EmbedError(e.to_string()))?;

        let sample = text_embedding
            .embed(vec!["dimension"], None)
            .map_err(|e| EmbedError(e.to_string()))?;
        let dimension = sample.first().map(|v| v.len()).unwrap_or(384);

        tracing::debug!(model = %model_name, dimension, "Loaded embedding model");

        Ok(Self {
            model: text_embedding,
            dimension,
            model_name,
        })
    }

    /// Get the default cache directory: `~/.codegraph/cache/`
    fn default_cache_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".codegraph")
            .join("cache")
    }
}

/// Map a sentence-transformers style name onto a fastembed model.
fn parse_model(name: &str) -> Result<EmbeddingModel, EmbedError> {
    let key = name.rsplit('/').next().unwrap_or(name).to_lowercase();
    match key.as_str() {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
        _ => TextEmbedding::list_supported_models()
            .into_iter()
            .find(|info| info.model_code.to_lowercase().contains(&key))
            .map(|info| info.model)
            .ok_or_else(|| EmbedError(format!("unknown embedding model '{}'", name))),
    }
}

impl Embedder for FastEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let texts_vec: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();

        self.model
            .embed(texts_vec, None)
            .map_err(|e| EmbedError(e.to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
