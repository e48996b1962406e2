//! Configuration management for codegraph.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. An explicit `--config` file, or the project-local `codegraph.toml`
//! 3. User config `~/.config/codegraph/config.toml`
//! 4. Built-in defaults (lowest priority)
//!
//! The resulting [`Config`] is built once at startup and handed to every
//! component by reference. Components never read the environment themselves.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod defaults;

pub use defaults::*;

use crate::docstrings::ResolutionStrategy;
use crate::error::Severity;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// A broken configuration stops the process.
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project walking and graph construction.
    pub graph: GraphConfig,

    /// Docstring lookup policy.
    pub docstrings: DocstringConfig,

    /// Document store connection.
    pub store: StoreConfig,

    /// Embedding index for semantic search.
    pub vector: VectorConfig,

    /// LLM provider configuration.
    pub llm: LLMConfig,

    /// Batch summarization settings.
    pub summary: SummaryConfig,

    /// Live view server.
    pub serve: ServeSettings,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./codegraph.toml` (project local)
    /// 2. `~/.config/codegraph/config.toml` (user config)
    /// 3. Falls back to defaults
    ///
    /// Environment overrides are applied in every case.
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new("codegraph.toml").exists() {
            return Self::from_file("codegraph.toml");
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("codegraph").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Used by `apply_env_overrides`
    /// and by tests that must not touch the process environment.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Store overrides
        if let Some(url) = lookup("CODEGRAPH_STORE_URL") {
            self.store.url = url;
        }
        if let Some(ns) = lookup("CODEGRAPH_STORE_NAMESPACE") {
            self.store.namespace = ns;
        }
        if let Some(db) = lookup("CODEGRAPH_STORE_DATABASE") {
            self.store.database = db;
        }
        if let Some(table) = lookup("CODEGRAPH_STORE_TABLE") {
            self.store.table = table;
        }
        if let Some(user) = lookup("CODEGRAPH_STORE_USERNAME") {
            self.store.username = Some(user);
        }
        if let Some(pass) = lookup("CODEGRAPH_STORE_PASSWORD") {
            self.store.password = Some(pass);
        }

        // Vector overrides
        if let Some(enabled) = lookup("CODEGRAPH_VECTOR_ENABLED") {
            if let Ok(b) = enabled.parse() {
                self.vector.enabled = b;
            }
        }
        if let Some(table) = lookup("CODEGRAPH_VECTOR_TABLE") {
            self.vector.table = table;
        }
        if let Some(model) = lookup("CODEGRAPH_EMBEDDING_MODEL") {
            self.vector.model = model;
        }

        // LLM overrides
        if let Some(provider) = lookup("CODEGRAPH_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(model) = lookup("CODEGRAPH_LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(url) = lookup("CODEGRAPH_LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Some(key) = lookup("CODEGRAPH_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }

        // Azure OpenAI uses its own conventional variable names
        if let Some(endpoint) = lookup("AZURE_OPENAI_ENDPOINT") {
            if self.llm.base_url.is_none() {
                self.llm.base_url = Some(endpoint);
            }
            if lookup("CODEGRAPH_LLM_PROVIDER").is_none() {
                self.llm.provider = "azure".to_string();
            }
        }
        if let Some(key) = lookup("AZURE_OPENAI_API_KEY") {
            if self.llm.api_key.is_none() {
                self.llm.api_key = Some(key);
            }
        }
        if let Some(deployment) = lookup("AZURE_OPENAI_DEPLOYMENT") {
            self.llm.deployment = Some(deployment);
        }
        if let Some(version) = lookup("AZURE_OPENAI_API_VERSION") {
            self.llm.api_version = version;
        }
    }

    /// Check values that would otherwise fail deep inside a query.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("store.table", &self.store.table),
            ("vector.table", &self.vector.table),
        ] {
            if !is_identifier(value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a plain identifier, got '{}'",
                    field, value
                )));
            }
        }
        if self.store.table == self.vector.table {
            return Err(ConfigError::Invalid(
                "store.table and vector.table must differ".to_string(),
            ));
        }
        if self.summary.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "summary.concurrency must be at least 1".to_string(),
            ));
        }
        let factor = self.summary.backoff_factor;
        if !factor.is_finite() || factor < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "summary.backoff_factor must be a non-negative number of seconds, got {}",
                factor
            )));
        }
        self.docstrings.strategy()?;
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Project walking and graph construction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// File extensions treated as Python sources (without leading dot).
    pub extensions: Vec<String>,

    /// Directory names skipped during the walk.
    pub exclude_dirs: Vec<String>,

    /// Keep calls to Python builtins as graph nodes.
    pub include_builtins: bool,

    /// Keep imports of standard library modules as graph nodes.
    pub include_stdlib: bool,

    /// Skip dot-prefixed files and directories.
    pub skip_hidden: bool,

    /// Skip paths matched by `.gitignore` files.
    pub respect_gitignore: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
            include_builtins: false,
            include_stdlib: false,
            skip_hidden: false,
            respect_gitignore: false,
        }
    }
}

impl GraphConfig {
    /// Whether a path carries one of the recognized extensions.
    pub fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

/// Docstring lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocstringConfig {
    /// One of "first-match", "strict" or "all".
    pub resolution: String,
}

impl Default for DocstringConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION.to_string(),
        }
    }
}

impl DocstringConfig {
    /// Parse the configured resolution strategy.
    pub fn strategy(&self) -> Result<ResolutionStrategy, ConfigError> {
        self.resolution.parse().map_err(ConfigError::Invalid)
    }
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SurrealDB endpoint: `mem://`, `rocksdb://path`, `ws://host:port`.
    pub url: String,

    /// Namespace to select after connecting.
    pub namespace: String,

    /// Database to select after connecting.
    pub database: String,

    /// Table holding one record per stored graph.
    pub table: String,

    /// Root username for remote servers.
    pub username: Option<String>,

    /// Root password for remote servers.
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STORE_URL.to_string(),
            namespace: DEFAULT_STORE_NAMESPACE.to_string(),
            database: DEFAULT_STORE_DATABASE.to_string(),
            table: DEFAULT_STORE_TABLE.to_string(),
            username: None,
            password: None,
        }
    }
}

impl StoreConfig {
    /// An in-memory store, mostly for tests.
    pub fn in_memory() -> Self {
        Self {
            url: "mem://".to_string(),
            ..Default::default()
        }
    }
}

/// Embedding index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Store embeddings when graphs are stored.
    pub enabled: bool,

    /// Table holding node and edge embeddings.
    pub table: String,

    /// Embedding model name.
    pub model: String,

    /// Number of hits returned by default.
    pub top_k: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            table: DEFAULT_VECTOR_TABLE.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    /// Provider name: "openai", "azure" or "ollama".
    pub provider: String,

    /// Model name (provider-specific).
    pub model: Option<String>,

    /// Base URL for the API. For Azure, the resource endpoint.
    pub base_url: Option<String>,

    /// API key.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Azure deployment name.
    pub deployment: Option<String>,

    /// Azure API version.
    pub api_version: String,

    /// Maximum tokens for explanations.
    pub max_tokens: u32,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_LLM_PROVIDER.to_string(),
            model: None,
            base_url: None,
            api_key: None,
            deployment: None,
            api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl LLMConfig {
    /// Get the model name, falling back to provider defaults.
    pub fn model_or_default(&self) -> String {
        self.model.clone().unwrap_or_else(|| match self.provider.as_str() {
            "ollama" => DEFAULT_OLLAMA_MODEL.to_string(),
            "azure" => self.deployment_or_default(),
            _ => DEFAULT_OPENAI_MODEL.to_string(),
        })
    }

    /// Get the base URL, falling back to provider defaults.
    pub fn base_url_or_default(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| match self.provider.as_str() {
            "ollama" => DEFAULT_OLLAMA_URL.to_string(),
            _ => DEFAULT_OPENAI_URL.to_string(),
        })
    }

    /// Get the Azure deployment, falling back to the default.
    pub fn deployment_or_default(&self) -> String {
        self.deployment
            .clone()
            .unwrap_or_else(|| DEFAULT_AZURE_DEPLOYMENT.to_string())
    }

    /// Whether enough is configured to reach a hosted provider.
    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "ollama" => true,
            "azure" => self.base_url.is_some() && self.api_key.is_some(),
            _ => self.api_key.is_some() || self.base_url.is_some(),
        }
    }
}

/// Batch summarization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Maximum words per summary.
    pub max_words: usize,

    /// Maximum tokens requested per summary.
    pub max_tokens: u32,

    /// Requests in flight at once.
    pub concurrency: usize,

    /// Retries after a rate limit response.
    pub max_retries: u32,

    /// Backoff base in seconds; attempt `n` waits `backoff_factor^n`.
    pub backoff_factor: f64,

    /// Minimum interval between API calls.
    pub min_interval_ms: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_SUMMARY_MAX_WORDS,
            max_tokens: DEFAULT_SUMMARY_MAX_TOKENS,
            concurrency: DEFAULT_SUMMARY_CONCURRENCY,
            max_retries: DEFAULT_SUMMARY_MAX_RETRIES,
            backoff_factor: DEFAULT_SUMMARY_BACKOFF_FACTOR,
            min_interval_ms: DEFAULT_SUMMARY_MIN_INTERVAL_MS,
        }
    }
}

/// Live view settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeSettings {
    /// Port to listen on.
    pub port: u16,

    /// Open the browser when the server starts.
    pub open_browser: bool,

    /// Debounce window for file change events.
    pub debounce_ms: u64,
}

impl Default for ServeSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVE_PORT,
            open_browser: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.url, DEFAULT_STORE_URL);
        assert_eq!(config.llm.provider, DEFAULT_LLM_PROVIDER);
        assert_eq!(config.summary.max_words, DEFAULT_SUMMARY_MAX_WORDS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[graph]"));
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[summary]"));
        assert!(!toml_str.contains("api_key"));
    }

    #[test]
    fn test_identifier_check() {
        assert!(is_identifier("graph"));
        assert!(is_identifier("_graphs2"));
        assert!(!is_identifier("2graphs"));
        assert!(!is_identifier("graph; DELETE"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_model_or_default() {
        let mut config = LLMConfig {
            provider: "ollama".to_string(),
            ..Default::default()
        };
        assert_eq!(config.model_or_default(), DEFAULT_OLLAMA_MODEL);

        config.provider = "azure".to_string();
        assert_eq!(config.model_or_default(), DEFAULT_AZURE_DEPLOYMENT);

        config.provider = "openai".to_string();
        assert_eq!(config.model_or_default(), DEFAULT_OPENAI_MODEL);

        config.model = Some("custom-model".to_string());
        assert_eq!(config.model_or_default(), "custom-model");
    }

    #[test]
    fn test_is_source() {
        let graph = GraphConfig::default();
        assert!(graph.is_source(Path::new("pkg/mod.py")));
        assert!(!graph.is_source(Path::new("stubs.pyi")));
        assert!(graph.is_source(Path::new("LEGACY.PY")));
        assert!(!graph.is_source(Path::new("README.md")));
        assert!(!graph.is_source(Path::new("Makefile")));
    }
}
