use std::collections::HashMap;

use codegraph_core::config::{
    DEFAULT_SERVE_PORT, DEFAULT_STORE_TABLE, DEFAULT_SUMMARY_CONCURRENCY, DEFAULT_VECTOR_TABLE,
};
use codegraph_core::{Config, ConfigError, ResolutionStrategy};
use tempfile::TempDir;

#[test]
fn test_config_from_toml() {
    let toml_str = r#"
[graph]
include_builtins = true
exclude_dirs = ["vendor"]

[docstrings]
resolution = "strict"

[store]
url = "mem://"
table = "graphs"

[summary]
max_words = 12
concurrency = 2

[serve]
port = 9000
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert!(config.graph.include_builtins);
    assert!(!config.graph.include_stdlib);
    assert_eq!(config.graph.exclude_dirs, vec!["vendor".to_string()]);
    assert_eq!(config.docstrings.strategy().unwrap(), ResolutionStrategy::Strict);
    assert_eq!(config.store.url, "mem://");
    assert_eq!(config.store.table, "graphs");
    assert_eq!(config.summary.max_words, 12);
    assert_eq!(config.summary.concurrency, 2);
    assert_eq!(config.serve.port, 9000);
    // Untouched sections keep their defaults.
    assert_eq!(config.vector.table, DEFAULT_VECTOR_TABLE);
    assert!(config.serve.open_browser);
}

#[test]
fn test_empty_file_is_default() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config.store.table, DEFAULT_STORE_TABLE);
    assert_eq!(config.summary.concurrency, DEFAULT_SUMMARY_CONCURRENCY);
    assert_eq!(config.serve.port, DEFAULT_SERVE_PORT);
}

#[test]
fn test_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("codegraph.toml");
    std::fs::write(&path, "[vector]\nenabled = true\ntable = \"embeddings\"\n").unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.vector.table, "embeddings");
}

#[test]
fn test_from_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = Config::from_file(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadError(_)));
    assert!(err.severity().is_fatal());
}

#[test]
fn test_from_malformed_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("codegraph.toml");
    std::fs::write(&path, "[store\nurl = ").unwrap();
    assert!(matches!(Config::from_file(&path), Err(ConfigError::ParseError(_))));
}

#[test]
fn test_validate_rejects_bad_tables() {
    let mut config = Config::default();
    config.store.table = "graph; REMOVE TABLE x".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let mut config = Config::default();
    config.vector.table = config.store.table.clone();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.docstrings.resolution = "last-match".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_bad_backoff() {
    for factor in [f64::NAN, f64::INFINITY, -1.5] {
        let mut config = Config::default();
        config.summary.backoff_factor = factor;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))), "{}", factor);
    }

    let mut config = Config::default();
    config.summary.backoff_factor = 0.0;
    assert!(config.validate().is_ok());
}

#[test]
fn test_overrides() {
    let env: HashMap<&str, &str> = [
        ("CODEGRAPH_STORE_URL", "ws://db:8000"),
        ("CODEGRAPH_STORE_USERNAME", "root"),
        ("CODEGRAPH_STORE_PASSWORD", "secret"),
        ("CODEGRAPH_VECTOR_ENABLED", "true"),
        ("CODEGRAPH_EMBEDDING_MODEL", "bge-small-en-v1.5"),
        ("CODEGRAPH_LLM_MODEL", "gpt-4o-mini"),
    ]
    .into_iter()
    .collect();

    let mut config = Config::default();
    config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

    assert_eq!(config.store.url, "ws://db:8000");
    assert_eq!(config.store.username.as_deref(), Some("root"));
    assert_eq!(config.store.password.as_deref(), Some("secret"));
    assert!(config.vector.enabled);
    assert_eq!(config.vector.model, "bge-small-en-v1.5");
    assert_eq!(config.llm.model.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(config.llm.provider, "openai");
}

#[test]
fn test_azure_variables_select_azure() {
    let env: HashMap<&str, &str> = [
        ("AZURE_OPENAI_ENDPOINT", "https://res.openai.azure.com"),
        ("AZURE_OPENAI_API_KEY", "k"),
        ("AZURE_OPENAI_DEPLOYMENT", "summaries"),
    ]
    .into_iter()
    .collect();

    let mut config = Config::default();
    config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

    assert_eq!(config.llm.provider, "azure");
    assert_eq!(config.llm.base_url.as_deref(), Some("https://res.openai.azure.com"));
    assert_eq!(config.llm.deployment.as_deref(), Some("summaries"));
    assert!(config.llm.is_configured());
    assert_eq!(config.llm.model_or_default(), "summaries");
}

#[test]
fn test_unconfigured_llm() {
    let config = Config::default();
    assert!(!config.llm.is_configured());
}
