//! Default values for codegraph configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Graph Defaults
// ============================================================================

/// Source file extensions recognized as Python modules.
pub const DEFAULT_EXTENSIONS: &[&str] = &["py"];

/// Directories skipped while walking a project. Only bytecode caches: every
/// other directory under the root is visited.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &["__pycache__"];

/// Broader exclusions for `graph.exclude_dirs` when a project keeps
/// environments or build output next to its sources. Not applied by default.
pub const COMMON_EXCLUDE_DIRS: &[&str] = &[
    // Version control
    ".git",
    ".svn",
    ".hg",
    // Virtual environments and caches
    "venv",
    ".venv",
    "env",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".tox",
    "node_modules",
    // Build outputs
    "build",
    "dist",
    // codegraph's own data
    ".codegraph",
];

// ============================================================================
// Docstring Defaults
// ============================================================================

/// Placeholder recorded for functions without a docstring.
pub const NO_DOCSTRING_PLACEHOLDER: &str = "No docstring available.";

/// Default name resolution strategy for docstring lookups.
pub const DEFAULT_RESOLUTION: &str = "first-match";

// ============================================================================
// Store Defaults
// ============================================================================

/// Default document store URL (embedded RocksDB under the project).
pub const DEFAULT_STORE_URL: &str = "rocksdb://.codegraph/store";

/// Default SurrealDB namespace.
pub const DEFAULT_STORE_NAMESPACE: &str = "codegraph";

/// Default SurrealDB database.
pub const DEFAULT_STORE_DATABASE: &str = "graphs";

/// Default table for stored graph metadata.
pub const DEFAULT_STORE_TABLE: &str = "graph";

/// Description given to nodes that were not summarized.
pub const DEFAULT_NODE_DESCRIPTION: &str = "";

// ============================================================================
// Vector Defaults
// ============================================================================

/// Default table for node and edge embeddings.
pub const DEFAULT_VECTOR_TABLE: &str = "node_vector";

/// Default fastembed model name.
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

/// Default number of search results.
pub const DEFAULT_TOP_K: usize = 5;

// ============================================================================
// LLM Defaults
// ============================================================================

/// Default LLM provider.
pub const DEFAULT_LLM_PROVIDER: &str = "openai";

/// Default max tokens for explanations.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

// OpenAI defaults
/// Default OpenAI API URL.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
/// Default OpenAI model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

// Azure OpenAI defaults
/// Default Azure OpenAI deployment.
pub const DEFAULT_AZURE_DEPLOYMENT: &str = "gpt-4o";
/// Default Azure OpenAI API version.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-15-preview";

// Ollama defaults
/// Default Ollama API URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/v1";
/// Default Ollama model.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";

// ============================================================================
// Summary Defaults
// ============================================================================

/// Maximum words per generated summary.
pub const DEFAULT_SUMMARY_MAX_WORDS: usize = 30;

/// Maximum tokens requested per summary.
pub const DEFAULT_SUMMARY_MAX_TOKENS: u32 = 100;

/// Sampling temperature for summaries.
pub const DEFAULT_SUMMARY_TEMPERATURE: f32 = 0.3;

/// Sampling temperature for search explanations.
pub const DEFAULT_EXPLAIN_TEMPERATURE: f32 = 0.5;

/// Number of summary requests in flight at once.
pub const DEFAULT_SUMMARY_CONCURRENCY: usize = 4;

/// Retries after a rate-limited summary request.
pub const DEFAULT_SUMMARY_MAX_RETRIES: u32 = 5;

/// Exponential backoff base, in seconds.
pub const DEFAULT_SUMMARY_BACKOFF_FACTOR: f64 = 1.5;

/// Longest single wait between retries, in seconds.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

/// Minimum interval between two summary API calls.
pub const DEFAULT_SUMMARY_MIN_INTERVAL_MS: u64 = 2000;

/// Character cap for heuristic summaries.
pub const DEFAULT_FALLBACK_MAX_CHARS: usize = 100;

// ============================================================================
// Serve Defaults
// ============================================================================

/// Default port for the live view.
pub const DEFAULT_SERVE_PORT: u16 = 3333;

/// Debounce window for file change events.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

// ============================================================================
// System Prompts
// ============================================================================

/// System prompt for function summaries. `{max_words}` is substituted.
pub const DEFAULT_SUMMARY_SYSTEM_PROMPT: &str = "You are a code documentation assistant. \
Read the following function docstring and generate a clear, concise summary. Your summary should explain:\n\
- What the function does.\n\
- The purpose of each parameter.\n\
- What is returned by the function.\n\
- Any exceptions that might be raised.\n\
Just make sure your response is under {max_words} words.";

/// User prompt for function summaries. `{max_words}` and `{docstring}` are substituted.
pub const DEFAULT_SUMMARY_USER_PROMPT: &str = "Summarize this docstring in {max_words} words:\n\n{docstring}";

/// System prompt for explaining search results.
pub const DEFAULT_EXPLAIN_SYSTEM_PROMPT: &str = "You are a code search assistant that explains search results in a clear, concise manner. \
Your task is to explain how the search results relate to the user's query, highlighting the most relevant information. \
Focus on explaining the purpose and functionality of the code elements found, and how they might be useful to the user. \
Provide a single cohesive explanation rather than describing each result separately.";
