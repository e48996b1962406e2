mod mcp;
mod render;
mod serve;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser};
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use codegraph_core::config::{DEFAULT_EXPLAIN_TEMPERATURE, DEFAULT_SUMMARY_TEMPERATURE};
use codegraph_core::llm::{GenerationParams, Provider, RetryPolicy};
use codegraph_core::search::{FastEmbedder, SearchExplainer};
use codegraph_core::store::GraphSummary;
use codegraph_core::summarize::LlmSummarizer;
use codegraph_core::{BuildOptions, CodeGraph, CodeGraphBuilder, Config, GraphStore, Layout, Relation};

use render::{DrawOptions, View};

#[derive(Parser, Debug)]
#[command(name = "codegraph", version)]
#[command(about = "Generate, store and search a knowledge graph of Python code", long_about = None)]
struct Cli {
    /// Directory to parse
    #[arg(default_value = ".")]
    directory: PathBuf,

    // Visualization options
    /// Use interactive visualization (default)
    #[arg(short, long, conflicts_with = "static_view", help_heading = "Visualization Options")]
    interactive: bool,

    /// Use static visualization
    #[arg(short = 's', long = "static", help_heading = "Visualization Options")]
    static_view: bool,

    /// Layout: hierarchical, circular, spring or kamada-kawai
    #[arg(short, long, default_value = "hierarchical", help_heading = "Visualization Options")]
    layout: Layout,

    /// Keep only these relations: contains, imports, calls
    #[arg(short, long, num_args = 1.., help_heading = "Visualization Options")]
    filter: Vec<Relation>,

    /// Save visualization to file
    #[arg(short, long, help_heading = "Visualization Options")]
    output: Option<PathBuf>,

    // Graph content options
    /// Include built-in functions in the graph (default: excluded)
    #[arg(long, help_heading = "Graph Content Options")]
    include_builtins: bool,

    /// Include standard library modules in the graph (default: excluded)
    #[arg(long, help_heading = "Graph Content Options")]
    include_stdlib: bool,

    // Database options
    /// Store the graph in the database
    #[arg(long, help_heading = "Database Options")]
    store_db: bool,

    /// Project name for the stored graph (default: directory name)
    #[arg(long, help_heading = "Database Options")]
    project_name: Option<String>,

    /// List stored graphs and exit
    #[arg(long, help_heading = "Database Options")]
    list_graphs: bool,

    /// Print a stored graph and exit
    #[arg(long, value_name = "ID", help_heading = "Database Options")]
    show_graph: Option<String>,

    /// Delete a stored graph and exit
    #[arg(long, value_name = "ID", help_heading = "Database Options")]
    delete_graph: Option<String>,

    // Search options
    /// Semantic search over stored graphs and exit
    #[arg(long, value_name = "QUERY", help_heading = "Search Options")]
    search: Option<String>,

    /// Number of search results
    #[arg(long, default_value_t = 5, help_heading = "Search Options")]
    top_k: usize,

    /// Explain search results with the configured LLM
    #[arg(long, requires = "search", help_heading = "Search Options")]
    explain: bool,

    // Live view options
    /// Serve a live view that rebuilds when sources change
    #[arg(long, help_heading = "Live View Options")]
    watch: bool,

    /// Port for the live view
    #[arg(long, help_heading = "Live View Options")]
    port: Option<u16>,

    /// Do not open a browser
    #[arg(long)]
    no_open: bool,

    /// Serve the graph tools to an MCP client over stdio
    #[arg(long, conflicts_with_all = ["watch", "store_db"])]
    mcp: bool,

    /// Configuration file (default: ./codegraph.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn is_database_only(&self) -> bool {
        self.list_graphs || self.show_graph.is_some() || self.delete_graph.is_some() || self.search.is_some()
    }

    fn view(&self) -> View {
        if self.static_view {
            View::Static
        } else {
            View::Interactive
        }
    }

    fn project_name(&self) -> String {
        self.project_name.clone().unwrap_or_else(|| project_name_of(&self.directory))
    }

    /// Fold command-line switches into the loaded configuration.
    fn apply(&self, config: &mut Config) {
        config.graph.include_builtins |= self.include_builtins;
        config.graph.include_stdlib |= self.include_stdlib;
        if let Some(port) = self.port {
            config.serve.port = port;
        }
        if self.no_open {
            config.serve.open_browser = false;
        }
    }
}

/// Base name of `directory`, resolving `.` and `..` first.
fn project_name_of(directory: &Path) -> String {
    let resolved = directory.canonicalize().unwrap_or_else(|_| directory.to_path_buf());
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path).wrap_err_with(|| format!("Failed to load {}", path.display()))?,
        None => Config::load()?,
    };
    cli.apply(&mut config);

    if cli.mcp {
        return mcp::run(config).await;
    }

    if cli.is_database_only() {
        return run_database(&cli, &config).await;
    }

    if !cli.directory.is_dir() {
        bail!("Directory not found: {}", cli.directory.display());
    }

    println!("Parsing directory: {}", cli.directory.display());
    let graph = build_graph(&cli.directory, &config)?;

    if cli.store_db {
        store(&cli, &config, &graph).await?;
    }

    let relations = cli.filter.clone();
    if cli.watch {
        let state = Arc::new(serve::AppState::new(graph, cli.project_name(), cli.layout, relations));
        let serve_config = serve::ServeConfig {
            port: config.serve.port,
            open_browser: config.serve.open_browser,
            project_path: cli.directory.clone(),
            graph: config.graph.clone(),
            options: BuildOptions::from(&config.graph),
            debounce: Duration::from_millis(config.serve.debounce_ms),
        };
        return serve::start_server(serve_config, state).await;
    }

    let view = cli.view();
    println!(
        "Generating {} visualization with {} layout...",
        if view == View::Interactive { "interactive" } else { "static" },
        cli.layout
    );
    render::draw_graph(
        &graph,
        &DrawOptions {
            view,
            layout: cli.layout,
            relations: &relations,
            output: cli.output.as_deref(),
            project_name: &cli.project_name(),
            open_browser: config.serve.open_browser,
        },
    )?;

    println!("Done!");
    Ok(())
}

fn build_graph(directory: &Path, config: &Config) -> Result<CodeGraph> {
    let pb = spinner("Building graph...")?;
    let mut builder = CodeGraphBuilder::with_config(directory, BuildOptions::from(&config.graph), config.graph.clone());
    let (graph, stats) = builder.build();
    pb.finish_and_clear();

    println!(
        "Built graph: {} nodes, {} edges from {} files{}",
        graph.node_count(),
        graph.edge_count(),
        stats.files_parsed,
        if stats.files_skipped > 0 {
            format!(" ({} skipped)", stats.files_skipped)
        } else {
            String::new()
        }
    );
    Ok(graph)
}

/// Open the store with the configured summarizer, and with the vector index
/// when embeddings are enabled or `vectors` is set.
async fn connect(config: &Config, vectors: bool) -> Result<GraphStore> {
    let mut store = GraphStore::connect(config).await?;

    if config.llm.is_configured() {
        let llm = Provider::from_config(&config.llm).build_with(GenerationParams {
            max_tokens: config.summary.max_tokens,
            temperature: Some(DEFAULT_SUMMARY_TEMPERATURE),
        })?;
        store = store.with_summarizer(Box::new(LlmSummarizer::new(llm, &config.summary)));
    }

    if vectors || config.vector.enabled {
        let pb = spinner(&format!("Loading embedding model {}...", config.vector.model))?;
        let embedder = FastEmbedder::from_name(&config.vector.model);
        pb.finish_and_clear();
        store.attach_vectors(&config.vector.table, Box::new(embedder?)).await?;
    }

    Ok(store)
}

async fn store(cli: &Cli, config: &Config, graph: &CodeGraph) -> Result<()> {
    let mut db = connect(config, false).await?;
    let project_name = cli.project_name();

    let pb = spinner("Storing graph...")?;
    let result = db.store_graph(graph, &project_name, Some(&cli.directory)).await;
    pb.finish_and_clear();
    db.close();

    let graph_id = result?;
    println!("Graph stored with ID: {}", graph_id);
    Ok(())
}

async fn run_database(cli: &Cli, config: &Config) -> Result<()> {
    let mut db = connect(config, cli.search.is_some()).await?;
    let result = database_operation(cli, config, &db).await;
    db.close();
    result
}

async fn database_operation(cli: &Cli, config: &Config, db: &GraphStore) -> Result<()> {
    if cli.list_graphs {
        let graphs = db.list_graphs().await?;
        if graphs.is_empty() {
            println!("No graphs stored.");
        }
        for graph in &graphs {
            print_summary(graph);
        }
    }

    if let Some(id) = &cli.show_graph {
        match db.get_graph_metadata(id).await? {
            Some(graph) => println!("{}", serde_json::to_string_pretty(&graph)?),
            None => println!("No graph found with ID: {}", id),
        }
    }

    if let Some(id) = &cli.delete_graph {
        if db.delete_graph(id).await? {
            println!("Deleted graph: {}", id);
        } else {
            println!("No graph found with ID: {}", id);
        }
    }

    if let Some(query) = &cli.search {
        let hits = db.search_by_text(query, cli.top_k, None).await?;
        if hits.is_empty() {
            println!("No results found for: {}", query);
            return Ok(());
        }

        if cli.explain {
            let explainer = explainer(config)?;
            let pb = spinner("Explaining results...")?;
            let text = explainer.explain(query, &hits).await;
            pb.finish_and_clear();
            println!("{}", text);
        } else {
            print!("{}", SearchExplainer::fallback(query, &hits));
        }
    }

    Ok(())
}

fn explainer(config: &Config) -> Result<SearchExplainer> {
    if !config.llm.is_configured() {
        tracing::warn!("No LLM configured, listing results instead");
        return Ok(SearchExplainer::offline());
    }
    let llm = Provider::from_config(&config.llm).build_with(GenerationParams {
        max_tokens: config.llm.max_tokens,
        temperature: Some(DEFAULT_EXPLAIN_TEMPERATURE),
    })?;
    Ok(SearchExplainer::new(llm, RetryPolicy::from(&config.summary)))
}

fn print_summary(graph: &GraphSummary) {
    let created = chrono::DateTime::parse_from_rfc3339(&graph.timestamp)
        .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| graph.timestamp.clone());

    println!("ID: {}", graph.graph_id);
    println!("Project: {}", graph.project_name);
    println!("Nodes: {}, Edges: {}", graph.node_count, graph.edge_count);
    println!("Created: {}", created);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["codegraph"]).unwrap();
        assert_eq!(cli.directory, PathBuf::from("."));
        assert_eq!(cli.layout, Layout::Hierarchical);
        assert_eq!(cli.top_k, 5);
        assert_eq!(cli.view(), View::Interactive);
        assert!(cli.filter.is_empty());
        assert!(!cli.is_database_only());
        assert!(!cli.mcp);
    }

    #[test]
    fn test_mcp_flag() {
        let cli = Cli::try_parse_from(["codegraph", "--mcp", "--include-stdlib"]).unwrap();
        assert!(cli.mcp);
        assert!(cli.include_stdlib);
        assert!(Cli::try_parse_from(["codegraph", "--mcp", "--watch"]).is_err());
    }

    #[test]
    fn test_visualization_flags() {
        let cli = Cli::try_parse_from([
            "codegraph", "proj", "-s", "-l", "kamada-kawai", "-f", "calls", "imports", "-o", "out.svg",
        ])
        .unwrap();
        assert_eq!(cli.view(), View::Static);
        assert_eq!(cli.layout, Layout::KamadaKawai);
        assert_eq!(cli.filter, vec![Relation::Calls, Relation::Imports]);
        assert_eq!(cli.output.as_deref(), Some(Path::new("out.svg")));
        assert_eq!(cli.directory, PathBuf::from("proj"));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Cli::try_parse_from(["codegraph", "-f", "inherits"]).is_err());
        assert!(Cli::try_parse_from(["codegraph", "-l", "radial"]).is_err());
        assert!(Cli::try_parse_from(["codegraph", "-i", "-s"]).is_err());
        assert!(Cli::try_parse_from(["codegraph", "--explain"]).is_err());
    }

    #[test]
    fn test_database_operations() {
        let cli = Cli::try_parse_from(["codegraph", "--search", "delete user", "--top-k", "3", "--explain"]).unwrap();
        assert!(cli.is_database_only());
        assert_eq!(cli.top_k, 3);

        let cli = Cli::try_parse_from(["codegraph", "--delete-graph", "abc"]).unwrap();
        assert_eq!(cli.delete_graph.as_deref(), Some("abc"));
        assert!(cli.is_database_only());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from(["codegraph", "--include-builtins", "--port", "4000", "--no-open"]).unwrap();
        let mut config = Config::default();
        cli.apply(&mut config);
        assert!(config.graph.include_builtins);
        assert!(!config.graph.include_stdlib);
        assert_eq!(config.serve.port, 4000);
        assert!(!config.serve.open_browser);
    }

    #[test]
    fn test_project_name_defaults_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("my-app");
        std::fs::create_dir(&project).unwrap();
        assert_eq!(project_name_of(&project), "my-app");

        let cli = Cli::try_parse_from(["codegraph", "x", "--project-name", "named"]).unwrap();
        assert_eq!(cli.project_name(), "named");
    }
}
