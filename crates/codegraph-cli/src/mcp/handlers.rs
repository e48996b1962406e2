//! Method dispatch and the code graph tools.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tokio::sync::OnceCell;

use codegraph_core::config::NO_DOCSTRING_PLACEHOLDER;
use codegraph_core::docstrings::{extract_from_directory_with, is_not_found_message};
use codegraph_core::{
    find_docstring, BuildOptions, CodeGraph, CodeGraphBuilder, Config, GraphStore, Layout,
    NodeKind, Relation,
};

use super::protocol::*;
use crate::project_name_of;
use crate::render::html;

const GRAPH_SCHEME: &str = "graph://";
const TOP_ENTRIES: usize = 5;

/// Answers MCP requests. The store is opened on first use.
pub struct McpHandler {
    config: Config,
    store: OnceCell<GraphStore>,
}

impl McpHandler {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: OnceCell::new(),
        }
    }

    /// Close the store if a tool opened it.
    pub fn shutdown(self) {
        if let Some(mut store) = self.store.into_inner() {
            store.close();
        }
    }

    /// Handle one message. Notifications get no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        tracing::debug!(method = %request.method, "MCP request received");

        let Some(id) = request.id else {
            tracing::debug!(method = %request.method, "MCP notification");
            return None;
        };

        let result = match request.method.as_str() {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tools() })),
            "tools/call" => self.call_tool(request.params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "resources/templates/list" => Ok(json!({ "resourceTemplates": resource_templates() })),
            "resources/read" => self.read_resource(request.params).await,
            "prompts/list" => Ok(json!({ "prompts": prompts() })),
            "prompts/get" => get_prompt(request.params),
            other => {
                tracing::warn!(method = %other, "Unknown MCP method");
                Err(JsonRpcError::method_not_found(other))
            }
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": { "subscribe": false, "listChanged": false },
                "prompts": { "listChanged": false },
            },
            "serverInfo": {
                "name": "codegraph",
                "version": env!("CARGO_PKG_VERSION"),
            },
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = parse_params(params)?;
        let args = &params.arguments;
        tracing::info!(tool = %params.name, "MCP tool call");

        let result = match params.name.as_str() {
            "parse_code_directory" => self.parse_code_directory(args).await,
            "visualize_code_graph_and_save" => self.visualize(args).await,
            "store_code_graph" => self.store_code_graph(args).await,
            "list_stored_graphs" => self.list_stored_graphs().await,
            "delete_graph" => self.delete_graph(args).await,
            other => return Err(JsonRpcError::invalid_params(format!("Unknown tool: {}", other))),
        };

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    async fn parse_code_directory(&self, args: &Map<String, Value>) -> CallToolResult {
        let directory = match directory_arg(args, "directory_path") {
            Ok(d) => d,
            Err(message) => return CallToolResult::error(message),
        };
        let graph = match self.build(&directory, build_options(args)).await {
            Ok(g) => g,
            Err(message) => return CallToolResult::error(message),
        };

        CallToolResult::text(
            json!({
                "status": "success",
                "directory": directory.display().to_string(),
                "node_count": graph.node_count(),
                "edge_count": graph.edge_count(),
                "file_count": graph.count_kind(NodeKind::File),
                "function_count": graph.count_kind(NodeKind::Function),
                "graph_available": true,
            })
            .to_string(),
        )
    }

    async fn visualize(&self, args: &Map<String, Value>) -> CallToolResult {
        let directory = match directory_arg(args, "directory_path") {
            Ok(d) => d,
            Err(message) => return CallToolResult::error(message),
        };
        let Some(output) = string_arg(args, "output_path") else {
            return CallToolResult::error("Error: 'output_path' is required.");
        };
        let layout = match string_arg(args, "layout_type").map(|s| s.parse::<Layout>()).transpose() {
            Ok(layout) => layout.unwrap_or_default(),
            Err(message) => return CallToolResult::error(format!("Error: {}.", message)),
        };
        // Unknown relation names are dropped.
        let relations: Vec<Relation> = args
            .get("filter_relations")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(|n| n.as_str()?.parse().ok()).collect())
            .unwrap_or_default();

        let graph = match self.build(&directory, build_options(args)).await {
            Ok(g) => g,
            Err(message) => return CallToolResult::error(message),
        };
        let display = graph.display_graph(Some(&relations));

        let written = html::render_html(&display, layout, &project_name_of(&directory))
            .map_err(|e| e.to_string())
            .and_then(|page| std::fs::write(&output, page).map_err(|e| e.to_string()));
        if let Err(e) = written {
            return CallToolResult::error(
                json!({ "status": "error", "message": format!("Failed to save visualization: {}", e) }).to_string(),
            );
        }

        CallToolResult::text(
            json!({
                "status": "success",
                "message": format!("Generated HTML visualization saved to {}", output),
                "node_count": display.node_count(),
                "edge_count": display.edge_count(),
                "file_count": display.count_kind(NodeKind::File),
                "function_count": display.count_kind(NodeKind::Function),
            })
            .to_string(),
        )
    }

    async fn store_code_graph(&self, args: &Map<String, Value>) -> CallToolResult {
        let directory = match directory_arg(args, "directory_path") {
            Ok(d) => d,
            Err(message) => return CallToolResult::error(message),
        };
        let project_name = string_arg(args, "project_name")
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| project_name_of(&directory));
        let skip_summaries = bool_arg(args, "skip_summaries", true);

        let graph = match self.build(&directory, BuildOptions::from(&self.config.graph)).await {
            Ok(g) => g,
            Err(message) => return CallToolResult::error(message),
        };

        // Without a directory the store skips docstrings, summaries and vectors.
        let source = (!skip_summaries).then_some(directory.as_path());
        let stored = match self.store().await {
            Ok(store) => store.store_graph(&graph, &project_name, source).await.map_err(|e| e.to_string()),
            Err(e) => Err(e),
        };

        match stored {
            Ok(graph_id) => {
                let mut body = json!({
                    "status": "success",
                    "message": format!("Graph stored with ID: {}", graph_id),
                    "graph_id": graph_id,
                    "project_name": project_name,
                });
                if skip_summaries {
                    body["note"] = json!("Summaries were skipped. Node descriptions hold the default text.");
                }
                CallToolResult::text(body.to_string())
            }
            Err(e) => CallToolResult::error(
                json!({ "status": "error", "message": format!("Failed to store graph: {}", e) }).to_string(),
            ),
        }
    }

    async fn list_stored_graphs(&self) -> CallToolResult {
        let listed = match self.store().await {
            Ok(store) => store.list_graphs().await.map_err(|e| e.to_string()),
            Err(e) => Err(e),
        };
        match listed {
            Ok(graphs) => CallToolResult::text(
                json!({ "status": "success", "count": graphs.len(), "graphs": graphs }).to_string(),
            ),
            Err(e) => CallToolResult::error(
                json!({ "status": "error", "message": format!("Failed to list graphs: {}", e) }).to_string(),
            ),
        }
    }

    async fn delete_graph(&self, args: &Map<String, Value>) -> CallToolResult {
        let Some(graph_id) = string_arg(args, "graph_id") else {
            return CallToolResult::error("Error: 'graph_id' is required.");
        };
        let deleted = match self.store().await {
            Ok(store) => store.delete_graph(&graph_id).await.map_err(|e| e.to_string()),
            Err(e) => Err(e),
        };
        match deleted {
            Ok(true) => CallToolResult::text(
                json!({ "status": "success", "message": format!("Graph {} deleted successfully.", graph_id) })
                    .to_string(),
            ),
            Ok(false) => CallToolResult::error(
                json!({ "status": "error", "message": format!("Failed to delete graph {}.", graph_id) }).to_string(),
            ),
            Err(e) => CallToolResult::error(
                json!({ "status": "error", "message": format!("Error deleting graph: {}", e) }).to_string(),
            ),
        }
    }

    async fn read_resource(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: ReadResourceParams = parse_params(params)?;
        let Some(directory) = params.uri.strip_prefix(GRAPH_SCHEME) else {
            return Err(JsonRpcError::invalid_params(format!("Unknown resource: {}", params.uri)));
        };
        let directory = PathBuf::from(directory);

        let text = if directory.is_dir() {
            let graph = self
                .build(&directory, BuildOptions::from(&self.config.graph))
                .await
                .map_err(JsonRpcError::internal_error)?;
            let root = directory.clone();
            let config = self.config.graph.clone();
            let docstrings = tokio::task::spawn_blocking(move || extract_from_directory_with(&root, &config))
                .await
                .map_err(|e| JsonRpcError::internal_error(e.to_string()))?;
            graph_summary(&directory, &graph, |name| {
                let doc = find_docstring(name, &docstrings);
                (!is_not_found_message(name, &doc) && doc != NO_DOCSTRING_PLACEHOLDER).then_some(doc)
            })
        } else {
            not_a_directory(&directory)
        };

        let content = ResourceContent {
            uri: params.uri,
            mime_type: "text/plain".to_string(),
            text,
        };
        Ok(json!({ "contents": [content] }))
    }

    async fn build(&self, directory: &Path, options: BuildOptions) -> Result<CodeGraph, String> {
        let root = directory.to_path_buf();
        let config = self.config.graph.clone();
        tokio::task::spawn_blocking(move || CodeGraphBuilder::with_config(root, options, config).parse_project())
            .await
            .map_err(|e| format!("Graph build failed: {}", e))
    }

    async fn store(&self) -> Result<&GraphStore, String> {
        self.store
            .get_or_try_init(|| crate::connect(&self.config, false))
            .await
            .map_err(|e| e.to_string())
    }
}

/// Text overview of a graph: counts, the files holding the most functions,
/// and the functions making the most calls.
pub fn graph_summary(directory: &Path, graph: &CodeGraph, docstring: impl Fn(&str) -> Option<String>) -> String {
    let mut contains: BTreeMap<&str, usize> = BTreeMap::new();
    let mut calls: BTreeMap<&str, usize> = BTreeMap::new();
    for view in graph.edges() {
        match view.edge.relation {
            Relation::Contains => *contains.entry(view.source.name.as_str()).or_default() += 1,
            Relation::Calls => *calls.entry(view.source.name.as_str()).or_default() += 1,
            Relation::Imports => {}
        }
    }

    let mut out = format!("Code Knowledge Graph Summary for {}\n\n", directory.display());
    out.push_str(&format!(
        "Total nodes: {} ({} files, {} functions)\n",
        graph.node_count(),
        graph.count_kind(NodeKind::File),
        graph.count_kind(NodeKind::Function)
    ));
    out.push_str(&format!(
        "Total edges: {} ({} contains, {} imports, {} calls)\n\n",
        graph.edge_count(),
        graph.count_relation(Relation::Contains),
        graph.count_relation(Relation::Imports),
        graph.count_relation(Relation::Calls)
    ));

    out.push_str("Top Files (by number of functions):\n");
    for (file, count) in top(contains) {
        out.push_str(&format!("- {}: {} functions\n", file, count));
    }

    out.push_str("\nTop Functions (by number of outgoing calls):\n");
    for (function, count) in top(calls) {
        let first_line = docstring(function).and_then(|d| d.lines().next().map(|l| l.trim().to_string()));
        match first_line {
            Some(line) if !line.is_empty() => out.push_str(&format!("- {}: {} calls - {}\n", function, count, line)),
            _ => out.push_str(&format!("- {}: {} calls\n", function, count)),
        }
    }
    out
}

/// Highest counts first; ties keep name order.
fn top(counts: BTreeMap<&str, usize>) -> Vec<(&str, usize)> {
    let mut entries: Vec<_> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(TOP_ENTRIES);
    entries
}

fn tools() -> Vec<Tool> {
    let directory = json!({ "type": "string", "description": "Path to the directory containing Python code" });
    let builtins = json!({ "type": "boolean", "default": false, "description": "Include calls to built-in functions" });
    let stdlib = json!({ "type": "boolean", "default": false, "description": "Include standard library imports" });

    vec![
        Tool {
            name: "parse_code_directory".to_string(),
            description: "Parse a directory of Python code and report the size of its knowledge graph.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "directory_path": directory,
                    "include_builtins": builtins,
                    "include_stdlib": stdlib,
                },
                "required": ["directory_path"],
            }),
        },
        Tool {
            name: "visualize_code_graph_and_save".to_string(),
            description: "Render an interactive HTML view of a code knowledge graph to a file.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "directory_path": directory,
                    "output_path": { "type": "string", "description": "Where to write the HTML page" },
                    "layout_type": {
                        "type": "string",
                        "enum": ["hierarchical", "circular", "spring", "kamada_kawai"],
                        "default": "hierarchical",
                    },
                    "filter_relations": {
                        "type": "array",
                        "items": { "type": "string", "enum": ["contains", "imports", "calls"] },
                    },
                    "include_builtins": builtins,
                    "include_stdlib": stdlib,
                },
                "required": ["directory_path", "output_path"],
            }),
        },
        Tool {
            name: "store_code_graph".to_string(),
            description: "Store a code knowledge graph in the database and return its id.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "directory_path": directory,
                    "project_name": { "type": "string", "description": "Defaults to the directory name" },
                    "skip_summaries": {
                        "type": "boolean",
                        "default": true,
                        "description": "Skip docstring summaries and embeddings",
                    },
                },
                "required": ["directory_path"],
            }),
        },
        Tool {
            name: "list_stored_graphs".to_string(),
            description: "List the code knowledge graphs stored in the database.".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        Tool {
            name: "delete_graph".to_string(),
            description: "Delete a stored code knowledge graph.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "graph_id": { "type": "string" } },
                "required": ["graph_id"],
            }),
        },
    ]
}

fn resource_templates() -> Vec<ResourceTemplate> {
    vec![ResourceTemplate {
        uri_template: format!("{}{{directory}}", GRAPH_SCHEME),
        name: "Code graph summary".to_string(),
        description: "Counts and most connected files and functions of a directory's code graph".to_string(),
        mime_type: "text/plain".to_string(),
    }]
}

fn prompts() -> Vec<Prompt> {
    vec![Prompt {
        name: "analyze_code_structure".to_string(),
        description: "Ask for an analysis of the code structure in a directory".to_string(),
        arguments: vec![PromptArgument {
            name: "directory".to_string(),
            description: "Path to the directory containing Python code".to_string(),
            required: true,
        }],
    }]
}

fn get_prompt(params: Option<Value>) -> Result<Value, JsonRpcError> {
    let params: GetPromptParams = parse_params(params)?;
    if params.name != "analyze_code_structure" {
        return Err(JsonRpcError::invalid_params(format!("Unknown prompt: {}", params.name)));
    }
    let Some(directory) = params.arguments.get("directory") else {
        return Err(JsonRpcError::invalid_params("Missing argument: directory"));
    };

    let text = format!(
        "I'd like you to analyze the code structure in the directory: {directory}\n\n\
         Please help me understand:\n\
         1. The high-level architecture of the codebase\n\
         2. Key functions and their relationships\n\
         3. File dependencies and import patterns\n\
         4. Any potential code organization issues or improvements\n\n\
         Use the code knowledge graph tools to visualize and explore the codebase.\n"
    );
    let message = PromptMessage {
        role: "user".to_string(),
        content: ToolContent::Text { text },
    };
    Ok(json!({
        "description": "Analyze the code structure of a Python project",
        "messages": [message],
    }))
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    serde_json::from_value(params.unwrap_or_else(|| json!({})))
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))
}

fn string_arg(args: &Map<String, Value>, key: &str) -> Option<String> {
    args.get(key).and_then(Value::as_str).map(str::to_string)
}

fn bool_arg(args: &Map<String, Value>, key: &str, default: bool) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn build_options(args: &Map<String, Value>) -> BuildOptions {
    BuildOptions {
        exclude_builtins: !bool_arg(args, "include_builtins", false),
        exclude_stdlib: !bool_arg(args, "include_stdlib", false),
    }
}

fn not_a_directory(directory: &Path) -> String {
    format!("Error: '{}' is not a valid directory.", directory.display())
}

fn directory_arg(args: &Map<String, Value>, key: &str) -> Result<PathBuf, String> {
    let Some(path) = string_arg(args, key) else {
        return Err(format!("Error: '{}' is required.", key));
    };
    let directory = PathBuf::from(path);
    if directory.is_dir() {
        Ok(directory)
    } else {
        Err(not_a_directory(&directory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::config::StoreConfig;
    use tempfile::TempDir;

    fn handler() -> McpHandler {
        McpHandler::new(Config {
            store: StoreConfig::in_memory(),
            ..Default::default()
        })
    }

    fn project() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("app.py"),
            "def load(path):\n    \"\"\"Load the settings file.\n\n    More detail.\n    \"\"\"\n    return parse(path)\n\n\ndef parse(text):\n    return text\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("cli.py"), "from app import load\n\n\ndef main():\n    load('x')\n").unwrap();
        dir
    }

    fn request(id: i64, method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params: Some(params),
            id: Some(JsonRpcId::Number(id)),
        }
    }

    async fn result(handler: &McpHandler, method: &str, params: Value) -> Value {
        let response = handler.handle_request(request(1, method, params)).await.unwrap();
        assert!(response.error.is_none(), "{:?}", response.error);
        response.result.unwrap()
    }

    async fn call(handler: &McpHandler, name: &str, arguments: Value) -> (Value, bool) {
        let result = result(handler, "tools/call", json!({ "name": name, "arguments": arguments })).await;
        let text = result["content"][0]["text"].as_str().unwrap().to_string();
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        (body, result["isError"].as_bool().unwrap())
    }

    #[tokio::test]
    async fn test_tools_list() {
        let result = result(&handler(), "tools/list", json!({})).await;
        let names: Vec<_> = result["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "parse_code_directory",
                "visualize_code_graph_and_save",
                "store_code_graph",
                "list_stored_graphs",
                "delete_graph",
            ]
        );
        assert_eq!(result["tools"][0]["inputSchema"]["required"], json!(["directory_path"]));
    }

    #[tokio::test]
    async fn test_parse_code_directory() {
        let dir = project();
        let (body, is_error) = call(
            &handler(),
            "parse_code_directory",
            json!({ "directory_path": dir.path().to_str().unwrap() }),
        )
        .await;

        assert!(!is_error);
        assert_eq!(body["status"], "success");
        assert_eq!(body["file_count"], 2);
        assert_eq!(body["function_count"], 3);
        assert_eq!(body["graph_available"], true);
    }

    #[tokio::test]
    async fn test_parse_rejects_missing_directory() {
        let (body, is_error) = call(
            &handler(),
            "parse_code_directory",
            json!({ "directory_path": "/no/such/dir" }),
        )
        .await;
        assert!(is_error);
        assert_eq!(body, Value::String("Error: '/no/such/dir' is not a valid directory.".to_string()));
    }

    #[tokio::test]
    async fn test_store_list_and_delete() {
        let dir = project();
        let handler = handler();
        let path = dir.path().to_str().unwrap();

        let (stored, is_error) = call(
            &handler,
            "store_code_graph",
            json!({ "directory_path": path, "project_name": "demo" }),
        )
        .await;
        assert!(!is_error);
        assert_eq!(stored["project_name"], "demo");
        assert!(stored["note"].is_string());
        let graph_id = stored["graph_id"].as_str().unwrap().to_string();

        let (listed, _) = call(&handler, "list_stored_graphs", json!({})).await;
        assert_eq!(listed["count"], 1);
        assert_eq!(listed["graphs"][0]["graph_id"], graph_id.as_str());

        let (deleted, is_error) = call(&handler, "delete_graph", json!({ "graph_id": graph_id })).await;
        assert!(!is_error);
        assert_eq!(deleted["status"], "success");

        let (again, is_error) = call(&handler, "delete_graph", json!({ "graph_id": graph_id })).await;
        assert!(is_error);
        assert_eq!(again["status"], "error");

        handler.shutdown();
    }

    #[tokio::test]
    async fn test_visualize_writes_page() {
        let dir = project();
        let out = dir.path().join("graph.html");
        let (body, is_error) = call(
            &handler(),
            "visualize_code_graph_and_save",
            json!({
                "directory_path": dir.path().to_str().unwrap(),
                "output_path": out.to_str().unwrap(),
                "layout_type": "circular",
                "filter_relations": ["calls", "inherits"],
            }),
        )
        .await;

        assert!(!is_error);
        assert_eq!(body["status"], "success");
        // Calls only: main -> load -> parse.
        assert_eq!(body["file_count"], 0);
        assert_eq!(body["function_count"], 3);
        assert!(std::fs::read_to_string(&out).unwrap().contains("\"layout\":\"circular\""));
    }

    #[tokio::test]
    async fn test_graph_resource_summary() {
        let dir = project();
        let uri = format!("graph://{}", dir.path().display());
        let result = result(&handler(), "resources/read", json!({ "uri": uri })).await;

        assert_eq!(result["contents"][0]["uri"], uri.as_str());
        let text = result["contents"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Code Knowledge Graph Summary for "));
        assert!(text.contains("Total nodes: 5 (2 files, 3 functions)"));
        assert!(text.contains("- app.py: 2 functions"));
        assert!(text.contains("- load: 1 calls - Load the settings file."));
        assert!(text.contains("- main: 1 calls\n"));
    }

    #[tokio::test]
    async fn test_prompt_names_directory() {
        let result = result(
            &handler(),
            "prompts/get",
            json!({ "name": "analyze_code_structure", "arguments": { "directory": "/src/app" } }),
        )
        .await;
        let text = result["messages"][0]["content"]["text"].as_str().unwrap();
        assert!(text.contains("in the directory: /src/app"));
        assert_eq!(result["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_unknown_method_and_notifications() {
        let handler = handler();
        let response = handler.handle_request(request(7, "sampling/create", json!({}))).await.unwrap();
        assert_eq!(response.id, JsonRpcId::Number(7));
        assert_eq!(response.error.unwrap().code, -32601);

        let notification = JsonRpcRequest {
            id: None,
            ..request(0, "notifications/initialized", json!({}))
        };
        assert!(handler.handle_request(notification).await.is_none());
    }
}
