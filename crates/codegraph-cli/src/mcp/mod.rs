//! Model Context Protocol server over stdio.
//!
//! Messages are newline-delimited JSON-RPC 2.0. Stdout carries only
//! responses; logs go to stderr.

mod handlers;
mod protocol;

pub use handlers::McpHandler;

use color_eyre::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use codegraph_core::Config;

use protocol::{JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse};

/// Serve MCP on stdin/stdout until stdin closes.
pub async fn run(config: Config) -> Result<()> {
    tracing::info!("MCP server listening on stdio");
    let handler = McpHandler::new(config);
    let result = serve(&handler, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await;
    handler.shutdown();
    result
}

/// Answer each request line on `reader` with one response line on `writer`.
pub async fn serve<R, W>(handler: &McpHandler, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => handler.handle_request(request).await,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid JSON-RPC message");
                Some(JsonRpcResponse::error(
                    JsonRpcId::Null,
                    JsonRpcError::parse_error(format!("Invalid JSON: {}", e)),
                ))
            }
        };

        if let Some(response) = response {
            let mut payload = serde_json::to_vec(&response)?;
            payload.push(b'\n');
            writer.write_all(&payload).await?;
            writer.flush().await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::config::StoreConfig;
    use serde_json::Value;

    #[tokio::test]
    async fn test_serve_answers_each_request_line() {
        let handler = McpHandler::new(Config {
            store: StoreConfig::in_memory(),
            ..Default::default()
        });
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"t","version":"0"}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":"two","method":"tools/list"}"#,
            "\n",
            "not json\n",
        );
        let mut output = Vec::new();

        serve(&handler, input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "codegraph");
        assert_eq!(responses[1]["id"], "two");
        assert_eq!(responses[1]["result"]["tools"].as_array().unwrap().len(), 5);
        assert_eq!(responses[2]["id"], Value::Null);
        assert_eq!(responses[2]["error"]["code"], -32700);
    }
}
