//! MCP stdio Server
//!
//! Async tokio task that handles JSON-RPC 2.0 requests over stdin/stdout.
//! Pure protocol implementation with no framework dependencies.

use crate::mcp::handlers::{initialize, tools};
use crate::mcp::types::{MCPError, MCPRequest, MCPResponse};
use crate::mcp::McpContext;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, error, info, instrument, warn};

/// Run the MCP stdio server
///
/// Reads JSON-RPC requests from stdin, processes them via handlers,
/// and writes responses to stdout. Runs until EOF on stdin.
#[instrument(skip(ctx))]
pub async fn run_mcp_server(ctx: Arc<McpContext>) -> anyhow::Result<()> {
    info!("MCP stdio server started");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let reader = BufReader::new(stdin);
    let mut writer = BufWriter::new(stdout);
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        debug!("MCP request: {}", line);

        let request: MCPRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                // Notifications carry no id and expect no response
                if is_notification(&line) {
                    debug!("Ignoring notification: {}", line);
                    continue;
                }
                warn!("Failed to parse JSON-RPC request: {}", e);
                let error_response = MCPResponse::error(
                    0, // Unknown ID since parsing failed
                    MCPError::parse_error(format!("Invalid JSON: {}", e)),
                );
                write_response(&mut writer, &error_response).await?;
                continue;
            }
        };

        let request_id = request.id;
        let method = request.method.clone();

        let response = handle_request(&ctx, request).await;

        debug!("MCP response for method '{}' (id={})", method, request_id);
        write_response(&mut writer, &response).await?;
    }

    info!("MCP stdio server stopped (stdin closed)");
    Ok(())
}

/// True when a line is a JSON-RPC notification (a method with no id)
fn is_notification(line: &str) -> bool {
    serde_json::from_str::<Value>(line)
        .map(|v| v.get("method").is_some() && v.get("id").is_none())
        .unwrap_or(false)
}

/// Handle a JSON-RPC request and return a response
#[instrument(skip(ctx, request), fields(method = %request.method, id = %request.id))]
async fn handle_request(ctx: &Arc<McpContext>, request: MCPRequest) -> MCPResponse {
    let result = match request.method.as_str() {
        "initialize" => initialize::handle_initialize(request.params),
        "tools/list" => tools::handle_tools_list(request.params),
        "tools/call" => tools::handle_tools_call(ctx, request.params).await,
        // Tool names also dispatch as direct methods
        method => tools::dispatch_tool(ctx, method, request.params).await,
    };

    match result {
        Ok(result) => {
            debug!("MCP request {} succeeded", request.id);
            MCPResponse::success(request.id, result)
        }
        Err(err) => {
            error!(
                "MCP request {} failed: {} (code: {})",
                request.id, err.message, err.code
            );
            MCPResponse::error(request.id, err)
        }
    }
}

/// Write a JSON-RPC response to stdout
async fn write_response(
    writer: &mut BufWriter<tokio::io::Stdout>,
    response: &MCPResponse,
) -> anyhow::Result<()> {
    let json = serde_json::to_string(response)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_notification() {
        assert!(is_notification(
            r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#
        ));
        assert!(!is_notification(
            r#"{"jsonrpc": "2.0", "id": 1, "method": "tools/list"}"#
        ));
        assert!(!is_notification("not json"));
    }
}
