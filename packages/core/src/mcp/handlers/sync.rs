//! MCP Sync Handler
//!
//! Explicit full-sync trigger. Unlike the opportunistic freshness check,
//! force_sync ignores the staleness threshold - but it still honors the
//! export rate limit and the lease, surfacing both as typed errors with a
//! retry hint rather than waiting.

use crate::mcp::types::MCPError;
use crate::mcp::McpContext;
use serde_json::{json, Value};

pub async fn handle_force_sync(ctx: &McpContext, _params: Value) -> Result<Value, MCPError> {
    let outcome = ctx.sync.full_sync().await?;
    Ok(json!({
        "synced": true,
        "nodeCount": outcome.node_count,
    }))
}
