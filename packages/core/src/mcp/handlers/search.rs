//! MCP Search Handler
//!
//! Fuzzy text search over the mirror. Runs the opportunistic freshness
//! check first - on an empty mirror this is what transparently triggers the
//! initial full sync - then ranks and annotates results.

use crate::mcp::handlers::{cache_status, require_populated};
use crate::mcp::types::MCPError;
use crate::mcp::McpContext;
use crate::services::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};
use serde::Deserialize;
use serde_json::{json, Value};

/// Parameters for search_nodes
#[derive(Debug, Deserialize)]
pub struct SearchNodesParams {
    /// Free-text query
    pub query: String,

    /// Maximum number of results (clamped to 1..=100)
    #[serde(default)]
    pub limit: Option<usize>,
}

pub async fn handle_search_nodes(ctx: &McpContext, params: Value) -> Result<Value, MCPError> {
    let params: SearchNodesParams = serde_json::from_value(params)
        .map_err(|e| MCPError::invalid_params(format!("Invalid parameters: {}", e)))?;

    if params.query.trim().is_empty() {
        return Err(MCPError::invalid_params("query cannot be empty or whitespace"));
    }
    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);

    let freshness = ctx.sync.ensure_fresh().await;
    require_populated(ctx).await?;

    let hits = ctx.search.search(&params.query, limit).await?;

    Ok(json!({
        "cacheStatus": cache_status(&freshness),
        "query": params.query,
        "count": hits.len(),
        "results": hits,
    }))
}
