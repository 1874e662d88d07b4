//! MCP Subtree Read Handler
//!
//! Serves hierarchical reads from the mirror: structured nested records or
//! a compact indented outline. Runs the opportunistic freshness check first
//! and degrades to the stale cache rather than blocking.

use crate::mcp::handlers::{cache_status, require_populated};
use crate::mcp::types::MCPError;
use crate::mcp::McpContext;
use crate::services::{TreeService, MAX_TREE_DEPTH};
use serde::Deserialize;
use serde_json::{json, Value};

/// Default depth when the caller does not specify one
const DEFAULT_DEPTH: usize = 2;

/// Parameters for read_subtree
#[derive(Debug, Deserialize)]
pub struct ReadSubtreeParams {
    /// Root of the subtree (omit for the top level)
    #[serde(default)]
    pub node_id: Option<String>,

    /// Levels of children to expand (clamped to 1..=10)
    #[serde(default)]
    pub depth: Option<usize>,

    /// "tree" (default) for nested records, "outline" for indented text
    #[serde(default)]
    pub format: Option<String>,

    /// Names to hide along with their subtrees (case-insensitive)
    #[serde(default)]
    pub exclude_names: Option<Vec<String>>,
}

pub async fn handle_read_subtree(ctx: &McpContext, params: Value) -> Result<Value, MCPError> {
    let params: ReadSubtreeParams = serde_json::from_value(params)
        .map_err(|e| MCPError::invalid_params(format!("Invalid parameters: {}", e)))?;

    let depth = params.depth.unwrap_or(DEFAULT_DEPTH).clamp(1, MAX_TREE_DEPTH);
    let exclude = params.exclude_names.unwrap_or_default();

    let freshness = ctx.sync.ensure_fresh().await;
    require_populated(ctx).await?;

    // When a specific root is requested it must exist
    let root = match &params.node_id {
        Some(node_id) => Some(ctx.nodes.get_node(node_id).await?),
        None => None,
    };

    let trees = ctx
        .tree
        .build_subtree(params.node_id.as_deref(), depth, &exclude)
        .await?;

    match params.format.as_deref() {
        Some("outline") => Ok(json!({
            "cacheStatus": cache_status(&freshness),
            "root": root,
            "outline": TreeService::render_outline(&trees),
        })),
        Some("tree") | None => Ok(json!({
            "cacheStatus": cache_status(&freshness),
            "root": root,
            "depth": depth,
            "nodes": trees,
        })),
        Some(other) => Err(MCPError::invalid_params(format!(
            "Unknown format '{}': expected \"tree\" or \"outline\"",
            other
        ))),
    }
}
