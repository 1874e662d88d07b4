//! MCP Request Handlers
//!
//! Handler modules for the tool surface. Every handler takes the shared
//! [`crate::mcp::McpContext`] plus raw JSON params, parses them into a typed
//! param struct, and returns JSON.
//!
//! Read-type handlers run the opportunistic freshness check first and
//! annotate their responses with `cacheStatus`; an empty mirror is an
//! explicit cache-empty error, never an empty success.

pub mod bookmarks;
pub mod initialize;
pub mod nodes;
pub mod search;
pub mod sync;
pub mod tools;
pub mod tree;

use crate::mcp::types::MCPError;
use crate::mcp::McpContext;
use crate::services::{Freshness, ServiceError};

/// Wire value of the freshness signal on read responses
pub(crate) fn cache_status(freshness: &Freshness) -> &'static str {
    match freshness {
        Freshness::Fresh | Freshness::Refreshed { .. } => "populated",
        Freshness::Stale(_) => "stale",
    }
}

/// Reject reads against an empty mirror with the explicit needs-sync signal
pub(crate) async fn require_populated(ctx: &McpContext) -> Result<(), MCPError> {
    let count = ctx
        .db
        .db_count_nodes()
        .await
        .map_err(|e| MCPError::internal_error(e.to_string()))?;
    if count == 0 {
        return Err(ServiceError::CacheEmpty.into());
    }
    Ok(())
}
