//! MCP Bookmark Handlers
//!
//! Named shortcuts into the outline. Reading a bookmark first refreshes the
//! bookmarked node's child list from the remote service (targeted partial
//! sync) so bookmark jumps land on current data; that refresh is
//! best-effort and never fails the read.

use crate::mcp::types::MCPError;
use crate::mcp::McpContext;
use crate::models::Bookmark;
use crate::services::ServiceError;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

/// Parameters for set_bookmark
#[derive(Debug, Deserialize)]
pub struct SetBookmarkParams {
    pub name: String,
    pub node_id: String,
    #[serde(default)]
    pub context: Option<String>,
}

/// Parameters for get_bookmark / delete_bookmark
#[derive(Debug, Deserialize)]
pub struct BookmarkNameParams {
    pub name: String,
}

pub async fn handle_set_bookmark(ctx: &McpContext, params: Value) -> Result<Value, MCPError> {
    let params: SetBookmarkParams = serde_json::from_value(params)
        .map_err(|e| MCPError::invalid_params(format!("Invalid parameters: {}", e)))?;

    if params.name.trim().is_empty() {
        return Err(MCPError::invalid_params("bookmark name cannot be empty"));
    }

    let bookmark = Bookmark::new(params.name.trim(), params.node_id, params.context);
    ctx.db
        .db_upsert_bookmark(&bookmark)
        .await
        .map_err(ServiceError::from)?;

    Ok(json!({ "bookmark": bookmark }))
}

pub async fn handle_get_bookmark(ctx: &McpContext, params: Value) -> Result<Value, MCPError> {
    let params: BookmarkNameParams = serde_json::from_value(params)
        .map_err(|e| MCPError::invalid_params(format!("Invalid parameters: {}", e)))?;

    let bookmark = ctx
        .db
        .db_get_bookmark(&params.name)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| MCPError::from(ServiceError::bookmark_not_found(&params.name)))?;

    // Targeted refresh of the bookmarked subtree's immediate children.
    // Best-effort: a failure serves whatever the mirror already has.
    if let Err(e) = ctx.sync.sync_children(Some(&bookmark.node_id)).await {
        warn!(
            "Bookmark '{}' child refresh failed, serving cached data: {}",
            bookmark.name, e
        );
    }

    let node = ctx
        .db
        .db_get_node(&bookmark.node_id)
        .await
        .map_err(ServiceError::from)?;
    let children = ctx
        .db
        .db_get_children(Some(&bookmark.node_id))
        .await
        .map_err(ServiceError::from)?;

    Ok(json!({
        "bookmark": bookmark,
        "node": node,
        "children": children,
    }))
}

pub async fn handle_list_bookmarks(ctx: &McpContext, _params: Value) -> Result<Value, MCPError> {
    let bookmarks = ctx
        .db
        .db_list_bookmarks()
        .await
        .map_err(ServiceError::from)?;
    Ok(json!({
        "count": bookmarks.len(),
        "bookmarks": bookmarks,
    }))
}

pub async fn handle_delete_bookmark(ctx: &McpContext, params: Value) -> Result<Value, MCPError> {
    let params: BookmarkNameParams = serde_json::from_value(params)
        .map_err(|e| MCPError::invalid_params(format!("Invalid parameters: {}", e)))?;

    let removed = ctx
        .db
        .db_delete_bookmark(&params.name)
        .await
        .map_err(ServiceError::from)?;
    Ok(json!({ "deleted": removed > 0 }))
}
