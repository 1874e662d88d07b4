//! MCP Node Mutation Handlers
//!
//! Create/update/move/delete/complete operations. Each one calls the remote
//! service first and mirrors the result optimistically, so the very next
//! read reflects the change (see `NodeService`).

use crate::mcp::types::MCPError;
use crate::mcp::McpContext;
use crate::services::CreateNodeParams as ServiceCreateParams;
use serde::Deserialize;
use serde_json::{json, Value};

/// Parameters for create_node
#[derive(Debug, Deserialize)]
pub struct CreateNodeParams {
    /// Parent node ID (omit for a top-level node)
    #[serde(default)]
    pub parent_id: Option<String>,

    /// Primary text of the new node
    pub name: String,

    /// Optional note
    #[serde(default)]
    pub note: Option<String>,

    /// Optional sibling priority (server assigns one when omitted)
    #[serde(default)]
    pub priority: Option<i64>,
}

/// Parameters for get_node
#[derive(Debug, Deserialize)]
pub struct GetNodeParams {
    pub node_id: String,
}

/// Parameters for update_node
#[derive(Debug, Deserialize)]
pub struct UpdateNodeParams {
    pub node_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Parameters for delete_node
#[derive(Debug, Deserialize)]
pub struct DeleteNodeParams {
    pub node_id: String,
}

/// Parameters for move_node
#[derive(Debug, Deserialize)]
pub struct MoveNodeParams {
    pub node_id: String,
    /// New parent (omit to move to the top level)
    #[serde(default)]
    pub new_parent_id: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
}

/// Parameters for complete_node / uncomplete_node
#[derive(Debug, Deserialize)]
pub struct CompleteNodeParams {
    pub node_id: String,
}

pub async fn handle_create_node(ctx: &McpContext, params: Value) -> Result<Value, MCPError> {
    let params: CreateNodeParams = serde_json::from_value(params)
        .map_err(|e| MCPError::invalid_params(format!("Invalid parameters: {}", e)))?;

    let node = ctx
        .nodes
        .create_node(ServiceCreateParams {
            parent_id: params.parent_id,
            name: params.name,
            note: params.note,
            priority: params.priority,
        })
        .await?;

    Ok(json!({ "node": node }))
}

pub async fn handle_get_node(ctx: &McpContext, params: Value) -> Result<Value, MCPError> {
    let params: GetNodeParams = serde_json::from_value(params)
        .map_err(|e| MCPError::invalid_params(format!("Invalid parameters: {}", e)))?;

    let node = ctx.nodes.get_node(&params.node_id).await?;
    Ok(json!({ "node": node }))
}

pub async fn handle_update_node(ctx: &McpContext, params: Value) -> Result<Value, MCPError> {
    let params: UpdateNodeParams = serde_json::from_value(params)
        .map_err(|e| MCPError::invalid_params(format!("Invalid parameters: {}", e)))?;

    let node = ctx
        .nodes
        .update_node(&params.node_id, params.name, params.note)
        .await?;

    Ok(json!({ "node": node }))
}

pub async fn handle_delete_node(ctx: &McpContext, params: Value) -> Result<Value, MCPError> {
    let params: DeleteNodeParams = serde_json::from_value(params)
        .map_err(|e| MCPError::invalid_params(format!("Invalid parameters: {}", e)))?;

    let removed = ctx.nodes.delete_node(&params.node_id).await?;
    Ok(json!({ "deleted": true, "removedRows": removed }))
}

pub async fn handle_move_node(ctx: &McpContext, params: Value) -> Result<Value, MCPError> {
    let params: MoveNodeParams = serde_json::from_value(params)
        .map_err(|e| MCPError::invalid_params(format!("Invalid parameters: {}", e)))?;

    let node = ctx
        .nodes
        .move_node(&params.node_id, params.new_parent_id, params.priority)
        .await?;

    Ok(json!({ "node": node }))
}

pub async fn handle_complete_node(ctx: &McpContext, params: Value) -> Result<Value, MCPError> {
    set_completed(ctx, params, true).await
}

pub async fn handle_uncomplete_node(ctx: &McpContext, params: Value) -> Result<Value, MCPError> {
    set_completed(ctx, params, false).await
}

async fn set_completed(
    ctx: &McpContext,
    params: Value,
    completed: bool,
) -> Result<Value, MCPError> {
    let params: CompleteNodeParams = serde_json::from_value(params)
        .map_err(|e| MCPError::invalid_params(format!("Invalid parameters: {}", e)))?;

    let node = ctx.nodes.set_completed(&params.node_id, completed).await?;
    Ok(json!({ "node": node }))
}
