//! MCP Tools Handler
//!
//! Implements the MCP-compliant `tools/list` and `tools/call` methods and
//! the shared dispatch table used by both `tools/call` and direct method
//! invocation.
//!
//! Schemas are maintained by hand: human-crafted descriptions and precise
//! control over the surface matter more to agent callers than saving the
//! maintenance.

use crate::mcp::handlers::{bookmarks, nodes, search, sync, tree};
use crate::mcp::types::MCPError;
use crate::mcp::McpContext;
use serde_json::{json, Value};

/// Route a tool invocation to its handler
///
/// Shared by `tools/call` and by direct JSON-RPC method dispatch. Returns
/// the handler's raw JSON result.
pub async fn dispatch_tool(
    ctx: &McpContext,
    tool_name: &str,
    arguments: Value,
) -> Result<Value, MCPError> {
    match tool_name {
        "search_nodes" => search::handle_search_nodes(ctx, arguments).await,
        "read_subtree" => tree::handle_read_subtree(ctx, arguments).await,
        "get_node" => nodes::handle_get_node(ctx, arguments).await,
        "create_node" => nodes::handle_create_node(ctx, arguments).await,
        "update_node" => nodes::handle_update_node(ctx, arguments).await,
        "delete_node" => nodes::handle_delete_node(ctx, arguments).await,
        "move_node" => nodes::handle_move_node(ctx, arguments).await,
        "complete_node" => nodes::handle_complete_node(ctx, arguments).await,
        "uncomplete_node" => nodes::handle_uncomplete_node(ctx, arguments).await,
        "force_sync" => sync::handle_force_sync(ctx, arguments).await,
        "set_bookmark" => bookmarks::handle_set_bookmark(ctx, arguments).await,
        "get_bookmark" => bookmarks::handle_get_bookmark(ctx, arguments).await,
        "list_bookmarks" => bookmarks::handle_list_bookmarks(ctx, arguments).await,
        "delete_bookmark" => bookmarks::handle_delete_bookmark(ctx, arguments).await,
        _ => Err(MCPError::method_not_found(tool_name)),
    }
}

/// Handle `tools/list`
pub fn handle_tools_list(_params: Value) -> Result<Value, MCPError> {
    Ok(json!({ "tools": get_tool_schemas() }))
}

/// Handle `tools/call`
///
/// Per the MCP spec, tool execution errors are returned as successful
/// responses with `isError: true`, not as JSON-RPC errors.
pub async fn handle_tools_call(ctx: &McpContext, params: Value) -> Result<Value, MCPError> {
    let tool_name = params["name"]
        .as_str()
        .ok_or_else(|| MCPError::invalid_params("Missing 'name' parameter"))?
        .to_string();
    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    match dispatch_tool(ctx, &tool_name, arguments).await {
        Ok(data) => {
            let text = serde_json::to_string_pretty(&data).map_err(|e| {
                MCPError::internal_error(format!("JSON serialization failed: {}", e))
            })?;
            Ok(json!({
                "content": [{
                    "type": "text",
                    "text": text
                }],
                "isError": false
            }))
        }
        Err(e) => Ok(json!({
            "content": [{
                "type": "text",
                "text": e.message
            }],
            "isError": true
        })),
    }
}

/// JSON schemas for the complete tool catalog
fn get_tool_schemas() -> Value {
    json!([
        {
            "name": "search_nodes",
            "description": "Fuzzy-search the outline mirror by free text. Ranks by phrase exactness, word matches, and trigram similarity; each result carries its breadcrumb path and a preview of its first children.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Free-text query (phrases, words, or fragments)"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum results (default 20, max 100)"
                    }
                },
                "required": ["query"]
            }
        },
        {
            "name": "read_subtree",
            "description": "Read a nested subtree of the outline from the local mirror. Depth-limited nodes still report childrenCount so a boundary is distinguishable from a leaf.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "node_id": {
                        "type": "string",
                        "description": "Root of the subtree (omit for the top level)"
                    },
                    "depth": {
                        "type": "integer",
                        "description": "Levels of children to expand (default 2, max 10)"
                    },
                    "format": {
                        "type": "string",
                        "enum": ["tree", "outline"],
                        "description": "tree = nested records, outline = indented text"
                    },
                    "exclude_names": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Node names to hide along with their subtrees"
                    }
                }
            }
        },
        {
            "name": "get_node",
            "description": "Fetch one node from the mirror by ID",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "node_id": { "type": "string", "description": "ID of the node" }
                },
                "required": ["node_id"]
            }
        },
        {
            "name": "create_node",
            "description": "Create a node in the remote outline. The mirror is updated immediately, so a follow-up read shows the new node without waiting for a sync.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "parent_id": {
                        "type": "string",
                        "description": "Parent node ID (omit for a top-level node)"
                    },
                    "name": { "type": "string", "description": "Primary text" },
                    "note": { "type": "string", "description": "Optional note" },
                    "priority": {
                        "type": "integer",
                        "description": "Sibling sort position (lower sorts first)"
                    }
                },
                "required": ["name"]
            }
        },
        {
            "name": "update_node",
            "description": "Update a node's name and/or note in the remote outline",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "node_id": { "type": "string", "description": "ID of the node to update" },
                    "name": { "type": "string", "description": "New primary text" },
                    "note": { "type": "string", "description": "New note" }
                },
                "required": ["node_id"]
            }
        },
        {
            "name": "delete_node",
            "description": "Delete a node and its whole subtree from the remote outline",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "node_id": { "type": "string", "description": "ID of the node to delete" }
                },
                "required": ["node_id"]
            }
        },
        {
            "name": "move_node",
            "description": "Move a node under a new parent and/or to a new sibling position",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "node_id": { "type": "string", "description": "ID of the node to move" },
                    "new_parent_id": {
                        "type": "string",
                        "description": "Destination parent (omit for the top level)"
                    },
                    "priority": {
                        "type": "integer",
                        "description": "Sibling sort position under the new parent"
                    }
                },
                "required": ["node_id"]
            }
        },
        {
            "name": "complete_node",
            "description": "Mark a node as completed",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "node_id": { "type": "string", "description": "ID of the node" }
                },
                "required": ["node_id"]
            }
        },
        {
            "name": "uncomplete_node",
            "description": "Mark a node as not completed",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "node_id": { "type": "string", "description": "ID of the node" }
                },
                "required": ["node_id"]
            }
        },
        {
            "name": "force_sync",
            "description": "Force a full refresh of the mirror from the remote outline. Subject to the remote export rate limit; a rate-limited call fails fast with a retry hint.",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "set_bookmark",
            "description": "Save a named shortcut to a node",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Bookmark name" },
                    "node_id": { "type": "string", "description": "Target node ID" },
                    "context": {
                        "type": "string",
                        "description": "Free-text description of what lives there"
                    }
                },
                "required": ["name", "node_id"]
            }
        },
        {
            "name": "get_bookmark",
            "description": "Resolve a bookmark and read its node with a freshly synced child list",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Bookmark name" }
                },
                "required": ["name"]
            }
        },
        {
            "name": "list_bookmarks",
            "description": "List all saved bookmarks",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "delete_bookmark",
            "description": "Delete a bookmark (the target node is untouched)",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Bookmark name" }
                },
                "required": ["name"]
            }
        }
    ])
}
