//! Model Context Protocol (MCP) Integration
//!
//! Pure protocol implementation for a stdio-based JSON-RPC 2.0 server.
//! Provides AI agent access to the outline mirror with no framework
//! dependencies.
//!
//! # Architecture
//!
//! - **Shared context**: [`McpContext`] bundles the services every handler
//!   needs; the binary builds one and hands it to [`server::run_mcp_server`]
//! - **stdio transport**: JSON-RPC 2.0 over stdin/stdout, one request per
//!   line
//! - **MCP handshake**: `initialize`, `tools/list`, and `tools/call` per the
//!   MCP specification; tool names also dispatch as direct methods

pub mod handlers;
pub mod server;
pub mod types;

use crate::db::DatabaseService;
use crate::remote::OutlineRemote;
use crate::services::{NodeService, SearchService, SyncConfig, SyncService, TreeService};
use std::sync::Arc;

pub use server::run_mcp_server;
pub use types::{MCPError, MCPRequest, MCPResponse};

/// Everything the MCP handlers need, constructed once at startup
pub struct McpContext {
    pub db: Arc<DatabaseService>,
    pub sync: Arc<SyncService>,
    pub nodes: Arc<NodeService>,
    pub tree: Arc<TreeService>,
    pub search: Arc<SearchService>,
}

impl McpContext {
    /// Wire the service graph over a store and a remote collaborator
    pub fn new(
        db: Arc<DatabaseService>,
        remote: Arc<dyn OutlineRemote>,
        sync_config: SyncConfig,
    ) -> Self {
        let sync = Arc::new(SyncService::with_config(
            Arc::clone(&db),
            Arc::clone(&remote),
            sync_config,
        ));
        let nodes = Arc::new(NodeService::new(
            Arc::clone(&db),
            Arc::clone(&remote),
            Arc::clone(&sync),
        ));
        let tree = Arc::new(TreeService::new(Arc::clone(&db)));
        let search = Arc::new(SearchService::new(Arc::clone(&db)));
        Self {
            db,
            sync,
            nodes,
            tree,
            search,
        }
    }
}
