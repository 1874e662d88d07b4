//! OutMirror Core
//!
//! This crate mirrors a remote, deeply-nested outline service into a local
//! persistent cache so hierarchical reads and fuzzy text search can be
//! served without one remote call per operation, under a strict remote
//! rate limit.
//!
//! # Architecture
//!
//! - **Cache store**: one embedded libsql/SQLite file holding flat node
//!   rows, sync metadata, and bookmarks
//! - **Sync engine**: rate-limited transactional full refresh plus targeted
//!   partial refresh, with a self-healing lease against overlapping syncs
//! - **Eventually consistent**: writes go to the remote service first, the
//!   mirror is updated optimistically, and background reconciliation
//!   corrects drift
//! - **MCP surface**: a stdio JSON-RPC 2.0 server exposing the operations
//!   to AI agents
//!
//! # Modules
//!
//! - [`models`] - Data structures (Node, Bookmark)
//! - [`db`] - The cache store (libsql)
//! - [`remote`] - The remote outline HTTP collaborator
//! - [`services`] - Sync, write path, tree builder, fuzzy search
//! - [`mcp`] - MCP stdio server

pub mod db;
pub mod mcp;
pub mod models;
pub mod remote;
pub mod services;

// Re-export commonly used types
pub use db::{DatabaseService, DatabaseError};
pub use mcp::McpContext;
pub use models::{Bookmark, Node};
pub use remote::{HttpOutlineClient, OutlineRemote, RemoteError};
pub use services::{
    Freshness, NodeService, SearchService, ServiceError, SyncConfig, SyncService, TreeService,
};
