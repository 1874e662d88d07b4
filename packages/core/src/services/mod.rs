//! Business Services
//!
//! This module contains the core services over the cache store and the
//! remote collaborator:
//!
//! - `SyncService` - full and partial synchronization, freshness checks,
//!   the sync lease, and the export rate limiter
//! - `NodeService` - write operations with optimistic cache updates and
//!   fire-and-forget reconciliation
//! - `TreeService` - subtree assembly and outline rendering (pure reader)
//! - `SearchService` - fuzzy multi-pass text ranking (pure reader)

pub mod error;
pub mod node_service;
pub mod search_service;
pub mod sync_service;
pub mod tree_service;

pub use error::ServiceError;
pub use node_service::{CreateNodeParams, NodeService};
pub use search_service::{
    trigram_similarity, SearchHit, SearchService, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT,
};
pub use sync_service::{Freshness, FullSyncOutcome, StaleReason, SyncConfig, SyncService};
pub use tree_service::{TreeNode, TreeService, MAX_TREE_DEPTH};
