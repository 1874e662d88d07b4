//! Remote API Payload Types
//!
//! Typed records for every outline service endpoint, converted to the cache
//! model at this boundary. The remote JSON is snake_case; nothing dynamic
//! leaks past this module.
//!
//! Two node shapes exist because the endpoints genuinely differ: bulk
//! endpoints (export, child listing) return `parent_id`, while the
//! single-node endpoint does not - callers must preserve locally-known
//! hierarchy fields when applying a [`RemoteNodeDetail`].

use crate::models::Node;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A node as returned by the bulk endpoints (export, list-children)
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RemoteNode {
    /// Convert to the cache model; `children_count` starts at 0 and is
    /// filled in by the sync engine.
    pub fn into_node(self) -> Node {
        Node {
            id: self.id,
            name: self.name,
            note: self.note,
            parent_id: self.parent_id,
            completed: self.completed,
            priority: self.priority,
            children_count: 0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A node as returned by the single-node endpoints (fetch, create, update)
///
/// Carries no `parent_id` and no child information.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteNodeDetail {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RemoteNodeDetail {
    /// Convert to the cache model with an explicitly supplied parent.
    pub fn into_node(self, parent_id: Option<String>) -> Node {
        Node {
            id: self.id,
            name: self.name,
            note: self.note,
            parent_id,
            completed: self.completed,
            priority: self.priority,
            children_count: 0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Body for the create-node endpoint
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateNodeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
}

/// Body for the update-node endpoint
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateNodeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Body for the move-node endpoint
#[derive(Debug, Clone, Default, Serialize)]
pub struct MoveNodeRequest {
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
}

/// Envelope for the bulk export endpoint
#[derive(Debug, Deserialize)]
pub struct ExportResponse {
    pub nodes: Vec<RemoteNode>,
}

/// Envelope for the list-children endpoint
#[derive(Debug, Deserialize)]
pub struct NodeListResponse {
    pub nodes: Vec<RemoteNode>,
}
