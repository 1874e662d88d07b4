//! Node Service - Write Path and Single-Node Reads
//!
//! Orchestrates mutations against the remote outline service with optimistic
//! cache updates:
//!
//! 1. Call the remote collaborator (source of truth) first
//! 2. On success, apply the equivalent mutation to the cache store so the
//!    very next read reflects the change without waiting on any sync
//! 3. Schedule a fire-and-forget children-sync of the affected parent(s) to
//!    correct any divergence (server-side normalization, concurrent edits
//!    from elsewhere)
//!
//! Background reconciliation failures are logged and swallowed; the
//! optimistic value stands until the next successful sync. A failed remote
//! call surfaces to the caller and leaves the cache untouched.

use crate::db::DatabaseService;
use crate::models::Node;
use crate::remote::{
    CreateNodeRequest, MoveNodeRequest, OutlineRemote, RemoteError, UpdateNodeRequest,
};
use crate::services::error::ServiceError;
use crate::services::sync_service::SyncService;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Parameters for creating a node
#[derive(Debug, Clone, Default)]
pub struct CreateNodeParams {
    /// Parent under which to create (`None` = top level)
    pub parent_id: Option<String>,
    /// Primary text
    pub name: String,
    /// Optional secondary text
    pub note: Option<String>,
    /// Optional sibling priority; the server assigns one when absent
    pub priority: Option<i64>,
}

/// Write-path orchestration over the remote service and the cache
pub struct NodeService {
    db: Arc<DatabaseService>,
    remote: Arc<dyn OutlineRemote>,
    sync: Arc<SyncService>,
}

impl NodeService {
    pub fn new(
        db: Arc<DatabaseService>,
        remote: Arc<dyn OutlineRemote>,
        sync: Arc<SyncService>,
    ) -> Self {
        Self { db, remote, sync }
    }

    /// Fetch a node from the cache
    pub async fn get_node(&self, id: &str) -> Result<Node, ServiceError> {
        self.db
            .db_get_node(id)
            .await?
            .ok_or_else(|| ServiceError::node_not_found(id))
    }

    /// Create a node remotely, then mirror it optimistically
    pub async fn create_node(&self, params: CreateNodeParams) -> Result<Node, ServiceError> {
        if params.name.trim().is_empty() {
            return Err(ServiceError::invalid_argument("name cannot be empty"));
        }

        let request = CreateNodeRequest {
            parent_id: params.parent_id.clone(),
            name: params.name,
            note: params.note,
            priority: params.priority,
        };
        let created = self.remote.create_node(&request).await?;

        let node = created.into_node(params.parent_id.clone());
        self.db.db_upsert_node(&node).await?;
        if let Some(parent_id) = &params.parent_id {
            self.db.db_adjust_children_count(parent_id, 1).await?;
        }
        info!("Created node {} under {:?}", node.id, params.parent_id);

        self.spawn_reconcile(vec![params.parent_id]);
        Ok(node)
    }

    /// Update a node's name and/or note remotely, then patch the mirror
    pub async fn update_node(
        &self,
        id: &str,
        name: Option<String>,
        note: Option<String>,
    ) -> Result<Node, ServiceError> {
        if name.is_none() && note.is_none() {
            return Err(ServiceError::invalid_argument(
                "update requires a name or a note",
            ));
        }

        let cached = self.db.db_get_node(id).await?;

        let request = UpdateNodeRequest { name, note };
        let updated = self.remote.update_node(id, &request).await?;

        let parent_id = cached.as_ref().and_then(|n| n.parent_id.clone());
        let node = updated.into_node(parent_id.clone());
        match &cached {
            Some(_) => {
                // Overwrites own fields; parent_id and children_count stand
                self.db.db_refresh_node_fields(&node).await?;
            }
            None => {
                debug!("Updated node {} was not cached, inserting detached", id);
                self.db.db_upsert_node(&node).await?;
            }
        }

        self.spawn_reconcile(vec![parent_id]);
        self.get_node(id).await
    }

    /// Move a node remotely, then reparent the mirror row
    pub async fn move_node(
        &self,
        id: &str,
        new_parent_id: Option<String>,
        priority: Option<i64>,
    ) -> Result<Node, ServiceError> {
        let cached = self.get_node(id).await?;
        let old_parent_id = cached.parent_id.clone();

        let request = MoveNodeRequest {
            parent_id: new_parent_id.clone(),
            priority,
        };
        self.remote.move_node(id, &request).await?;

        self.db
            .db_set_parent(id, new_parent_id.as_deref(), priority)
            .await?;

        if old_parent_id != new_parent_id {
            if let Some(old_parent) = &old_parent_id {
                self.db.db_adjust_children_count(old_parent, -1).await?;
            }
            if let Some(new_parent) = &new_parent_id {
                self.db.db_adjust_children_count(new_parent, 1).await?;
            }
        }
        info!("Moved node {} from {:?} to {:?}", id, old_parent_id, new_parent_id);

        self.spawn_reconcile(vec![old_parent_id, new_parent_id]);
        self.get_node(id).await
    }

    /// Delete a node remotely, then cascade-delete the mirrored subtree
    ///
    /// Returns the number of mirrored rows removed. A remote 404 counts as
    /// success: the node is already gone at the source of truth, and the
    /// local mirror catches up.
    pub async fn delete_node(&self, id: &str) -> Result<u64, ServiceError> {
        let parent_id = self.db.db_get_node(id).await?.and_then(|n| n.parent_id);

        match self.remote.delete_node(id).await {
            Ok(()) => {}
            Err(RemoteError::NotFound { .. }) => {
                debug!("Node {} already deleted remotely", id);
            }
            Err(e) => return Err(e.into()),
        }

        let removed = self.db.db_delete_cascade(id).await?;
        if let Some(parent_id) = &parent_id {
            self.db.db_adjust_children_count(parent_id, -1).await?;
        }
        info!("Deleted node {} ({} mirrored rows)", id, removed);

        self.spawn_reconcile(vec![parent_id]);
        Ok(removed)
    }

    /// Set the completion flag remotely, then patch the mirror
    pub async fn set_completed(&self, id: &str, completed: bool) -> Result<Node, ServiceError> {
        let cached = self.get_node(id).await?;

        self.remote.set_completed(id, completed).await?;
        self.db.db_set_completed(id, completed).await?;

        self.spawn_reconcile(vec![cached.parent_id]);
        self.get_node(id).await
    }

    /// Schedule best-effort children-syncs of the affected parents
    ///
    /// Fire-and-forget: never blocks the operation that spawned it, and
    /// failures are drained into the log, never surfaced to the caller.
    fn spawn_reconcile(&self, parents: Vec<Option<String>>) {
        let mut seen = std::collections::HashSet::new();
        for parent in parents {
            if !seen.insert(parent.clone()) {
                continue;
            }
            let sync = Arc::clone(&self.sync);
            tokio::spawn(async move {
                if let Err(e) = sync.sync_children(parent.as_deref()).await {
                    warn!("Background reconciliation of {:?} failed: {}", parent, e);
                }
            });
        }
    }
}
