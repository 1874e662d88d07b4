//! Shared test fixtures: an in-memory mock of the remote outline service
//! and helpers to wire a full service graph over a tempfile database.

#![allow(dead_code)]

use async_trait::async_trait;
use outmirror_core::db::DatabaseService;
use outmirror_core::mcp::McpContext;
use outmirror_core::remote::{
    CreateNodeRequest, MoveNodeRequest, OutlineRemote, RemoteError, RemoteNode, RemoteNodeDetail,
    UpdateNodeRequest,
};
use outmirror_core::services::SyncConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// One record in the mock outline service
#[derive(Debug, Clone)]
pub struct MockNode {
    pub id: String,
    pub name: String,
    pub note: Option<String>,
    pub parent_id: Option<String>,
    pub completed: bool,
    pub priority: i64,
}

/// In-memory stand-in for the remote outline service
///
/// Behaves like the real collaborator: export returns the full collection,
/// deletions cascade server-side, unknown ids produce 404s. Failure toggles
/// let tests simulate outages and credential problems.
pub struct MockRemote {
    nodes: Mutex<HashMap<String, MockNode>>,
    next_id: AtomicUsize,
    pub export_calls: AtomicUsize,
    pub fail_export: AtomicBool,
    pub fail_auth: AtomicBool,
}

impl MockRemote {
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
            export_calls: AtomicUsize::new(0),
            fail_export: AtomicBool::new(false),
            fail_auth: AtomicBool::new(false),
        }
    }

    /// Seed a node directly into the mock service
    pub fn seed(&self, id: &str, name: &str, parent_id: Option<&str>, priority: i64) {
        self.nodes.lock().unwrap().insert(
            id.to_string(),
            MockNode {
                id: id.to_string(),
                name: name.to_string(),
                note: None,
                parent_id: parent_id.map(str::to_string),
                completed: false,
                priority,
            },
        );
    }

    /// Seed with a note attached
    pub fn seed_with_note(
        &self,
        id: &str,
        name: &str,
        parent_id: Option<&str>,
        priority: i64,
        note: &str,
    ) {
        self.seed(id, name, parent_id, priority);
        if let Some(node) = self.nodes.lock().unwrap().get_mut(id) {
            node.note = Some(note.to_string());
        }
    }

    /// Remove a node and its descendants, like the real server would
    pub fn remove_subtree(&self, id: &str) {
        let mut nodes = self.nodes.lock().unwrap();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            nodes.remove(&current);
            let children: Vec<String> = nodes
                .values()
                .filter(|n| n.parent_id.as_deref() == Some(current.as_str()))
                .map(|n| n.id.clone())
                .collect();
            stack.extend(children);
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }

    fn to_remote(node: &MockNode) -> RemoteNode {
        RemoteNode {
            id: node.id.clone(),
            name: node.name.clone(),
            note: node.note.clone(),
            parent_id: node.parent_id.clone(),
            completed: node.completed,
            priority: node.priority,
            created_at: None,
            updated_at: None,
        }
    }

    fn to_detail(node: &MockNode) -> RemoteNodeDetail {
        RemoteNodeDetail {
            id: node.id.clone(),
            name: node.name.clone(),
            note: node.note.clone(),
            completed: node.completed,
            priority: node.priority,
            created_at: None,
            updated_at: None,
        }
    }
}

#[async_trait]
impl OutlineRemote for MockRemote {
    async fn validate_credentials(&self) -> Result<(), RemoteError> {
        if self.fail_auth.load(Ordering::SeqCst) {
            return Err(RemoteError::Unauthorized);
        }
        Ok(())
    }

    async fn export_all(&self) -> Result<Vec<RemoteNode>, RemoteError> {
        self.export_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_auth.load(Ordering::SeqCst) {
            return Err(RemoteError::Unauthorized);
        }
        if self.fail_export.load(Ordering::SeqCst) {
            return Err(RemoteError::Api {
                status: 500,
                message: "simulated outage".to_string(),
            });
        }
        Ok(self.nodes.lock().unwrap().values().map(Self::to_remote).collect())
    }

    async fn fetch_node(&self, id: &str) -> Result<RemoteNodeDetail, RemoteError> {
        self.nodes
            .lock()
            .unwrap()
            .get(id)
            .map(Self::to_detail)
            .ok_or_else(|| RemoteError::not_found(id))
    }

    async fn list_children(
        &self,
        parent_id: Option<&str>,
    ) -> Result<Vec<RemoteNode>, RemoteError> {
        let nodes = self.nodes.lock().unwrap();
        let mut children: Vec<&MockNode> = nodes
            .values()
            .filter(|n| n.parent_id.as_deref() == parent_id)
            .collect();
        children.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.name.cmp(&b.name)));
        Ok(children.into_iter().map(Self::to_remote).collect())
    }

    async fn create_node(&self, req: &CreateNodeRequest) -> Result<RemoteNodeDetail, RemoteError> {
        let id = format!("mock-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let node = MockNode {
            id: id.clone(),
            name: req.name.clone(),
            note: req.note.clone(),
            parent_id: req.parent_id.clone(),
            completed: false,
            priority: req.priority.unwrap_or(0),
        };
        let detail = Self::to_detail(&node);
        self.nodes.lock().unwrap().insert(id, node);
        Ok(detail)
    }

    async fn update_node(
        &self,
        id: &str,
        req: &UpdateNodeRequest,
    ) -> Result<RemoteNodeDetail, RemoteError> {
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes.get_mut(id).ok_or_else(|| RemoteError::not_found(id))?;
        if let Some(name) = &req.name {
            node.name = name.clone();
        }
        if let Some(note) = &req.note {
            node.note = Some(note.clone());
        }
        Ok(Self::to_detail(node))
    }

    async fn move_node(&self, id: &str, req: &MoveNodeRequest) -> Result<(), RemoteError> {
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes.get_mut(id).ok_or_else(|| RemoteError::not_found(id))?;
        node.parent_id = req.parent_id.clone();
        if let Some(priority) = req.priority {
            node.priority = priority;
        }
        Ok(())
    }

    async fn delete_node(&self, id: &str) -> Result<(), RemoteError> {
        if !self.nodes.lock().unwrap().contains_key(id) {
            return Err(RemoteError::not_found(id));
        }
        self.remove_subtree(id);
        Ok(())
    }

    async fn set_completed(&self, id: &str, completed: bool) -> Result<(), RemoteError> {
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes.get_mut(id).ok_or_else(|| RemoteError::not_found(id))?;
        node.completed = completed;
        Ok(())
    }
}

/// A full service graph over a tempfile database and a mock remote
pub struct TestEnv {
    pub ctx: Arc<McpContext>,
    pub db: Arc<DatabaseService>,
    pub remote: Arc<MockRemote>,
    _tmp: TempDir,
}

/// Sync config with the rate limiter disabled, for tests that sync freely
pub fn permissive_sync_config() -> SyncConfig {
    SyncConfig {
        min_full_sync_interval: Duration::from_secs(0),
        ..SyncConfig::default()
    }
}

pub async fn test_env() -> TestEnv {
    test_env_with(permissive_sync_config()).await
}

pub async fn test_env_with(config: SyncConfig) -> TestEnv {
    let tmp = TempDir::new().expect("temp dir");
    let db_path = tmp.path().join("mirror.db");
    let db = Arc::new(DatabaseService::new(db_path).await.expect("open db"));
    let remote = Arc::new(MockRemote::new());
    let ctx = Arc::new(McpContext::new(
        Arc::clone(&db),
        Arc::clone(&remote) as Arc<dyn OutlineRemote>,
        config,
    ));
    TestEnv {
        ctx,
        db,
        remote,
        _tmp: tmp,
    }
}

/// Seed the canonical fixture tree:
///
/// ```text
/// work (p1)
///   today tasks (t1)
///     review budget (t2)
///     email legal (t3)
/// personal (p2)
///   groceries (g1)
/// ```
pub fn seed_fixture_tree(remote: &MockRemote) {
    remote.seed("p1", "Work", None, 1);
    remote.seed("t1", "Today Tasks", Some("p1"), 1);
    remote.seed("t2", "Review budget", Some("t1"), 1);
    remote.seed("t3", "Email legal", Some("t1"), 2);
    remote.seed("p2", "Personal", None, 2);
    remote.seed("g1", "Groceries", Some("p2"), 1);
}
