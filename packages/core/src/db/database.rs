//! Cache Store
//!
//! This module provides the persistent mirror of the remote outline using
//! libsql (embedded SQLite): connection management, schema initialization,
//! and every `db_*` accessor the services build on.
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any valid PathBuf
//! - **WAL mode + synchronous=FULL**: every committed batch reaches durable
//!   media, so an abrupt exit loses at most the in-flight transaction
//! - **Idempotent schema**: `CREATE TABLE IF NOT EXISTS`, no migrations
//! - **Single logical writer**: a second process sharing the file is
//!   unsupported; concurrency is cooperative tokio tasks in one process
//!
//! # Tables
//!
//! - `nodes` - one flat row per mirrored outline node
//! - `sync_meta` - key/value mirror state (last sync, lease flag)
//! - `bookmarks` - named shortcuts into the outline
//!
//! `nodes.parent_id` deliberately carries no foreign key: partial sync may
//! insert a child row before its parent row is refreshed, and cascade
//! deletion is performed explicitly (see [`DatabaseService::db_delete_cascade`]).

use crate::db::error::DatabaseError;
use crate::models::{Bookmark, Node};
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Row cap for the bounded candidate passes of the fuzzy search pre-filter.
pub const CANDIDATE_PASS_LIMIT: i64 = 200;

// sync_meta keys owned by the sync engine
pub const META_LAST_FULL_SYNC: &str = "last_full_sync";
pub const META_LAST_SYNC_NODE_COUNT: &str = "last_sync_node_count";
pub const META_SYNC_IN_PROGRESS: &str = "sync_in_progress";
pub const META_SYNC_STARTED_AT: &str = "sync_started_at";

/// Database service managing the libsql connection and schema
///
/// # Examples
///
/// ```no_run
/// use outmirror_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = DatabaseService::new(PathBuf::from("./data/outmirror.db")).await?;
///     let count = db.db_count_nodes().await?;
///     println!("{count} mirrored nodes");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    /// 4. Enable SQLite features (WAL mode, durable sync, busy timeout)
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        let is_new_database = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema(is_new_database).await?;

        Ok(service)
    }

    /// Get a synchronous connection handle
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get an async connection with busy timeout configured
    ///
    /// Use this in all async functions. The 5-second busy timeout makes
    /// concurrent operations wait and retry instead of failing immediately
    /// when the database is locked, which matters when the tokio runtime
    /// moves futures between threads at `.await` points.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        Ok(conn)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so query() must be used instead of
    /// execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// Idempotent (safe to call multiple times). `synchronous = FULL` under
    /// WAL means every committed transaction is flushed to durable media.
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;
        self.execute_pragma(&conn, "PRAGMA synchronous = FULL")
            .await?;
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                note TEXT,
                parent_id TEXT,
                completed INTEGER NOT NULL DEFAULT 0,
                priority INTEGER NOT NULL DEFAULT 0,
                children_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT,
                updated_at TEXT
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create nodes table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sync_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create sync_meta table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS bookmarks (
                name TEXT PRIMARY KEY,
                node_id TEXT NOT NULL,
                context TEXT,
                created_at TEXT
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create bookmarks table: {}", e))
        })?;

        self.create_core_indexes(&conn).await?;

        // Flush schema for newly created databases so rapid open/close cycles
        // in tests never observe "no such table" from unflushed WAL entries.
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    /// Create core indexes for the nodes table
    async fn create_core_indexes(&self, conn: &libsql::Connection) -> Result<(), DatabaseError> {
        let indexes = [
            ("idx_nodes_parent", "CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id)"),
            ("idx_nodes_completed", "CREATE INDEX IF NOT EXISTS idx_nodes_completed ON nodes(completed)"),
            ("idx_nodes_parent_priority", "CREATE INDEX IF NOT EXISTS idx_nodes_parent_priority ON nodes(parent_id, priority)"),
            ("idx_nodes_name", "CREATE INDEX IF NOT EXISTS idx_nodes_name ON nodes(name)"),
            ("idx_nodes_note", "CREATE INDEX IF NOT EXISTS idx_nodes_note ON nodes(note)"),
        ];

        for (name, sql) in indexes {
            conn.execute(sql, ()).await.map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to create index '{}': {}", name, e))
            })?;
        }

        Ok(())
    }

    /// Parse a timestamp column - handles both RFC 3339 and SQLite formats
    fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Some(naive.and_utc());
        }
        None
    }

    /// Convert a nodes-table row to the Node model
    ///
    /// Expected columns (in order): id, name, note, parent_id, completed,
    /// priority, children_count, created_at, updated_at.
    fn row_to_node(row: &libsql::Row) -> Result<Node, DatabaseError> {
        let id: String = row
            .get(0)
            .map_err(|e| DatabaseError::row_decode(format!("id: {}", e)))?;
        let name: String = row
            .get(1)
            .map_err(|e| DatabaseError::row_decode(format!("name: {}", e)))?;
        let note: Option<String> = row
            .get(2)
            .map_err(|e| DatabaseError::row_decode(format!("note: {}", e)))?;
        let parent_id: Option<String> = row
            .get(3)
            .map_err(|e| DatabaseError::row_decode(format!("parent_id: {}", e)))?;
        let completed: i64 = row
            .get(4)
            .map_err(|e| DatabaseError::row_decode(format!("completed: {}", e)))?;
        let priority: i64 = row
            .get(5)
            .map_err(|e| DatabaseError::row_decode(format!("priority: {}", e)))?;
        let children_count: i64 = row
            .get(6)
            .map_err(|e| DatabaseError::row_decode(format!("children_count: {}", e)))?;
        let created_at: Option<String> = row
            .get(7)
            .map_err(|e| DatabaseError::row_decode(format!("created_at: {}", e)))?;
        let updated_at: Option<String> = row
            .get(8)
            .map_err(|e| DatabaseError::row_decode(format!("updated_at: {}", e)))?;

        Ok(Node {
            id,
            name,
            note,
            parent_id,
            completed: completed != 0,
            priority,
            children_count,
            created_at: created_at.as_deref().and_then(Self::parse_timestamp),
            updated_at: updated_at.as_deref().and_then(Self::parse_timestamp),
        })
    }

    /// Collect all rows of a node query into models
    async fn collect_nodes(mut rows: libsql::Rows) -> Result<Vec<Node>, DatabaseError> {
        let mut nodes = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to fetch row: {}", e)))?
        {
            nodes.push(Self::row_to_node(&row)?);
        }
        Ok(nodes)
    }

    //
    // NODE OPERATIONS
    //

    const NODE_COLUMNS: &'static str =
        "id, name, note, parent_id, completed, priority, children_count, created_at, updated_at";

    /// Insert or overwrite a node row wholesale
    pub async fn db_upsert_node(&self, node: &Node) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute(
            "INSERT INTO nodes (id, name, note, parent_id, completed, priority, children_count, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                note = excluded.note,
                parent_id = excluded.parent_id,
                completed = excluded.completed,
                priority = excluded.priority,
                children_count = excluded.children_count,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at",
            (
                node.id.as_str(),
                node.name.as_str(),
                node.note.as_deref(),
                node.parent_id.as_deref(),
                node.completed as i64,
                node.priority,
                node.children_count,
                node.created_at.map(|dt| dt.to_rfc3339()),
                node.updated_at.map(|dt| dt.to_rfc3339()),
            ),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to upsert node {}: {}", node.id, e))
        })?;
        Ok(())
    }

    /// Overwrite a node's own fields, preserving hierarchy bookkeeping
    ///
    /// Updates name, note, completed, priority, and timestamps while leaving
    /// `parent_id` and `children_count` untouched - the single-node remote
    /// endpoint does not return either, so the locally-known values stand.
    ///
    /// Returns the number of rows affected (0 when the node is not cached).
    pub async fn db_refresh_node_fields(&self, node: &Node) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        let affected = conn
            .execute(
                "UPDATE nodes SET name = ?, note = ?, completed = ?, priority = ?,
                        created_at = ?, updated_at = ?
                 WHERE id = ?",
                (
                    node.name.as_str(),
                    node.note.as_deref(),
                    node.completed as i64,
                    node.priority,
                    node.created_at.map(|dt| dt.to_rfc3339()),
                    node.updated_at.map(|dt| dt.to_rfc3339()),
                    node.id.as_str(),
                ),
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to refresh node {}: {}", node.id, e))
            })?;
        Ok(affected)
    }

    /// Set a node's completion flag
    pub async fn db_set_completed(&self, id: &str, completed: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute(
            "UPDATE nodes SET completed = ? WHERE id = ?",
            (completed as i64, id),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to set completed on {}: {}", id, e))
        })?;
        Ok(())
    }

    /// Reparent a node, optionally updating its sibling priority
    pub async fn db_set_parent(
        &self,
        id: &str,
        parent_id: Option<&str>,
        priority: Option<i64>,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        match priority {
            Some(priority) => {
                conn.execute(
                    "UPDATE nodes SET parent_id = ?, priority = ? WHERE id = ?",
                    (parent_id, priority, id),
                )
                .await
            }
            None => {
                conn.execute(
                    "UPDATE nodes SET parent_id = ? WHERE id = ?",
                    (parent_id, id),
                )
                .await
            }
        }
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to move node {}: {}", id, e)))?;
        Ok(())
    }

    /// Fetch a single node by id
    pub async fn db_get_node(&self, id: &str) -> Result<Option<Node>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM nodes WHERE id = ?",
                Self::NODE_COLUMNS
            ))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare get_node query: {}", e))
            })?;
        let mut rows = stmt.query([id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute get_node query: {}", e))
        })?;
        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => Ok(Some(Self::row_to_node(&row)?)),
            None => Ok(None),
        }
    }

    /// Fetch the direct children of a parent, ordered by priority then name
    ///
    /// `parent_id = None` returns the top-level nodes.
    pub async fn db_get_children(
        &self,
        parent_id: Option<&str>,
    ) -> Result<Vec<Node>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        let rows = match parent_id {
            Some(parent_id) => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {} FROM nodes WHERE parent_id = ? ORDER BY priority, name",
                        Self::NODE_COLUMNS
                    ))
                    .await
                    .map_err(|e| {
                        DatabaseError::sql_execution(format!(
                            "Failed to prepare children query: {}",
                            e
                        ))
                    })?;
                stmt.query([parent_id]).await
            }
            None => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {} FROM nodes WHERE parent_id IS NULL ORDER BY priority, name",
                        Self::NODE_COLUMNS
                    ))
                    .await
                    .map_err(|e| {
                        DatabaseError::sql_execution(format!(
                            "Failed to prepare top-level query: {}",
                            e
                        ))
                    })?;
                stmt.query(()).await
            }
        }
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute children query: {}", e))
        })?;

        Self::collect_nodes(rows).await
    }

    /// Collect a node's descendant ids (the node itself excluded)
    ///
    /// Explicit work-stack walk over `parent_id` instead of a recursive CTE,
    /// so the traversal is bounded and observable. Cached cycles cannot hang
    /// the walk: every id is visited at most once.
    pub async fn db_collect_descendants(&self, id: &str) -> Result<Vec<String>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        let mut descendants = Vec::new();
        let mut visited = std::collections::HashSet::new();
        let mut stack = vec![id.to_string()];
        visited.insert(id.to_string());

        while let Some(current) = stack.pop() {
            let mut stmt = conn
                .prepare("SELECT id FROM nodes WHERE parent_id = ?")
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!(
                        "Failed to prepare descendants query: {}",
                        e
                    ))
                })?;
            let mut rows = stmt.query([current.as_str()]).await.map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to execute descendants query: {}", e))
            })?;
            while let Some(row) = rows
                .next()
                .await
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
            {
                let child_id: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::row_decode(format!("id: {}", e)))?;
                if visited.insert(child_id.clone()) {
                    descendants.push(child_id.clone());
                    stack.push(child_id);
                }
            }
        }

        Ok(descendants)
    }

    /// Delete a node and every descendant in one transaction
    ///
    /// Returns the number of rows removed. A subtree never leaves orphans
    /// behind: descendants are collected first, then all ids are deleted
    /// atomically (chunked to stay under the SQLite parameter limit).
    pub async fn db_delete_cascade(&self, id: &str) -> Result<u64, DatabaseError> {
        let mut ids = self.db_collect_descendants(id).await?;
        ids.push(id.to_string());

        let conn = self.connect_with_timeout().await?;
        conn.execute("BEGIN TRANSACTION", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e))
        })?;

        let mut deleted = 0u64;
        for chunk in ids.chunks(500) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("DELETE FROM nodes WHERE id IN ({})", placeholders);
            let params: Vec<libsql::Value> = chunk
                .iter()
                .map(|id| libsql::Value::Text(id.clone()))
                .collect();
            match conn.execute(&sql, libsql::params_from_iter(params)).await {
                Ok(n) => deleted += n,
                Err(e) => {
                    let _rollback = conn.execute("ROLLBACK", ()).await;
                    return Err(DatabaseError::sql_execution(format!(
                        "Failed to cascade delete {}: {}",
                        id, e
                    )));
                }
            }
        }

        conn.execute("COMMIT", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(deleted)
    }

    /// Replace the entire node table with a fresh snapshot, atomically
    ///
    /// Used by full sync. Deletes every existing row and bulk-inserts the
    /// snapshot inside one transaction; any failure rolls back and leaves
    /// the previous snapshot byte-for-byte intact.
    pub async fn db_replace_all_nodes(&self, nodes: &[Node]) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("BEGIN TRANSACTION", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e))
        })?;

        if let Err(e) = conn.execute("DELETE FROM nodes", ()).await {
            let _rollback = conn.execute("ROLLBACK", ()).await;
            return Err(DatabaseError::sql_execution(format!(
                "Failed to clear nodes table: {}",
                e
            )));
        }

        for node in nodes {
            let result = conn
                .execute(
                    "INSERT INTO nodes (id, name, note, parent_id, completed, priority, children_count, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    (
                        node.id.as_str(),
                        node.name.as_str(),
                        node.note.as_deref(),
                        node.parent_id.as_deref(),
                        node.completed as i64,
                        node.priority,
                        node.children_count,
                        node.created_at.map(|dt| dt.to_rfc3339()),
                        node.updated_at.map(|dt| dt.to_rfc3339()),
                    ),
                )
                .await;

            if let Err(e) = result {
                let _rollback = conn.execute("ROLLBACK", ()).await;
                return Err(DatabaseError::sql_execution(format!(
                    "Failed to insert node {}: {}",
                    node.id, e
                )));
            }
        }

        conn.execute("COMMIT", ()).await.map_err(|e| {
            std::mem::drop(conn.execute("ROLLBACK", ()));
            DatabaseError::sql_execution(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(())
    }

    /// Count all mirrored nodes
    pub async fn db_count_nodes(&self) -> Result<i64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        let mut stmt = conn
            .prepare("SELECT COUNT(*) FROM nodes")
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare count query: {}", e))
            })?;
        let mut rows = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute count query: {}", e))
        })?;
        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
            .ok_or_else(|| DatabaseError::sql_execution("COUNT(*) returned no row".to_string()))?;
        row.get(0)
            .map_err(|e| DatabaseError::row_decode(format!("count: {}", e)))
    }

    /// Adjust a node's cached child count by a signed delta (floored at 0)
    pub async fn db_adjust_children_count(
        &self,
        id: &str,
        delta: i64,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute(
            "UPDATE nodes SET children_count = MAX(0, children_count + ?) WHERE id = ?",
            (delta, id),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to adjust children_count of {}: {}", id, e))
        })?;
        Ok(())
    }

    /// Set a node's cached child count to an exact value
    pub async fn db_set_children_count(&self, id: &str, count: i64) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute(
            "UPDATE nodes SET children_count = ? WHERE id = ?",
            (count, id),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to set children_count of {}: {}", id, e))
        })?;
        Ok(())
    }

    //
    // SEARCH CANDIDATE QUERIES
    //
    // Coarse LIKE-based pre-filtering for the fuzzy search engine. All text
    // is matched case-insensitively (SQLite LIKE) with %/_/\ escaped so user
    // input is always a literal substring.
    //

    /// Nodes whose name or note contains the exact phrase (unbounded)
    pub async fn db_find_by_phrase(&self, phrase: &str) -> Result<Vec<Node>, DatabaseError> {
        let pattern = like_pattern(phrase);
        let conn = self.connect_with_timeout().await?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM nodes
                 WHERE name LIKE ? ESCAPE '\\' OR note LIKE ? ESCAPE '\\'",
                Self::NODE_COLUMNS
            ))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare phrase query: {}", e))
            })?;
        let rows = stmt
            .query([pattern.as_str(), pattern.as_str()])
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to execute phrase query: {}", e))
            })?;
        Self::collect_nodes(rows).await
    }

    /// Nodes containing every query word somewhere in name or note (bounded)
    pub async fn db_find_all_words(&self, words: &[String]) -> Result<Vec<Node>, DatabaseError> {
        self.db_find_by_words(words, " AND ").await
    }

    /// Nodes containing at least one query word in name or note (bounded)
    pub async fn db_find_any_word(&self, words: &[String]) -> Result<Vec<Node>, DatabaseError> {
        self.db_find_by_words(words, " OR ").await
    }

    async fn db_find_by_words(
        &self,
        words: &[String],
        joiner: &str,
    ) -> Result<Vec<Node>, DatabaseError> {
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let clause = words
            .iter()
            .map(|_| "(name LIKE ? ESCAPE '\\' OR note LIKE ? ESCAPE '\\')")
            .collect::<Vec<_>>()
            .join(joiner);
        let sql = format!(
            "SELECT {} FROM nodes WHERE {} LIMIT {}",
            Self::NODE_COLUMNS,
            clause,
            CANDIDATE_PASS_LIMIT
        );

        let mut params: Vec<libsql::Value> = Vec::with_capacity(words.len() * 2);
        for word in words {
            let pattern = like_pattern(word);
            params.push(libsql::Value::Text(pattern.clone()));
            params.push(libsql::Value::Text(pattern));
        }

        let conn = self.connect_with_timeout().await?;
        let mut stmt = conn.prepare(&sql).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to prepare word query: {}", e))
        })?;
        let rows = stmt
            .query(libsql::params_from_iter(params))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to execute word query: {}", e))
            })?;
        Self::collect_nodes(rows).await
    }

    //
    // SYNC META OPERATIONS
    //

    /// Read a sync_meta value
    pub async fn db_get_meta(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        let mut stmt = conn
            .prepare("SELECT value FROM sync_meta WHERE key = ?")
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare meta query: {}", e))
            })?;
        let mut rows = stmt.query([key]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute meta query: {}", e))
        })?;
        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => Ok(Some(row.get(0).map_err(|e| {
                DatabaseError::row_decode(format!("meta value: {}", e))
            })?)),
            None => Ok(None),
        }
    }

    /// Write a sync_meta value
    pub async fn db_set_meta(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute(
            "INSERT INTO sync_meta (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, value),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to set meta '{}': {}", key, e))
        })?;
        Ok(())
    }

    //
    // BOOKMARK OPERATIONS
    //

    /// Insert or overwrite a bookmark
    pub async fn db_upsert_bookmark(&self, bookmark: &Bookmark) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute(
            "INSERT INTO bookmarks (name, node_id, context, created_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET
                node_id = excluded.node_id,
                context = excluded.context",
            (
                bookmark.name.as_str(),
                bookmark.node_id.as_str(),
                bookmark.context.as_deref(),
                bookmark.created_at.map(|dt| dt.to_rfc3339()),
            ),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to upsert bookmark '{}': {}",
                bookmark.name, e
            ))
        })?;
        Ok(())
    }

    /// Fetch a bookmark by name
    pub async fn db_get_bookmark(&self, name: &str) -> Result<Option<Bookmark>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        let mut stmt = conn
            .prepare("SELECT name, node_id, context, created_at FROM bookmarks WHERE name = ?")
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare bookmark query: {}", e))
            })?;
        let mut rows = stmt.query([name]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute bookmark query: {}", e))
        })?;
        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => Ok(Some(Self::row_to_bookmark(&row)?)),
            None => Ok(None),
        }
    }

    /// List all bookmarks ordered by name
    pub async fn db_list_bookmarks(&self) -> Result<Vec<Bookmark>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        let mut stmt = conn
            .prepare("SELECT name, node_id, context, created_at FROM bookmarks ORDER BY name")
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare bookmarks query: {}", e))
            })?;
        let mut rows = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute bookmarks query: {}", e))
        })?;
        let mut bookmarks = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            bookmarks.push(Self::row_to_bookmark(&row)?);
        }
        Ok(bookmarks)
    }

    /// Delete a bookmark; returns the number of rows removed
    pub async fn db_delete_bookmark(&self, name: &str) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute("DELETE FROM bookmarks WHERE name = ?", [name])
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to delete bookmark '{}': {}", name, e))
            })
    }

    fn row_to_bookmark(row: &libsql::Row) -> Result<Bookmark, DatabaseError> {
        let name: String = row
            .get(0)
            .map_err(|e| DatabaseError::row_decode(format!("bookmark name: {}", e)))?;
        let node_id: String = row
            .get(1)
            .map_err(|e| DatabaseError::row_decode(format!("bookmark node_id: {}", e)))?;
        let context: Option<String> = row
            .get(2)
            .map_err(|e| DatabaseError::row_decode(format!("bookmark context: {}", e)))?;
        let created_at: Option<String> = row
            .get(3)
            .map_err(|e| DatabaseError::row_decode(format!("bookmark created_at: {}", e)))?;

        Ok(Bookmark {
            name,
            node_id,
            context,
            created_at: created_at.as_deref().and_then(Self::parse_timestamp),
        })
    }
}

/// Build a `%term%` LIKE pattern with `\`, `%`, and `_` escaped
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_db() -> (DatabaseService, TempDir) {
        let temp_dir = TempDir::new().expect("temp dir");
        let db_path = temp_dir.path().join("test.db");
        let db = DatabaseService::new(db_path).await.expect("open db");
        (db, temp_dir)
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("plain"), "%plain%");
        assert_eq!(like_pattern("50%_done"), "%50\\%\\_done%");
        assert_eq!(like_pattern("back\\slash"), "%back\\\\slash%");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(DatabaseService::parse_timestamp("2025-06-01T12:30:00Z").is_some());
        assert!(DatabaseService::parse_timestamp("2025-06-01 12:30:00").is_some());
        assert!(DatabaseService::parse_timestamp("not a date").is_none());
    }

    #[tokio::test]
    async fn test_upsert_and_get_node() {
        let (db, _tmp) = create_test_db().await;

        let node = Node::new("n1", "Inbox", None).with_note("catch-all");
        db.db_upsert_node(&node).await.unwrap();

        let fetched = db.db_get_node("n1").await.unwrap().unwrap();
        assert_eq!(fetched.name, "Inbox");
        assert_eq!(fetched.note.as_deref(), Some("catch-all"));

        // Upsert overwrites wholesale
        let renamed = Node::new("n1", "Inbox 2", None);
        db.db_upsert_node(&renamed).await.unwrap();
        let fetched = db.db_get_node("n1").await.unwrap().unwrap();
        assert_eq!(fetched.name, "Inbox 2");
        assert!(fetched.note.is_none());
    }

    #[tokio::test]
    async fn test_children_ordering() {
        let (db, _tmp) = create_test_db().await;

        db.db_upsert_node(&Node::new("p", "Parent", None))
            .await
            .unwrap();
        db.db_upsert_node(&Node::new("b", "Beta", Some("p")).with_priority(2))
            .await
            .unwrap();
        db.db_upsert_node(&Node::new("a", "Alpha", Some("p")).with_priority(2))
            .await
            .unwrap();
        db.db_upsert_node(&Node::new("z", "Zulu", Some("p")).with_priority(1))
            .await
            .unwrap();

        let children = db.db_get_children(Some("p")).await.unwrap();
        let names: Vec<_> = children.iter().map(|n| n.name.as_str()).collect();
        // Priority first, then name breaks the tie
        assert_eq!(names, vec!["Zulu", "Alpha", "Beta"]);
    }

    #[tokio::test]
    async fn test_cascade_delete_removes_subtree() {
        let (db, _tmp) = create_test_db().await;

        db.db_upsert_node(&Node::new("root", "Root", None))
            .await
            .unwrap();
        db.db_upsert_node(&Node::new("c1", "Child 1", Some("root")))
            .await
            .unwrap();
        db.db_upsert_node(&Node::new("c2", "Child 2", Some("root")))
            .await
            .unwrap();
        db.db_upsert_node(&Node::new("gc1", "Grandchild", Some("c1")))
            .await
            .unwrap();

        let deleted = db.db_delete_cascade("root").await.unwrap();
        assert_eq!(deleted, 4);
        assert_eq!(db.db_count_nodes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_refresh_preserves_parent_and_count() {
        let (db, _tmp) = create_test_db().await;

        let mut node = Node::new("n1", "Original", Some("p1"));
        node.children_count = 7;
        db.db_upsert_node(&node).await.unwrap();

        // A single-node refresh carries no parent or count
        let fresh = Node::new("n1", "Renamed", None).with_completed(true);
        let affected = db.db_refresh_node_fields(&fresh).await.unwrap();
        assert_eq!(affected, 1);

        let fetched = db.db_get_node("n1").await.unwrap().unwrap();
        assert_eq!(fetched.name, "Renamed");
        assert!(fetched.completed);
        assert_eq!(fetched.parent_id.as_deref(), Some("p1"));
        assert_eq!(fetched.children_count, 7);
    }

    #[tokio::test]
    async fn test_replace_all_nodes() {
        let (db, _tmp) = create_test_db().await;

        db.db_upsert_node(&Node::new("old", "Old", None))
            .await
            .unwrap();

        let snapshot = vec![
            Node::new("a", "A", None),
            Node::new("b", "B", Some("a")),
        ];
        db.db_replace_all_nodes(&snapshot).await.unwrap();

        assert_eq!(db.db_count_nodes().await.unwrap(), 2);
        assert!(db.db_get_node("old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_meta_roundtrip() {
        let (db, _tmp) = create_test_db().await;

        assert!(db.db_get_meta(META_LAST_FULL_SYNC).await.unwrap().is_none());
        db.db_set_meta(META_LAST_FULL_SYNC, "2025-06-01T00:00:00Z")
            .await
            .unwrap();
        assert_eq!(
            db.db_get_meta(META_LAST_FULL_SYNC).await.unwrap().as_deref(),
            Some("2025-06-01T00:00:00Z")
        );
        db.db_set_meta(META_LAST_FULL_SYNC, "2025-06-02T00:00:00Z")
            .await
            .unwrap();
        assert_eq!(
            db.db_get_meta(META_LAST_FULL_SYNC).await.unwrap().as_deref(),
            Some("2025-06-02T00:00:00Z")
        );
    }

    #[tokio::test]
    async fn test_bookmark_roundtrip() {
        let (db, _tmp) = create_test_db().await;

        let bookmark = Bookmark::new("inbox", "n1", Some("default capture point".into()));
        db.db_upsert_bookmark(&bookmark).await.unwrap();

        let fetched = db.db_get_bookmark("inbox").await.unwrap().unwrap();
        assert_eq!(fetched.node_id, "n1");
        assert_eq!(fetched.context.as_deref(), Some("default capture point"));

        assert_eq!(db.db_list_bookmarks().await.unwrap().len(), 1);
        assert_eq!(db.db_delete_bookmark("inbox").await.unwrap(), 1);
        assert!(db.db_get_bookmark("inbox").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_word_queries_escape_wildcards() {
        let (db, _tmp) = create_test_db().await;

        db.db_upsert_node(&Node::new("n1", "50%_done report", None))
            .await
            .unwrap();
        db.db_upsert_node(&Node::new("n2", "500 done", None))
            .await
            .unwrap();

        // A literal "%" must not act as a wildcard
        let hits = db.db_find_by_phrase("50%_done").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "n1");
    }
}
