//! Node Data Structures
//!
//! This module defines the `Node` struct, the single record type for every
//! mirrored outline item.
//!
//! # Architecture
//!
//! - **Flat mirror rows**: The cache stores one flat row per remote node;
//!   hierarchy is reconstructed at read time from `parent_id`
//! - **Source-of-truth ordering**: `priority` orders siblings; ties break on
//!   `name`
//! - **Denormalized child counts**: `children_count` caches
//!   `count(*) WHERE parent_id = id` and may lag reality between a write and
//!   its reconciling resync; consumers must tolerate staleness of this one
//!   field
//!
//! # Examples
//!
//! ```rust
//! use outmirror_core::models::Node;
//!
//! let groceries = Node::new("abc-123", "Groceries", None);
//! let milk = Node::new("def-456", "Milk", Some("abc-123"))
//!     .with_note("2% if they have it")
//!     .with_priority(1);
//! assert_eq!(milk.parent_id.as_deref(), Some("abc-123"));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A mirrored outline node.
///
/// # Fields
///
/// - `id`: Opaque stable identifier assigned by the remote service
/// - `name`: Primary text of the node
/// - `note`: Optional secondary text
/// - `parent_id`: Reference to the parent node (`None` = top-level)
/// - `completed`: Completion flag
/// - `priority`: Sort order among siblings (lower sorts first)
/// - `children_count`: Cached count of direct children (best-effort)
/// - `created_at` / `updated_at`: Remote timestamps when known
///
/// # Invariants
///
/// The `parent_id` relation must stay acyclic and ids are globally unique;
/// both are enforced by the sync engine, not by this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Opaque stable identifier (primary key in the cache)
    pub id: String,

    /// Primary text of the node
    pub name: String,

    /// Optional secondary text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Parent node id (`None` = top-level)
    #[serde(default)]
    pub parent_id: Option<String>,

    /// Completion flag
    #[serde(default)]
    pub completed: bool,

    /// Sort order among siblings (lower sorts first)
    #[serde(default)]
    pub priority: i64,

    /// Cached count of direct children; may transiently lag reality
    #[serde(default)]
    pub children_count: i64,

    /// Remote creation timestamp when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Remote modification timestamp when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Node {
    /// Create a new node with the given id, name, and parent.
    ///
    /// All other fields start at their defaults (`note: None`,
    /// `completed: false`, `priority: 0`, `children_count: 0`, no
    /// timestamps). Mostly useful in tests and in the optimistic write path;
    /// sync paths build nodes from remote payloads instead.
    pub fn new(id: impl Into<String>, name: impl Into<String>, parent_id: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            note: None,
            parent_id: parent_id.map(str::to_string),
            completed: false,
            priority: 0,
            children_count: 0,
            created_at: None,
            updated_at: None,
        }
    }

    /// Set the note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Set the sibling priority.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Set the completion flag.
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_defaults() {
        let node = Node::new("id-1", "Inbox", None);
        assert_eq!(node.id, "id-1");
        assert_eq!(node.name, "Inbox");
        assert!(node.note.is_none());
        assert!(node.parent_id.is_none());
        assert!(!node.completed);
        assert_eq!(node.priority, 0);
        assert_eq!(node.children_count, 0);
    }

    #[test]
    fn test_serde_camel_case() {
        let node = Node::new("id-1", "Inbox", Some("root-1")).with_priority(3);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["parentId"], "root-1");
        assert_eq!(value["childrenCount"], 0);
        assert_eq!(value["priority"], 3);
        // Absent optionals are omitted entirely
        assert!(value.get("note").is_none());
    }

    #[test]
    fn test_deserialize_minimal_payload() {
        let node: Node = serde_json::from_str(r#"{"id": "x", "name": "Only name"}"#).unwrap();
        assert_eq!(node.name, "Only name");
        assert!(!node.completed);
        assert_eq!(node.children_count, 0);
    }
}
