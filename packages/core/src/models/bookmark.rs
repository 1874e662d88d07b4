//! Bookmark Data Structures
//!
//! Named shortcuts into the outline. A bookmark pins a node id under a
//! human-memorable name so agents can jump to well-known subtrees without
//! searching, and so the sync engine can target those subtrees for refresh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named shortcut to an outline node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    /// Unique bookmark name (primary key)
    pub name: String,

    /// Target node id
    pub node_id: String,

    /// Free-text description of what lives under the target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// When the bookmark was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Bookmark {
    /// Create a bookmark with the creation time set to now.
    pub fn new(
        name: impl Into<String>,
        node_id: impl Into<String>,
        context: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            node_id: node_id.into(),
            context,
            created_at: Some(Utc::now()),
        }
    }
}
