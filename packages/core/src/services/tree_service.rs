//! Tree Builder
//!
//! Reconstructs nested subtrees from the flat cache rows and renders them
//! either as structured records or as a compact indented outline for direct
//! display.
//!
//! The builder is a pure reader of the cache store. Depth is always clamped
//! to [`MAX_TREE_DEPTH`], siblings are ordered by `priority` then `name`,
//! and every [`TreeNode`] carries `children_count` even when its children
//! are not expanded - a depth-limited boundary stays distinguishable from a
//! true leaf.

use crate::db::DatabaseService;
use crate::models::Node;
use crate::services::error::ServiceError;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Hard ceiling on subtree depth, bounding recursion and row volume
pub const MAX_TREE_DEPTH: usize = 10;

/// A node with its expanded children
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    #[serde(flatten)]
    pub node: Node,

    /// Expanded children (empty at the depth boundary; check
    /// `childrenCount` to tell a boundary from a leaf)
    pub children: Vec<TreeNode>,
}

/// Assembles subtrees from the flat mirror
pub struct TreeService {
    db: Arc<DatabaseService>,
}

impl TreeService {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Build the subtree under `root_id` (`None` = top level) to `depth`
    ///
    /// `depth` counts levels of children below the root: depth 1 returns the
    /// direct children only. Values are clamped to `1..=MAX_TREE_DEPTH`.
    /// Nodes whose name matches `exclude_names` (case-insensitive) are
    /// omitted along with their subtrees - used to hide nodes that should
    /// only be reached via a bookmark.
    pub async fn build_subtree(
        &self,
        root_id: Option<&str>,
        depth: usize,
        exclude_names: &[String],
    ) -> Result<Vec<TreeNode>, ServiceError> {
        let depth = depth.clamp(1, MAX_TREE_DEPTH);
        let excluded: Vec<String> = exclude_names.iter().map(|n| n.to_lowercase()).collect();

        // Collect rows level by level, then assemble. Avoids async recursion
        // and issues exactly one child query per expanded node. The visited
        // set tolerates accidental parent cycles in cached data: an id is
        // expanded at most once, so neither phase can loop forever.
        let mut children_of: HashMap<Option<String>, Vec<Node>> = HashMap::new();
        let mut visited: HashSet<String> = HashSet::new();
        let root_key = root_id.map(str::to_string);
        if let Some(root) = &root_key {
            visited.insert(root.clone());
        }
        let mut frontier: Vec<(Option<String>, usize)> = vec![(root_key.clone(), depth)];

        while let Some((parent, remaining)) = frontier.pop() {
            let children = self.db.db_get_children(parent.as_deref()).await?;
            let kept: Vec<Node> = children
                .into_iter()
                .filter(|n| !excluded.contains(&n.name.to_lowercase()))
                .collect();

            if remaining > 1 {
                for child in &kept {
                    if visited.insert(child.id.clone()) {
                        frontier.push((Some(child.id.clone()), remaining - 1));
                    }
                }
            }
            children_of.insert(parent, kept);
        }

        let mut assembled: HashSet<String> = HashSet::new();
        Ok(Self::assemble(&root_key, &children_of, &mut assembled))
    }

    fn assemble(
        parent: &Option<String>,
        children_of: &HashMap<Option<String>, Vec<Node>>,
        assembled: &mut HashSet<String>,
    ) -> Vec<TreeNode> {
        let Some(children) = children_of.get(parent) else {
            return Vec::new();
        };
        children
            .iter()
            .map(|node| {
                let subtree = if assembled.insert(node.id.clone()) {
                    Self::assemble(&Some(node.id.clone()), children_of, assembled)
                } else {
                    Vec::new()
                };
                TreeNode {
                    node: node.clone(),
                    children: subtree,
                }
            })
            .collect()
    }

    /// Render a subtree as a compact indented outline
    ///
    /// One bullet line per node with a completion marker and a child-count
    /// annotation, notes on their own indented lines:
    ///
    /// ```text
    /// - Groceries (3)
    ///   note: weekly run
    ///   - Milk
    ///   - Eggs [done]
    /// ```
    pub fn render_outline(trees: &[TreeNode]) -> String {
        let mut out = String::new();
        Self::render_level(trees, 0, &mut out);
        out
    }

    fn render_level(trees: &[TreeNode], level: usize, out: &mut String) {
        let indent = "  ".repeat(level);
        for tree in trees {
            out.push_str(&indent);
            out.push_str("- ");
            out.push_str(&tree.node.name);
            if tree.node.completed {
                out.push_str(" [done]");
            }
            if tree.node.children_count > 0 {
                out.push_str(&format!(" ({})", tree.node.children_count));
            }
            out.push('\n');

            if let Some(note) = &tree.node.note {
                for line in note.lines() {
                    out.push_str(&indent);
                    out.push_str("  note: ");
                    out.push_str(line);
                    out.push('\n');
                }
            }

            Self::render_level(&tree.children, level + 1, out);
        }
    }
}
