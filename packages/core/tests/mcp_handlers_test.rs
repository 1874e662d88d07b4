//! End-to-end tests through the MCP handler surface: auto-sync on first
//! read, optimistic write visibility, clamping, and error codes.

mod common;

use common::{seed_fixture_tree, test_env, test_env_with};
use outmirror_core::mcp::handlers::tools::dispatch_tool;
use outmirror_core::mcp::types;
use outmirror_core::services::SyncConfig;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::time::Duration;

#[tokio::test]
async fn test_search_on_empty_cache_triggers_full_sync() {
    let env = test_env().await;
    seed_fixture_tree(&env.remote);

    // No sync has ever run; the read itself must warm the mirror
    assert_eq!(env.db.db_count_nodes().await.unwrap(), 0);

    let result = dispatch_tool(&env.ctx, "search_nodes", json!({"query": "tasks"}))
        .await
        .unwrap();

    assert_eq!(result["cacheStatus"], "populated");
    assert_eq!(env.remote.export_calls.load(Ordering::SeqCst), 1);

    let results = result["results"].as_array().unwrap();
    assert!(!results.is_empty());

    // Ordered by score descending, each with a non-empty breadcrumb path
    let mut last = f64::INFINITY;
    for hit in results {
        let score = hit["score"].as_f64().unwrap();
        assert!(score <= last);
        last = score;
        assert!(!hit["path"].as_array().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_search_empty_mirror_with_remote_down_is_cache_empty() {
    let env = test_env().await;
    env.remote.fail_export.store(true, Ordering::SeqCst);

    let err = dispatch_tool(&env.ctx, "search_nodes", json!({"query": "anything"}))
        .await
        .unwrap_err();
    assert_eq!(err.code, types::CACHE_EMPTY);
}

#[tokio::test]
async fn test_create_then_read_subtree_shows_child_without_sync() {
    let env = test_env().await;
    seed_fixture_tree(&env.remote);
    env.ctx.sync.full_sync().await.unwrap();

    let created = dispatch_tool(
        &env.ctx,
        "create_node",
        json!({"parent_id": "p1", "name": "Optimistic child", "priority": 99}),
    )
    .await
    .unwrap();
    let new_id = created["node"]["id"].as_str().unwrap().to_string();

    // Immediately-following read, no explicit sync in between
    let subtree = dispatch_tool(
        &env.ctx,
        "read_subtree",
        json!({"node_id": "p1", "depth": 1}),
    )
    .await
    .unwrap();

    let children = subtree["nodes"].as_array().unwrap();
    assert!(
        children.iter().any(|c| c["id"] == new_id.as_str()),
        "new child missing from {:?}",
        children
    );
}

#[tokio::test]
async fn test_read_subtree_outline_format() {
    let env = test_env().await;
    seed_fixture_tree(&env.remote);
    env.ctx.sync.full_sync().await.unwrap();

    let result = dispatch_tool(
        &env.ctx,
        "read_subtree",
        json!({"node_id": "p1", "depth": 2, "format": "outline"}),
    )
    .await
    .unwrap();

    let outline = result["outline"].as_str().unwrap();
    assert!(outline.contains("- Today Tasks (2)"));
    assert!(outline.contains("  - Review budget"));
}

#[tokio::test]
async fn test_read_subtree_clamps_depth() {
    let env = test_env().await;
    seed_fixture_tree(&env.remote);
    env.ctx.sync.full_sync().await.unwrap();

    let result = dispatch_tool(&env.ctx, "read_subtree", json!({"depth": 99}))
        .await
        .unwrap();
    assert_eq!(result["depth"], 10);
}

#[tokio::test]
async fn test_read_subtree_excludes_named_branches() {
    let env = test_env().await;
    seed_fixture_tree(&env.remote);
    env.ctx.sync.full_sync().await.unwrap();

    let result = dispatch_tool(
        &env.ctx,
        "read_subtree",
        json!({"depth": 2, "exclude_names": ["personal"]}),
    )
    .await
    .unwrap();

    let top: Vec<&str> = result["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["name"].as_str().unwrap())
        .collect();
    assert!(top.contains(&"Work"));
    assert!(!top.contains(&"Personal"));
}

#[tokio::test]
async fn test_depth_boundary_still_reports_children_count() {
    let env = test_env().await;
    seed_fixture_tree(&env.remote);
    env.ctx.sync.full_sync().await.unwrap();

    let result = dispatch_tool(&env.ctx, "read_subtree", json!({"depth": 1}))
        .await
        .unwrap();

    let work = result["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["name"] == "Work")
        .unwrap();
    // Not expanded at depth 1, but the boundary is visible
    assert!(work["children"].as_array().unwrap().is_empty());
    assert_eq!(work["childrenCount"], 1);
}

#[tokio::test]
async fn test_force_sync_rate_limited_error_code() {
    let env = test_env_with(SyncConfig {
        min_full_sync_interval: Duration::from_secs(60),
        ..SyncConfig::default()
    })
    .await;
    seed_fixture_tree(&env.remote);

    let first = dispatch_tool(&env.ctx, "force_sync", json!({})).await.unwrap();
    assert_eq!(first["synced"], true);
    assert_eq!(first["nodeCount"], 6);

    let err = dispatch_tool(&env.ctx, "force_sync", json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.code, types::RATE_LIMITED);
    assert!(err.message.contains("retry"));
}

#[tokio::test]
async fn test_bookmark_flow_with_targeted_refresh() {
    let env = test_env().await;
    seed_fixture_tree(&env.remote);
    env.ctx.sync.full_sync().await.unwrap();

    dispatch_tool(
        &env.ctx,
        "set_bookmark",
        json!({"name": "today", "node_id": "t1", "context": "daily working set"}),
    )
    .await
    .unwrap();

    // The outline changes remotely after our last sync
    env.remote.seed("t4", "Call plumber", Some("t1"), 3);

    let result = dispatch_tool(&env.ctx, "get_bookmark", json!({"name": "today"}))
        .await
        .unwrap();

    // The bookmark read refreshed the child list on its way in
    let children: Vec<&str> = result["children"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert!(children.contains(&"Call plumber"));

    let listed = dispatch_tool(&env.ctx, "list_bookmarks", json!({}))
        .await
        .unwrap();
    assert_eq!(listed["count"], 1);

    let deleted = dispatch_tool(&env.ctx, "delete_bookmark", json!({"name": "today"}))
        .await
        .unwrap();
    assert_eq!(deleted["deleted"], true);

    let err = dispatch_tool(&env.ctx, "get_bookmark", json!({"name": "today"}))
        .await
        .unwrap_err();
    assert_eq!(err.code, types::BOOKMARK_NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_tool_is_method_not_found() {
    let env = test_env().await;
    let err = dispatch_tool(&env.ctx, "explode", json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.code, types::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn test_get_node_missing_is_node_not_found() {
    let env = test_env().await;
    seed_fixture_tree(&env.remote);
    env.ctx.sync.full_sync().await.unwrap();

    let err = dispatch_tool(&env.ctx, "get_node", json!({"node_id": "ghost"}))
        .await
        .unwrap_err();
    assert_eq!(err.code, types::NODE_NOT_FOUND);
}
