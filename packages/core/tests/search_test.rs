//! Search integration tests: ranking properties over a real mirror and the
//! auto-sync-on-first-read flow.

mod common;

use common::{seed_fixture_tree, test_env};
use outmirror_core::services::ServiceError;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_exact_phrase_ranks_above_reordered_words() {
    let env = test_env().await;
    env.remote.seed("root", "Lists", None, 1);
    env.remote.seed("n1", "Today Tasks", Some("root"), 1);
    env.remote.seed("n2", "Tasks for Today Later", Some("root"), 2);
    env.ctx.sync.full_sync().await.unwrap();

    let hits = env.ctx.search.search("today tasks", 10).await.unwrap();
    assert!(hits.len() >= 2);
    assert_eq!(hits[0].node.id, "n1");
    assert!(hits[0].score > hits[1].score);
}

#[tokio::test]
async fn test_substring_penalty_body_vs_somebody() {
    let env = test_env().await;
    env.remote.seed("n1", "somebody", None, 1);
    env.remote.seed("n2", "body", None, 2);
    env.ctx.sync.full_sync().await.unwrap();

    let hits = env.ctx.search.search("body", 10).await.unwrap();
    assert_eq!(hits[0].node.id, "n2");
    let somebody = hits.iter().find(|h| h.node.id == "n1");
    if let Some(somebody) = somebody {
        assert!(hits[0].score > somebody.score);
    }
}

#[tokio::test]
async fn test_results_are_sorted_descending_and_limited() {
    let env = test_env().await;
    env.remote.seed("root", "Projects", None, 1);
    for i in 0..10 {
        env.remote.seed(
            &format!("n{}", i),
            &format!("Project plan {}", i),
            Some("root"),
            i,
        );
    }
    env.ctx.sync.full_sync().await.unwrap();

    let hits = env.ctx.search.search("project plan", 5).await.unwrap();
    assert_eq!(hits.len(), 5);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn test_note_matches_are_found_but_rank_below_name_matches() {
    let env = test_env().await;
    env.remote.seed("n1", "Quarterly report", None, 1);
    env.remote
        .seed_with_note("n2", "Misc", None, 2, "drafts of the quarterly report");
    env.ctx.sync.full_sync().await.unwrap();

    let hits = env.ctx.search.search("quarterly report", 10).await.unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h.node.id.as_str()).collect();
    assert!(ids.contains(&"n1"));
    assert!(ids.contains(&"n2"));
    assert_eq!(ids[0], "n1");
}

#[tokio::test]
async fn test_breadcrumbs_walk_to_the_top() {
    let env = test_env().await;
    seed_fixture_tree(&env.remote);
    env.ctx.sync.full_sync().await.unwrap();

    let hits = env.ctx.search.search("review budget", 5).await.unwrap();
    let hit = hits.iter().find(|h| h.node.id == "t2").expect("t2 found");
    assert_eq!(hit.path, vec!["Work", "Today Tasks", "Review budget"]);
}

#[tokio::test]
async fn test_breadcrumb_cycle_guard_terminates() {
    let env = test_env().await;
    seed_fixture_tree(&env.remote);
    env.ctx.sync.full_sync().await.unwrap();

    // Corrupt the cache into a parent cycle; the walk must still terminate
    use outmirror_core::models::Node;
    let mut a = Node::new("cyc-a", "Cycle A", Some("cyc-b"));
    a.name = "Cycle A target".into();
    env.db.db_upsert_node(&a).await.unwrap();
    env.db
        .db_upsert_node(&Node::new("cyc-b", "Cycle B", Some("cyc-a")))
        .await
        .unwrap();

    let hits = env.ctx.search.search("cycle a target", 5).await.unwrap();
    let hit = hits.iter().find(|h| h.node.id == "cyc-a").expect("found");
    // Path is finite and ends with the node itself
    assert_eq!(hit.path.last().map(String::as_str), Some("Cycle A target"));
    assert!(hit.path.len() <= 3);
}

#[tokio::test]
async fn test_children_preview_is_ordered_and_capped() {
    let env = test_env().await;
    env.remote.seed("p", "Releases", None, 1);
    for i in 0..5 {
        env.remote
            .seed(&format!("c{}", i), &format!("v0.{}", i), Some("p"), i);
    }
    env.ctx.sync.full_sync().await.unwrap();

    let hits = env.ctx.search.search("releases", 5).await.unwrap();
    let hit = hits.iter().find(|h| h.node.id == "p").expect("found");
    assert_eq!(hit.children_preview.len(), 3);
    assert_eq!(hit.children_preview[0].name, "v0.0");
    assert_eq!(hit.children_preview[2].name, "v0.2");
}

#[tokio::test]
async fn test_empty_query_is_rejected() {
    let env = test_env().await;
    seed_fixture_tree(&env.remote);
    env.ctx.sync.full_sync().await.unwrap();

    let result = env.ctx.search.search("   ", 5).await;
    assert!(matches!(result, Err(ServiceError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_no_matches_returns_empty_not_error() {
    let env = test_env().await;
    seed_fixture_tree(&env.remote);
    env.ctx.sync.full_sync().await.unwrap();

    let hits = env
        .ctx
        .search
        .search("xylophone zeppelin", 5)
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_search_survives_unsynced_mirror_with_manual_rows() {
    // The engine itself is a pure reader: it ranks whatever rows exist
    let env = test_env().await;
    env.db
        .db_upsert_node(&outmirror_core::models::Node::new("x", "Standalone row", None))
        .await
        .unwrap();

    let hits = env.ctx.search.search("standalone row", 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(env.remote.export_calls.load(Ordering::SeqCst), 0);
}
