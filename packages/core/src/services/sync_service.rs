//! Sync Engine
//!
//! Keeps the local mirror consistent with the remote outline service:
//!
//! - **Full sync**: rate-limited wholesale replacement of the node table,
//!   transactional so a failure preserves the previous snapshot untouched
//! - **Freshness check**: opportunistic, called before reads; degrades to a
//!   soft "serving stale" signal instead of blocking or erroring
//! - **Partial sync**: targeted refresh of one node or one parent's child
//!   list; the child diff is how remote deletions and moves become visible
//!   without a full resync
//!
//! # Lease
//!
//! `sync_in_progress` + `sync_started_at` in `sync_meta` form a lease that
//! stops two full syncs from racing. A lease older than
//! [`SyncConfig::lease_timeout`] is treated as abandoned (a crashed prior
//! run) and force-cleared instead of blocking forever; the process is
//! single-instance, so liveness wins over strict mutual exclusion. The lease
//! is cleared on every exit path, success or failure.
//!
//! # State
//!
//! All mutable sync state (the rate limiter's last-call instant, the lease)
//! lives on the service instance or in the store - never in ambient globals -
//! so tests construct isolated engines.

use crate::db::{
    DatabaseService, META_LAST_FULL_SYNC, META_LAST_SYNC_NODE_COUNT, META_SYNC_IN_PROGRESS,
    META_SYNC_STARTED_AT,
};
use crate::models::Node;
use crate::remote::OutlineRemote;
use crate::services::error::ServiceError;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Tunables for the sync engine
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Minimum interval between remote export calls (the remote rate limit)
    pub min_full_sync_interval: Duration,

    /// Mirror age beyond which reads consider a full sync "needed"
    pub staleness_threshold: Duration,

    /// Lease age beyond which a `sync_in_progress` flag is considered
    /// abandoned and force-cleared
    pub lease_timeout: Duration,

    /// How many child levels a children-sync reconciles. 1 refreshes only
    /// the immediate child list; deeper levels loop per-child sequentially,
    /// trading remote-call volume against freshness depth.
    pub reconcile_depth: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            min_full_sync_interval: Duration::from_secs(60),
            staleness_threshold: Duration::from_secs(3600),
            lease_timeout: Duration::from_secs(300),
            reconcile_depth: 1,
        }
    }
}

/// Result of a completed full sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullSyncOutcome {
    /// Number of nodes in the fresh snapshot
    pub node_count: usize,
}

/// Outcome of an opportunistic freshness check before a read
#[derive(Debug, Clone, PartialEq)]
pub enum Freshness {
    /// Mirror is within the staleness threshold; nothing was done
    Fresh,

    /// A full sync was needed and ran to completion
    Refreshed { node_count: usize },

    /// A full sync was needed but could not run; the read proceeds against
    /// the stale mirror
    Stale(StaleReason),
}

/// Why a needed sync was skipped
#[derive(Debug, Clone, PartialEq)]
pub enum StaleReason {
    /// The export rate limit has not elapsed yet
    RateLimited { retry_after_secs: u64 },

    /// Another sync currently holds the lease
    SyncInProgress,

    /// The remote call or the store failed; details already logged
    RemoteUnavailable(String),
}

/// The sync engine
///
/// # Examples
///
/// ```no_run
/// # use outmirror_core::db::DatabaseService;
/// # use outmirror_core::remote::HttpOutlineClient;
/// # use outmirror_core::services::SyncService;
/// # use std::path::PathBuf;
/// # use std::sync::Arc;
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let db = Arc::new(DatabaseService::new(PathBuf::from("./mirror.db")).await?);
/// let remote = Arc::new(HttpOutlineClient::new("https://api.example.com/v1", "key")?);
/// let sync = SyncService::new(db, remote);
/// let outcome = sync.full_sync().await?;
/// println!("mirrored {} nodes", outcome.node_count);
/// # Ok(())
/// # }
/// ```
pub struct SyncService {
    db: Arc<DatabaseService>,
    remote: Arc<dyn OutlineRemote>,
    config: SyncConfig,

    /// Instant of the last remote export call (the rate limiter's only state)
    last_export_call: Mutex<Option<Instant>>,
}

impl SyncService {
    /// Create a sync engine with default tunables
    pub fn new(db: Arc<DatabaseService>, remote: Arc<dyn OutlineRemote>) -> Self {
        Self::with_config(db, remote, SyncConfig::default())
    }

    /// Create a sync engine with explicit tunables (used heavily by tests)
    pub fn with_config(
        db: Arc<DatabaseService>,
        remote: Arc<dyn OutlineRemote>,
        config: SyncConfig,
    ) -> Self {
        Self {
            db,
            remote,
            config,
            last_export_call: Mutex::new(None),
        }
    }

    /// Access the engine's configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Seconds until the rate limiter permits the next export call, if any
    fn rate_limit_remaining(&self) -> Option<u64> {
        let guard = self.last_export_call.lock().expect("rate limiter poisoned");
        let last = (*guard)?;
        let elapsed = last.elapsed();
        if elapsed >= self.config.min_full_sync_interval {
            None
        } else {
            let remaining = self.config.min_full_sync_interval - elapsed;
            // Round up so "retry in 0s" never lies
            Some(remaining.as_secs().max(1))
        }
    }

    fn mark_export_call(&self) {
        let mut guard = self.last_export_call.lock().expect("rate limiter poisoned");
        *guard = Some(Instant::now());
    }

    /// Take the sync lease, breaking a stale one
    ///
    /// Fails with [`ServiceError::SyncInProgress`] when a live lease exists.
    async fn acquire_lease(&self) -> Result<(), ServiceError> {
        let in_progress = self
            .db
            .db_get_meta(META_SYNC_IN_PROGRESS)
            .await?
            .map(|v| v == "true")
            .unwrap_or(false);

        if in_progress {
            let started_at = self
                .db
                .db_get_meta(META_SYNC_STARTED_AT)
                .await?
                .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
                .map(|dt| dt.with_timezone(&Utc));

            let lease_age = started_at.map(|dt| Utc::now().signed_duration_since(dt));
            let is_stale = match lease_age {
                Some(age) => {
                    age.num_seconds() < 0
                        || age.num_seconds() as u64 >= self.config.lease_timeout.as_secs()
                }
                // No start timestamp at all: treat as abandoned
                None => true,
            };

            if !is_stale {
                return Err(ServiceError::SyncInProgress);
            }
            warn!(
                "Breaking stale sync lease (started {:?}, timeout {:?})",
                started_at, self.config.lease_timeout
            );
        }

        self.db.db_set_meta(META_SYNC_IN_PROGRESS, "true").await?;
        self.db
            .db_set_meta(META_SYNC_STARTED_AT, &Utc::now().to_rfc3339())
            .await?;
        Ok(())
    }

    /// Clear the lease; best-effort, never propagates over the real outcome
    async fn release_lease(&self) {
        if let Err(e) = self.db.db_set_meta(META_SYNC_IN_PROGRESS, "false").await {
            warn!("Failed to clear sync lease: {}", e);
        }
    }

    /// Wholesale refresh of the mirror from the remote export endpoint
    ///
    /// Gated by the rate limiter (fails fast with a retry hint) and the
    /// lease. The snapshot replacement is a single transaction: any failure
    /// mid-way rolls back and the previous mirror is preserved untouched.
    pub async fn full_sync(&self) -> Result<FullSyncOutcome, ServiceError> {
        if let Some(retry_after_secs) = self.rate_limit_remaining() {
            return Err(ServiceError::RateLimited { retry_after_secs });
        }

        self.acquire_lease().await?;
        let result = self.full_sync_locked().await;
        self.release_lease().await;

        match &result {
            Ok(outcome) => info!("Full sync complete: {} nodes mirrored", outcome.node_count),
            Err(e) => warn!("Full sync failed: {}", e),
        }
        result
    }

    async fn full_sync_locked(&self) -> Result<FullSyncOutcome, ServiceError> {
        // Count the attempt against the rate limit before calling out, so a
        // failing remote cannot be hammered once a minute is still enforced.
        self.mark_export_call();

        let remote_nodes = self.remote.export_all().await?;

        // Denormalize child counts from the flat snapshot
        let mut counts: HashMap<String, i64> = HashMap::new();
        for node in &remote_nodes {
            if let Some(parent_id) = &node.parent_id {
                *counts.entry(parent_id.clone()).or_insert(0) += 1;
            }
        }

        let nodes: Vec<Node> = remote_nodes
            .into_iter()
            .map(|remote| {
                let mut node = remote.into_node();
                node.children_count = counts.get(&node.id).copied().unwrap_or(0);
                node
            })
            .collect();

        self.db.db_replace_all_nodes(&nodes).await?;

        self.db
            .db_set_meta(META_LAST_FULL_SYNC, &Utc::now().to_rfc3339())
            .await?;
        self.db
            .db_set_meta(META_LAST_SYNC_NODE_COUNT, &nodes.len().to_string())
            .await?;

        Ok(FullSyncOutcome {
            node_count: nodes.len(),
        })
    }

    /// Whether a full sync is currently "needed"
    ///
    /// True when the mirror is empty, when no sync has ever completed, or
    /// when the last one is older than the staleness threshold.
    pub async fn sync_needed(&self) -> Result<bool, ServiceError> {
        if self.db.db_count_nodes().await? == 0 {
            return Ok(true);
        }

        let last = self
            .db
            .db_get_meta(META_LAST_FULL_SYNC)
            .await?
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|dt| dt.with_timezone(&Utc));

        match last {
            None => Ok(true),
            Some(last) => {
                let age = Utc::now().signed_duration_since(last);
                Ok(age.num_seconds() < 0
                    || age.num_seconds() as u64 > self.config.staleness_threshold.as_secs())
            }
        }
    }

    /// Opportunistic freshness check, called before read operations
    ///
    /// Never blocks a read and never returns an error: when a needed sync
    /// cannot run (rate limit, live lease, remote down) the caller gets a
    /// [`Freshness::Stale`] signal and serves the cache it has.
    pub async fn ensure_fresh(&self) -> Freshness {
        let needed = match self.sync_needed().await {
            Ok(needed) => needed,
            Err(e) => {
                warn!("Freshness check failed, serving cache as-is: {}", e);
                return Freshness::Stale(StaleReason::RemoteUnavailable(e.to_string()));
            }
        };

        if !needed {
            return Freshness::Fresh;
        }

        match self.full_sync().await {
            Ok(outcome) => Freshness::Refreshed {
                node_count: outcome.node_count,
            },
            Err(ServiceError::RateLimited { retry_after_secs }) => {
                debug!(
                    "Sync needed but rate limited for {}s, serving stale cache",
                    retry_after_secs
                );
                Freshness::Stale(StaleReason::RateLimited { retry_after_secs })
            }
            Err(ServiceError::SyncInProgress) => {
                debug!("Sync already in progress, serving stale cache");
                Freshness::Stale(StaleReason::SyncInProgress)
            }
            Err(e) => {
                warn!("Opportunistic sync failed, serving stale cache: {}", e);
                Freshness::Stale(StaleReason::RemoteUnavailable(e.to_string()))
            }
        }
    }

    /// Refresh one node's own fields from the remote service
    ///
    /// A 404 means the node was deleted remotely and removes it (and its
    /// cached subtree) locally - that is reconciliation, not an error. The
    /// single-node endpoint returns no hierarchy data, so the locally-known
    /// `parent_id` and `children_count` are preserved.
    pub async fn sync_node(&self, id: &str) -> Result<(), ServiceError> {
        match self.remote.fetch_node(id).await {
            Ok(detail) => {
                let node = detail.into_node(None);
                let affected = self.db.db_refresh_node_fields(&node).await?;
                if affected == 0 {
                    // Not cached yet (e.g. a bookmark target fetched before
                    // any sync reached it). Parent placement is unknown until
                    // the parent's own children-sync runs.
                    debug!("Refreshed node {} was not cached, inserting detached", id);
                    self.db.db_upsert_node(&node).await?;
                }
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!("Node {} deleted remotely, removing from mirror", id);
                self.db.db_delete_cascade(id).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reconcile one parent's child list against the remote service
    ///
    /// Upserts every child the remote reports, cascade-deletes every cached
    /// child absent from the fresh list, and sets the parent's
    /// `children_count` to the fresh count. Reconciles
    /// [`SyncConfig::reconcile_depth`] levels, one remote call per visited
    /// parent.
    pub async fn sync_children(&self, parent_id: Option<&str>) -> Result<(), ServiceError> {
        self.sync_children_at(parent_id.map(str::to_string), self.config.reconcile_depth)
            .await
    }

    fn sync_children_at(
        &self,
        parent_id: Option<String>,
        depth: usize,
    ) -> Pin<Box<dyn Future<Output = Result<(), ServiceError>> + Send + '_>> {
        Box::pin(async move {
            if depth == 0 {
                return Ok(());
            }

            let fresh = self.remote.list_children(parent_id.as_deref()).await?;
            let cached = self.db.db_get_children(parent_id.as_deref()).await?;

            let cached_counts: HashMap<String, i64> = cached
                .iter()
                .map(|n| (n.id.clone(), n.children_count))
                .collect();
            let fresh_ids: HashSet<String> = fresh.iter().map(|n| n.id.clone()).collect();

            for remote in &fresh {
                let mut node = remote.clone().into_node();
                // The listing is authoritative for membership under this
                // parent; counts keep their locally-known values until each
                // child's own children-sync runs.
                node.parent_id = parent_id.clone();
                node.children_count = cached_counts.get(&node.id).copied().unwrap_or(0);
                self.db.db_upsert_node(&node).await?;
            }

            for stale in cached.iter().filter(|n| !fresh_ids.contains(&n.id)) {
                info!(
                    "Child {} no longer under {:?} remotely, removing subtree",
                    stale.id, parent_id
                );
                self.db.db_delete_cascade(&stale.id).await?;
            }

            if let Some(parent_id) = parent_id.as_deref() {
                self.db
                    .db_set_children_count(parent_id, fresh.len() as i64)
                    .await?;
            }

            if depth > 1 {
                for child in &fresh {
                    self.sync_children_at(Some(child.id.clone()), depth - 1)
                        .await?;
                }
            }

            Ok(())
        })
    }
}
