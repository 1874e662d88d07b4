//! Service Layer Error Types
//!
//! This module defines the error taxonomy for service operations:
//!
//! - *rate-limited*: full sync requested before the minimum interval elapsed;
//!   carries a wait-time hint and is never retried automatically
//! - *lease-conflict*: a fresh sync already holds the lease; callers should
//!   treat the existing cache as acceptable
//! - *cache-empty*: a read against an empty mirror; an explicit "needs sync"
//!   signal instead of an empty success
//! - remote and database failures wrap the lower layers' taxonomies

use crate::db::DatabaseError;
use crate::remote::RemoteError;
use thiserror::Error;

/// Service operation errors
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Full sync requested before the minimum interval between export calls
    #[error("Sync rate limited - retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// A fresh sync already holds the lease
    #[error("A sync is already in progress")]
    SyncInProgress,

    /// The mirror is empty and a full sync is required before reads
    #[error("The local mirror is empty - run a full sync first")]
    CacheEmpty,

    /// Node not found in the cache
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// Bookmark not found
    #[error("Bookmark not found: {name}")]
    BookmarkNotFound { name: String },

    /// Caller-supplied argument was unusable
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Remote outline API failure
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Cache store failure
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl ServiceError {
    /// Create a node not found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    /// Create a bookmark not found error
    pub fn bookmark_not_found(name: impl Into<String>) -> Self {
        Self::BookmarkNotFound { name: name.into() }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// True when the underlying cause is a rejected credential
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Remote(RemoteError::Unauthorized))
    }
}
