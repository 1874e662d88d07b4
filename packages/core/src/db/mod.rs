//! Database Layer
//!
//! Persistent cache store for the outline mirror, built on libsql
//! (embedded SQLite):
//!
//! - Database initialization and connection management
//! - Flat `nodes` table plus `sync_meta` and `bookmarks`
//! - Transactional snapshot replacement and explicit cascade deletion
//! - LIKE-based candidate queries for the fuzzy search engine
//!
//! The store exclusively owns all persisted rows; services never touch SQL
//! directly.

mod database;
mod error;

pub use database::{
    DatabaseService, CANDIDATE_PASS_LIMIT, META_LAST_FULL_SYNC, META_LAST_SYNC_NODE_COUNT,
    META_SYNC_IN_PROGRESS, META_SYNC_STARTED_AT,
};
pub use error::DatabaseError;
