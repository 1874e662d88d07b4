//! Remote Outline Collaborator
//!
//! The HTTP boundary to the remote source of truth:
//!
//! - [`OutlineRemote`] - the trait seam the sync engine and write path use
//! - [`HttpOutlineClient`] - the reqwest-backed production implementation
//! - Typed per-endpoint payload records (nothing dynamic leaks inward)

mod client;
mod error;
mod types;

pub use client::{HttpOutlineClient, OutlineRemote};
pub use error::RemoteError;
pub use types::{
    CreateNodeRequest, ExportResponse, MoveNodeRequest, NodeListResponse, RemoteNode,
    RemoteNodeDetail, UpdateNodeRequest,
};
