//! Remote API Error Types
//!
//! Error taxonomy for the outline service collaborator. Authentication
//! failures are a distinct variant so a bad credential never masquerades as
//! a sync failure, and 404 is distinct so partial sync can interpret it as
//! "deleted remotely" rather than an error.

use thiserror::Error;

/// Errors from the remote outline API
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The bearer credential was rejected (HTTP 401/403)
    #[error("Authentication with the outline service failed - check the API key")]
    Unauthorized,

    /// The requested resource does not exist remotely (HTTP 404)
    #[error("Remote resource not found: {resource}")]
    NotFound { resource: String },

    /// Any other non-success HTTP status
    #[error("Outline API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network / transport failure
    #[error("Request to the outline service failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not match the expected shape
    #[error("Unexpected outline API response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Create a not-found error for a resource
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// True when the error is a 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
