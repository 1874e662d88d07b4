//! Remote Outline Client
//!
//! The HTTP collaborator that owns the remote source of truth. Everything
//! the sync engine and write path need from the outline service goes through
//! the [`OutlineRemote`] trait so tests can substitute an in-memory mock.
//!
//! Every call carries the bearer credential; a 401 surfaces as
//! [`RemoteError::Unauthorized`] rather than a generic failure, and a 404 as
//! [`RemoteError::NotFound`] so partial sync can treat it as a remote
//! deletion.

use crate::remote::error::RemoteError;
use crate::remote::types::{
    CreateNodeRequest, ExportResponse, MoveNodeRequest, NodeListResponse, RemoteNode,
    RemoteNodeDetail, UpdateNodeRequest,
};
use async_trait::async_trait;
use std::time::Duration;

/// Request timeout for all outline API calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Operations the rest of the system needs from the remote outline service
///
/// This is the seam between the mirror and its source of truth. The sync
/// engine consumes the read side; the optimistic write path consumes the
/// mutation side.
#[async_trait]
pub trait OutlineRemote: Send + Sync {
    /// Cheap authenticated request to verify the credential works
    async fn validate_credentials(&self) -> Result<(), RemoteError>;

    /// Export the complete node collection (the rate-limited bulk call)
    async fn export_all(&self) -> Result<Vec<RemoteNode>, RemoteError>;

    /// Fetch one node's current fields (no parent/child information)
    async fn fetch_node(&self, id: &str) -> Result<RemoteNodeDetail, RemoteError>;

    /// List the direct children of a parent (`None` = top level)
    async fn list_children(&self, parent_id: Option<&str>)
        -> Result<Vec<RemoteNode>, RemoteError>;

    /// Create a node; returns the server's view of the created node
    async fn create_node(&self, req: &CreateNodeRequest) -> Result<RemoteNodeDetail, RemoteError>;

    /// Update a node's name and/or note; returns the server's view
    async fn update_node(
        &self,
        id: &str,
        req: &UpdateNodeRequest,
    ) -> Result<RemoteNodeDetail, RemoteError>;

    /// Move a node under a new parent and/or priority
    async fn move_node(&self, id: &str, req: &MoveNodeRequest) -> Result<(), RemoteError>;

    /// Delete a node (the server cascades to descendants)
    async fn delete_node(&self, id: &str) -> Result<(), RemoteError>;

    /// Mark a node complete or incomplete
    async fn set_completed(&self, id: &str, completed: bool) -> Result<(), RemoteError>;
}

/// reqwest-backed implementation of [`OutlineRemote`]
///
/// # Examples
///
/// ```no_run
/// use outmirror_core::remote::HttpOutlineClient;
///
/// let client = HttpOutlineClient::new(
///     "https://api.example-outline.com/v1",
///     "om_live_...",
/// ).expect("client");
/// ```
pub struct HttpOutlineClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpOutlineClient {
    /// Build a client for the given API base URL and bearer credential
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(self.api_key.trim())
    }

    /// Map non-success statuses to the error taxonomy
    async fn check_status(
        response: reqwest::Response,
        resource: &str,
    ) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(RemoteError::Unauthorized);
        }
        if status.as_u16() == 404 {
            return Err(RemoteError::not_found(resource));
        }
        let message = response.text().await.unwrap_or_default();
        Err(RemoteError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl OutlineRemote for HttpOutlineClient {
    async fn validate_credentials(&self) -> Result<(), RemoteError> {
        let response = self
            .authorized(self.http.get(self.url("account")))
            .send()
            .await?;
        Self::check_status(response, "account").await?;
        Ok(())
    }

    async fn export_all(&self) -> Result<Vec<RemoteNode>, RemoteError> {
        let response = self
            .authorized(self.http.get(self.url("nodes/export")))
            .send()
            .await?;
        let response = Self::check_status(response, "nodes/export").await?;
        let body: ExportResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(format!("export payload: {}", e)))?;
        Ok(body.nodes)
    }

    async fn fetch_node(&self, id: &str) -> Result<RemoteNodeDetail, RemoteError> {
        let response = self
            .authorized(self.http.get(self.url(&format!("nodes/{}", id))))
            .send()
            .await?;
        let response = Self::check_status(response, id).await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(format!("node payload: {}", e)))
    }

    async fn list_children(
        &self,
        parent_id: Option<&str>,
    ) -> Result<Vec<RemoteNode>, RemoteError> {
        let mut request = self.authorized(self.http.get(self.url("nodes")));
        if let Some(parent_id) = parent_id {
            request = request.query(&[("parent_id", parent_id)]);
        }
        let response = request.send().await?;
        let resource = parent_id.unwrap_or("top-level");
        let response = Self::check_status(response, resource).await?;
        let body: NodeListResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(format!("node list payload: {}", e)))?;
        Ok(body.nodes)
    }

    async fn create_node(&self, req: &CreateNodeRequest) -> Result<RemoteNodeDetail, RemoteError> {
        let response = self
            .authorized(self.http.post(self.url("nodes")))
            .json(req)
            .send()
            .await?;
        let response = Self::check_status(response, "nodes").await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(format!("created node payload: {}", e)))
    }

    async fn update_node(
        &self,
        id: &str,
        req: &UpdateNodeRequest,
    ) -> Result<RemoteNodeDetail, RemoteError> {
        let response = self
            .authorized(self.http.patch(self.url(&format!("nodes/{}", id))))
            .json(req)
            .send()
            .await?;
        let response = Self::check_status(response, id).await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(format!("updated node payload: {}", e)))
    }

    async fn move_node(&self, id: &str, req: &MoveNodeRequest) -> Result<(), RemoteError> {
        let response = self
            .authorized(self.http.post(self.url(&format!("nodes/{}/move", id))))
            .json(req)
            .send()
            .await?;
        Self::check_status(response, id).await?;
        Ok(())
    }

    async fn delete_node(&self, id: &str) -> Result<(), RemoteError> {
        let response = self
            .authorized(self.http.delete(self.url(&format!("nodes/{}", id))))
            .send()
            .await?;
        Self::check_status(response, id).await?;
        Ok(())
    }

    async fn set_completed(&self, id: &str, completed: bool) -> Result<(), RemoteError> {
        let action = if completed { "complete" } else { "uncomplete" };
        let response = self
            .authorized(
                self.http
                    .post(self.url(&format!("nodes/{}/{}", id, action))),
            )
            .send()
            .await?;
        Self::check_status(response, id).await?;
        Ok(())
    }
}
