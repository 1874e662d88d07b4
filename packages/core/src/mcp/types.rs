//! MCP JSON-RPC 2.0 Types
//!
//! Type definitions for Model Context Protocol communication.
//! Implements JSON-RPC 2.0 for stdio-based MCP transport.

use crate::remote::RemoteError;
use crate::services::ServiceError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 request structure
///
/// # Example
///
/// ```json
/// {
///     "jsonrpc": "2.0",
///     "id": 123,
///     "method": "search_nodes",
///     "params": { "query": "quarterly report" }
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct MCPRequest {
    /// JSON-RPC version (must be "2.0")
    pub jsonrpc: String,

    /// Request identifier (used to match responses)
    pub id: u64,

    /// Method name to invoke
    pub method: String,

    /// Method parameters as JSON value
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC 2.0 response structure
#[derive(Debug, Serialize)]
pub struct MCPResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,

    /// Request identifier (matches request)
    pub id: u64,

    /// Success result (mutually exclusive with error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error information (mutually exclusive with result)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MCPError>,
}

/// JSON-RPC 2.0 error structure
#[derive(Debug, Serialize, Clone)]
pub struct MCPError {
    /// Error code (standard JSON-RPC or OutMirror-specific)
    pub code: i32,

    /// Human-readable error message
    pub message: String,
}

// JSON-RPC 2.0 standard error codes
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

// OutMirror-specific error codes (application errors: -32000 to -32099)
pub const NODE_NOT_FOUND: i32 = -32000;
pub const BOOKMARK_NOT_FOUND: i32 = -32001;
pub const RATE_LIMITED: i32 = -32010;
pub const SYNC_IN_PROGRESS: i32 = -32011;
pub const CACHE_EMPTY: i32 = -32012;
pub const AUTH_FAILED: i32 = -32013;
pub const REMOTE_UNAVAILABLE: i32 = -32014;

impl MCPError {
    /// Create a parse error
    pub fn parse_error(message: String) -> Self {
        Self {
            code: PARSE_ERROR,
            message,
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: String) -> Self {
        Self {
            code: INVALID_REQUEST,
            message,
        }
    }

    /// Create a method not found error
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: METHOD_NOT_FOUND,
            message: format!("Method not found: {}", method),
        }
    }

    /// Create an invalid params error
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: INVALID_PARAMS,
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            code: INTERNAL_ERROR,
            message: message.into(),
        }
    }
}

impl From<ServiceError> for MCPError {
    /// Map the service taxonomy onto wire error codes
    fn from(error: ServiceError) -> Self {
        let code = match &error {
            ServiceError::RateLimited { .. } => RATE_LIMITED,
            ServiceError::SyncInProgress => SYNC_IN_PROGRESS,
            ServiceError::CacheEmpty => CACHE_EMPTY,
            ServiceError::NodeNotFound { .. } => NODE_NOT_FOUND,
            ServiceError::BookmarkNotFound { .. } => BOOKMARK_NOT_FOUND,
            ServiceError::InvalidArgument(_) => INVALID_PARAMS,
            ServiceError::Remote(RemoteError::Unauthorized) => AUTH_FAILED,
            ServiceError::Remote(RemoteError::NotFound { .. }) => NODE_NOT_FOUND,
            ServiceError::Remote(_) => REMOTE_UNAVAILABLE,
            ServiceError::Database(_) => INTERNAL_ERROR,
        };
        Self {
            code,
            message: error.to_string(),
        }
    }
}

impl MCPResponse {
    /// Create a success response
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: u64, error: MCPError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_codes() {
        let rate_limited: MCPError = ServiceError::RateLimited {
            retry_after_secs: 42,
        }
        .into();
        assert_eq!(rate_limited.code, RATE_LIMITED);
        assert!(rate_limited.message.contains("42"));

        let empty: MCPError = ServiceError::CacheEmpty.into();
        assert_eq!(empty.code, CACHE_EMPTY);

        let auth: MCPError = ServiceError::Remote(RemoteError::Unauthorized).into();
        assert_eq!(auth.code, AUTH_FAILED);
    }

    #[test]
    fn test_response_serialization_omits_empty_side() {
        let ok = MCPResponse::success(1, serde_json::json!({"x": 1}));
        let value = serde_json::to_value(&ok).unwrap();
        assert!(value.get("error").is_none());

        let err = MCPResponse::error(2, MCPError::method_not_found("nope"));
        let value = serde_json::to_value(&err).unwrap();
        assert!(value.get("result").is_none());
        assert_eq!(value["error"]["code"], METHOD_NOT_FOUND);
    }

    #[test]
    fn test_request_params_default_to_null() {
        let request: MCPRequest = serde_json::from_str(
            r#"{"jsonrpc": "2.0", "id": 7, "method": "list_bookmarks"}"#,
        )
        .unwrap();
        assert_eq!(request.method, "list_bookmarks");
        assert!(request.params.is_null());
    }
}
