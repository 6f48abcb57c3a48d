//! JSON-RPC 2.0 protocol types for MCP
//!
//! Envelopes, error objects, and the mapping from core failures to
//! application error codes.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

use linkedin_core::LinkedInError;

/// JSON-RPC version string (always "2.0")
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard and application error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    pub const TOOL_EXECUTION: i32 = -32000;
    pub const AUTHENTICATION: i32 = -32001;
    pub const SESSION_CONFLICT: i32 = -32002;
    pub const RATE_LIMITED: i32 = -32003;
    pub const CONFIGURATION: i32 = -32004;
    pub const RESOURCE_UNAVAILABLE: i32 = -32005;
    pub const TIMEOUT: i32 = -32006;
    pub const CREDENTIAL_STORE: i32 = -32007;
}

/// Request ID - can be string, number, or null
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
    Null,
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

/// JSON-RPC Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params: None,
        }
    }
}

/// JSON-RPC Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC Error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    // Standard JSON-RPC errors
    pub fn parse_error() -> Self {
        Self::new(error_codes::PARSE_ERROR, "Parse error")
    }

    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_REQUEST, "Invalid Request")
            .with_data(json!({ "kind": "protocol", "detail": detail.into() }))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::new(error_codes::METHOD_NOT_FOUND, format!("Unknown tool: {}", name))
    }

    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_PARAMS, msg)
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, msg)
    }
}

impl From<&LinkedInError> for JsonRpcError {
    fn from(err: &LinkedInError) -> Self {
        let code = match err {
            LinkedInError::ToolExecution(_) => error_codes::TOOL_EXECUTION,
            LinkedInError::Authentication(_) => error_codes::AUTHENTICATION,
            LinkedInError::SessionConflict(_) => error_codes::SESSION_CONFLICT,
            LinkedInError::RateLimited { .. } => error_codes::RATE_LIMITED,
            LinkedInError::Configuration(_) => error_codes::CONFIGURATION,
            LinkedInError::ResourceUnavailable(_) | LinkedInError::Closed => {
                error_codes::RESOURCE_UNAVAILABLE
            }
            LinkedInError::Timeout(_) => error_codes::TIMEOUT,
            LinkedInError::Store(_) | LinkedInError::Refresh(_) | LinkedInError::Serialization(_) => {
                error_codes::CREDENTIAL_STORE
            }
        };

        let mut data = json!({
            "kind": err.kind(),
            "detail": err.to_string(),
        });
        if let Some(retry_after) = err.retry_after() {
            data["retryAfterSeconds"] = json!(retry_after.as_secs());
        }

        let message = match err {
            LinkedInError::ToolExecution(_) => "Tool execution failed",
            LinkedInError::Authentication(_) => "LinkedIn authentication failed",
            LinkedInError::SessionConflict(_) => "LinkedIn session already in use",
            LinkedInError::RateLimited { .. } => "Rate limited by LinkedIn",
            LinkedInError::Configuration(_) => "Server configuration error",
            LinkedInError::ResourceUnavailable(_) | LinkedInError::Closed => "LinkedIn unavailable",
            LinkedInError::Timeout(_) => "Request timed out",
            LinkedInError::Store(_) | LinkedInError::Refresh(_) | LinkedInError::Serialization(_) => {
                "Credential handling failed"
            }
        };

        Self::new(code, message).with_data(data)
    }
}

/// JSON-RPC Notification (no id, no response expected)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: None,
        }
    }
}
