//! MCP lifecycle: initialization and version negotiation

use serde::{Deserialize, Serialize};

use super::capabilities::{ClientCapabilities, ClientInfo, ServerCapabilities, ServerInfo};

/// Protocol versions this server speaks, newest first
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Newest supported protocol version
pub const MCP_PROTOCOL_VERSION: &str = SUPPORTED_PROTOCOL_VERSIONS[0];

/// Echo the client's version when we support it, otherwise answer with ours
pub fn negotiate_version(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|v| SUPPORTED_PROTOCOL_VERSIONS.iter().find(|s| **s == v))
        .copied()
        .unwrap_or(MCP_PROTOCOL_VERSION)
}

/// Initialize request parameters. Every field is optional so that bare
/// `initialize` calls from simple HTTP clients still succeed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub protocol_version: Option<String>,

    #[serde(default)]
    pub capabilities: ClientCapabilities,

    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Initialize response result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,

    pub capabilities: ServerCapabilities,

    pub server_info: ServerInfo,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl InitializeResult {
    pub fn new(protocol_version: &str) -> Self {
        Self {
            protocol_version: protocol_version.to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: ServerInfo::default(),
            instructions: Some(
                "Retrieves LinkedIn profile, company and job data. The LinkedIn session is \
                 opened on first use and shared by all calls; call close_session to release it."
                    .to_string(),
            ),
        }
    }
}

/// Cancellation notification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledNotification {
    pub request_id: super::jsonrpc::RequestId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
