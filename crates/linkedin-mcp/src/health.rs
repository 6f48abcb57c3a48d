//! Health probe
//!
//! Liveness only: the payload reports the session state but the probe never
//! fails because of it. An `Invalid` session is retried on the next call.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::handlers::ServerState;
use crate::protocol::SERVER_NAME;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub transport: &'static str,
    pub session: linkedin_core::SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    pub uptime_seconds: u64,
}

pub fn report(state: &ServerState) -> HealthReport {
    HealthReport {
        status: "healthy",
        service: SERVER_NAME,
        version: env!("CARGO_PKG_VERSION"),
        transport: state.transport,
        session: state.sessions.state(),
        last_used_at: state.sessions.last_used_at(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }
}

/// Descriptor served on `GET` of the MCP route
pub fn descriptor(state: &ServerState, mcp_path: &str) -> Value {
    json!({
        "status": "ready",
        "server": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "transport": state.transport,
        "capabilities": state.tools.names(),
        "endpoints": {
            "mcp": mcp_path,
            "health": "/api/health",
        },
    })
}
