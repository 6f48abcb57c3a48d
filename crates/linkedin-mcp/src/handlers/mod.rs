//! Protocol dispatcher
//!
//! Turns a raw request body into a JSON-RPC reply. Once a body parses as
//! JSON, every outcome is a JSON-RPC response object (or no body at all for
//! notifications); failures never escape as transport errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use linkedin_core::{SessionManager, DEFAULT_INIT_TIMEOUT};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::invariants::{parse_envelope, Envelope, EnvelopeError};
use crate::protocol::*;
use crate::tools::ToolRegistry;

/// Process-wide state shared by every request
#[derive(Clone)]
pub struct ServerState {
    pub sessions: Arc<SessionManager>,
    pub tools: Arc<ToolRegistry>,
    /// Wall-clock budget for one `tools/call`
    pub request_timeout: Duration,
    /// Transport label reported by the health probe
    pub transport: &'static str,
    pub started_at: Instant,
}

impl ServerState {
    pub fn new(sessions: Arc<SessionManager>, transport: &'static str) -> Self {
        Self {
            sessions,
            tools: Arc::new(ToolRegistry::linkedin()),
            request_timeout: DEFAULT_INIT_TIMEOUT,
            transport,
            started_at: Instant::now(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Result of dispatching one body
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A response object or batch array
    Reply(Value),
    /// Notifications only
    NoReply,
    /// The body was not JSON at all
    ParseError(Value),
}

fn encode(response: JsonRpcResponse) -> Value {
    serde_json::to_value(&response).unwrap_or_else(|e| {
        json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": null,
            "error": {"code": error_codes::INTERNAL_ERROR, "message": e.to_string()}
        })
    })
}

/// The `-32700` response sent for unparseable input
pub fn parse_error_response() -> Value {
    encode(JsonRpcResponse::error(
        RequestId::Null,
        JsonRpcError::parse_error(),
    ))
}

/// Dispatch a raw body as received from a transport
pub async fn dispatch_raw(state: &ServerState, raw: &[u8]) -> Outcome {
    match serde_json::from_slice::<Value>(raw) {
        Ok(body) => match dispatch(state, body).await {
            Some(reply) => Outcome::Reply(reply),
            None => Outcome::NoReply,
        },
        Err(e) => {
            warn!(error = %e, "Rejecting body that is not JSON");
            Outcome::ParseError(parse_error_response())
        }
    }
}

/// Dispatch a parsed body: a single message or a batch
pub async fn dispatch(state: &ServerState, body: Value) -> Option<Value> {
    match body {
        Value::Array(items) if items.is_empty() => Some(encode(JsonRpcResponse::error(
            RequestId::Null,
            JsonRpcError::invalid_request("empty batch"),
        ))),
        Value::Array(items) => {
            debug!(size = items.len(), "Dispatching batch");
            let replies: Vec<Value> = join_all(items.into_iter().map(|item| dispatch_one(state, item)))
                .await
                .into_iter()
                .flatten()
                .collect();
            (!replies.is_empty()).then_some(Value::Array(replies))
        }
        single => dispatch_one(state, single).await,
    }
}

async fn dispatch_one(state: &ServerState, message: Value) -> Option<Value> {
    match parse_envelope(message) {
        Ok(Envelope::Request(request)) => Some(encode(handle_request(state, &request).await)),
        Ok(Envelope::Notification(notification)) => {
            handle_notification(&notification);
            None
        }
        Ok(Envelope::Response) => {
            debug!("Ignoring response object sent by client");
            None
        }
        Err(EnvelopeError { id, error }) => {
            warn!(%id, detail = ?error.data, "Malformed JSON-RPC envelope");
            Some(encode(JsonRpcResponse::error(id, error)))
        }
    }
}

/// Handle a validated JSON-RPC request
pub async fn handle_request(state: &ServerState, request: &JsonRpcRequest) -> JsonRpcResponse {
    debug!(method = %request.method, id = %request.id, "Handling request");

    let result = match request.method.as_str() {
        // Lifecycle
        "initialize" => handle_initialize(request),
        "ping" => Ok(json!({})),

        // Tools
        "tools/list" => handle_tools_list(state),
        "tools/call" => handle_tools_call(state, request).await,

        // Unknown method
        _ => Err(JsonRpcError::method_not_found(&request.method)),
    };

    match result {
        Ok(value) => JsonRpcResponse::success(request.id.clone(), value),
        Err(error) => JsonRpcResponse::error(request.id.clone(), error),
    }
}

/// Handle an incoming notification
pub fn handle_notification(notification: &JsonRpcNotification) {
    match notification.method.as_str() {
        "notifications/initialized" => {
            info!("Client sent initialized notification");
        }
        "notifications/cancelled" => {
            let cancelled = notification
                .params
                .clone()
                .and_then(|p| serde_json::from_value::<CancelledNotification>(p).ok());
            match cancelled {
                Some(c) => info!(request_id = %c.request_id, reason = ?c.reason, "Request cancelled by client"),
                None => debug!("Cancellation without a usable requestId"),
            }
        }
        other => {
            debug!(method = other, "Ignoring unknown notification");
        }
    }
}

// ============================================================================
// Lifecycle Handlers
// ============================================================================

fn handle_initialize(request: &JsonRpcRequest) -> Result<Value, JsonRpcError> {
    let params: InitializeParams = match &request.params {
        Some(p) => serde_json::from_value(p.clone())
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid initialize params: {}", e)))?,
        None => InitializeParams::default(),
    };

    let version = negotiate_version(params.protocol_version.as_deref());
    let client = params.client_info.as_ref().map(|c| c.name.as_str()).unwrap_or("unknown");
    info!(
        client,
        requested = params.protocol_version.as_deref().unwrap_or("none"),
        negotiated = version,
        "Client initializing"
    );

    serde_json::to_value(InitializeResult::new(version))
        .map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

// ============================================================================
// Tool Handlers
// ============================================================================

fn handle_tools_list(state: &ServerState) -> Result<Value, JsonRpcError> {
    let result = ToolsListResult {
        tools: state.tools.definitions(),
        next_cursor: None,
    };
    serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

async fn handle_tools_call(
    state: &ServerState,
    request: &JsonRpcRequest,
) -> Result<Value, JsonRpcError> {
    let params: ToolsCallParams = request
        .params
        .as_ref()
        .ok_or_else(|| JsonRpcError::invalid_params("Missing params"))
        .and_then(|p| {
            serde_json::from_value(p.clone())
                .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))
        })?;

    info!(tool = %params.name, id = %request.id, "Tool call");
    let arguments = params.arguments.unwrap_or_else(|| json!({}));

    let result = state
        .tools
        .call(&state.sessions, &params.name, arguments, state.request_timeout)
        .await?;

    serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}
