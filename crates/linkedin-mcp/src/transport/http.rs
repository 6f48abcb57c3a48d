//! Streamable HTTP transport
//!
//! `POST <path>` carries JSON-RPC bodies, `GET <path>` describes the server
//! and `GET /api/health` is the liveness probe.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{dispatch_raw, Outcome, ServerState};
use crate::health;

/// Route of the liveness probe
pub const HEALTH_PATH: &str = "/api/health";

#[derive(Clone)]
pub struct AppState {
    pub server: ServerState,
    pub mcp_path: Arc<str>,
}

/// Build the HTTP router serving MCP on `mcp_path`
pub fn build_router(server: ServerState, mcp_path: &str) -> Router {
    let state = AppState {
        server,
        mcp_path: Arc::from(mcp_path),
    };

    Router::new()
        .route(mcp_path, get(describe).post(handle_mcp))
        .route(HEALTH_PATH, get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Any JSON body yields 200 with a JSON-RPC reply; only non-JSON is a 400
async fn handle_mcp(State(app): State<AppState>, body: Bytes) -> Response {
    match dispatch_raw(&app.server, &body).await {
        Outcome::Reply(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Outcome::NoReply => StatusCode::ACCEPTED.into_response(),
        Outcome::ParseError(reply) => (StatusCode::BAD_REQUEST, Json(reply)).into_response(),
    }
}

async fn describe(State(app): State<AppState>) -> impl IntoResponse {
    Json(health::descriptor(&app.server, &app.mcp_path))
}

async fn health_check(State(app): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(health::report(&app.server)))
}
