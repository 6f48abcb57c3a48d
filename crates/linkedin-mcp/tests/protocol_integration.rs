//! Integration tests for MCP protocol flow
//!
//! These tests drive the dispatcher end to end against a fake LinkedIn
//! backend: lifecycle, tool catalog, session acquisition and teardown, and
//! error mapping.

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use linkedin_core::{LinkedInError, SessionState};
use linkedin_mcp::protocol::error_codes;
use linkedin_mcp::{dispatch, serve_lines, ServerState};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use common::*;

async fn call(state: &ServerState, body: Value) -> Value {
    dispatch(state, body).await.expect("expected a reply")
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_full_initialization_flow() {
    let backend = Arc::new(FakeBackend::default());
    let state = state(backend.clone());

    let response = call(
        &state,
        request(
            1,
            "initialize",
            Some(json!({
                "protocolVersion": "2025-03-26",
                "capabilities": { "roots": { "listChanged": true } },
                "clientInfo": { "name": "test-client", "version": "1.0.0" }
            })),
        ),
    )
    .await;

    assert_eq!(response["jsonrpc"], "2.0");
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(response["result"]["capabilities"]["tools"]["listChanged"], false);

    let ack = dispatch(
        &state,
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
    )
    .await;
    assert!(ack.is_none());

    let tools = call(&state, request(2, "tools/list", None)).await;
    assert_eq!(tools["result"]["tools"].as_array().unwrap().len(), 6);

    // Neither initialize nor tools/list touch LinkedIn
    assert_eq!(backend.opens(), 0);
    assert_eq!(state.sessions.init_attempts(), 0);
}

#[tokio::test]
async fn test_unsupported_version_gets_latest() {
    let state = state(Arc::new(FakeBackend::default()));
    let response = call(
        &state,
        request(1, "initialize", Some(json!({ "protocolVersion": "2030-01-01" }))),
    )
    .await;
    assert_eq!(response["result"]["protocolVersion"], "2025-06-18");
}

#[tokio::test]
async fn test_tools_list_scenario() {
    let state = state(Arc::new(FakeBackend::default()));
    let response = call(&state, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;

    let object = response.as_object().unwrap();
    assert_eq!(object.len(), 3);
    assert_eq!(response["jsonrpc"], "2.0");
    assert_eq!(response["id"], 1);

    let names: Vec<&str> = response["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "get_person_profile",
            "get_company_profile",
            "get_job_details",
            "search_jobs",
            "get_recommended_jobs",
            "close_session",
        ]
    );
}

#[tokio::test]
async fn test_tools_list_independent_of_session_state() {
    let backend = Arc::new(FakeBackend::failing_open(vec![LinkedInError::ResourceUnavailable(
        "down".into(),
    )]));
    let state = state(backend);

    let uninitialized = call(&state, request(1, "tools/list", None)).await;

    call(&state, profile_call(2)).await;
    assert_eq!(state.sessions.state(), SessionState::Invalid);
    let invalid = call(&state, request(1, "tools/list", None)).await;

    call(&state, profile_call(3)).await;
    assert_eq!(state.sessions.state(), SessionState::Ready);
    let ready = call(&state, request(1, "tools/list", None)).await;

    assert_eq!(uninitialized, invalid);
    assert_eq!(invalid, ready);
}

// ============================================================================
// Tool Call Tests
// ============================================================================

#[tokio::test]
async fn test_unknown_tool_scenario() {
    let backend = Arc::new(FakeBackend::default());
    let state = state(backend.clone());

    let response = call(
        &state,
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
               "params": {"name": "unknown_tool", "arguments": {}}}),
    )
    .await;

    assert_eq!(response["id"], 2);
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(backend.opens(), 0);
}

#[tokio::test]
async fn test_profile_call_returns_structured_content() {
    let backend = Arc::new(FakeBackend::default());
    let state = state(backend.clone());

    let response = call(&state, profile_call(1)).await;
    let result = &response["result"];
    assert_eq!(result["structuredContent"]["operation"], "person_profile");
    assert_eq!(result["structuredContent"]["target"], "person ada-lovelace");
    assert_eq!(result["content"][0]["type"], "text");
    assert_eq!(state.sessions.state(), SessionState::Ready);

    // Warm path: a second call reuses the session
    call(&state, profile_call(2)).await;
    assert_eq!(backend.opens(), 1);
    assert_eq!(backend.executions(), 2);
}

#[tokio::test]
async fn test_malformed_url_never_reaches_linkedin() {
    let backend = Arc::new(FakeBackend::default());
    let state = state(backend.clone());

    let response = call(
        &state,
        tool_call(1, "get_company_profile", json!({ "company_url": "https://example.com/acme" })),
    )
    .await;

    assert_eq!(response["error"]["code"], error_codes::INVALID_PARAMS);
    assert_eq!(backend.opens(), 0);
    assert_eq!(state.sessions.state(), SessionState::Uninitialized);
}

#[tokio::test]
async fn test_concurrent_calls_share_one_initialization() {
    let backend = Arc::new(FakeBackend::slow(Duration::from_millis(50)));
    let state = state(backend.clone());

    let calls = (1..=8).map(|id| call(&state, profile_call(id)));
    let responses = join_all(calls).await;

    assert_eq!(backend.opens(), 1);
    assert_eq!(state.sessions.init_attempts(), 1);
    for response in &responses {
        assert!(response.get("error").is_none(), "unexpected error: {}", response);
    }
}

#[tokio::test]
async fn test_concurrent_calls_share_one_failure() {
    let backend = Arc::new(FakeBackend {
        open_delay: Some(Duration::from_millis(50)),
        open_failures: std::sync::Mutex::new(
            vec![LinkedInError::SessionConflict("already in use".into())].into(),
        ),
        ..Default::default()
    });
    let state = state(backend.clone());

    let calls = (1..=5).map(|id| call(&state, profile_call(id)));
    let responses = join_all(calls).await;

    assert_eq!(backend.opens(), 1);
    for response in &responses {
        assert_eq!(response["error"]["code"], error_codes::SESSION_CONFLICT);
        assert_eq!(response["error"]["data"]["kind"], "session_conflict");
    }
    assert_eq!(state.sessions.state(), SessionState::Invalid);
}

#[tokio::test]
async fn test_invalid_session_triggers_one_fresh_acquisition() {
    let backend = Arc::new(FakeBackend::failing_open(vec![LinkedInError::ResourceUnavailable(
        "browser crashed".into(),
    )]));
    let state = state(backend.clone());

    let failed = call(&state, profile_call(1)).await;
    assert_eq!(failed["error"]["code"], error_codes::RESOURCE_UNAVAILABLE);
    assert_eq!(state.sessions.state(), SessionState::Invalid);

    let retried = call(&state, profile_call(2)).await;
    assert!(retried.get("error").is_none());
    assert_eq!(backend.opens(), 2);
    assert_eq!(state.sessions.state(), SessionState::Ready);
}

#[tokio::test]
async fn test_authentication_failure_in_use_moves_to_next_credential() {
    let backend = Arc::new(FakeBackend::failing_execute(vec![LinkedInError::Authentication(
        "cookie expired".into(),
    )]));
    let state = state_with(backend.clone(), &["AQEDprimary", "AQEDsecondary"], "stdio");

    let first = call(&state, profile_call(1)).await;
    assert_eq!(first["error"]["code"], error_codes::AUTHENTICATION);
    assert_eq!(state.sessions.state(), SessionState::Invalid);
    assert_eq!(backend.closes(), 1);

    let second = call(&state, profile_call(2)).await;
    assert!(second.get("error").is_none());
    assert_eq!(backend.opens(), 2);

    let session = state.sessions.acquire().await.unwrap();
    assert_ne!(session.credential().secret().expose(), "AQEDprimary");
}

#[tokio::test]
async fn test_conflict_in_use_retries_same_credential() {
    let backend = Arc::new(FakeBackend::failing_execute(vec![LinkedInError::SessionConflict(
        "already in use".into(),
    )]));
    let state = state_with(backend.clone(), &["AQEDprimary"], "stdio");

    let first = call(&state, profile_call(1)).await;
    assert_eq!(first["error"]["code"], error_codes::SESSION_CONFLICT);
    assert_eq!(state.sessions.state(), SessionState::Invalid);
    assert_eq!(backend.closes(), 1);

    let second = call(&state, profile_call(2)).await;
    assert!(second.get("error").is_none(), "unexpected error: {}", second);
    assert_eq!(backend.opens(), 2);

    let session = state.sessions.acquire().await.unwrap();
    assert_eq!(session.credential().secret().expose(), "AQEDprimary");
}

#[tokio::test]
async fn test_tool_execution_error_keeps_session_ready() {
    let backend = Arc::new(FakeBackend::failing_execute(vec![LinkedInError::ToolExecution(
        "profile not found".into(),
    )]));
    let state = state(backend.clone());

    let response = call(&state, profile_call(1)).await;
    assert_eq!(response["error"]["code"], error_codes::TOOL_EXECUTION);
    assert!(response["error"]["data"]["detail"]
        .as_str()
        .unwrap()
        .contains("profile not found"));
    assert_eq!(state.sessions.state(), SessionState::Ready);
    assert_eq!(backend.closes(), 0);
}

#[tokio::test]
async fn test_rate_limit_carries_retry_guidance() {
    let backend = Arc::new(FakeBackend::failing_execute(vec![LinkedInError::RateLimited {
        message: "slow down".into(),
        retry_after: Some(Duration::from_secs(120)),
    }]));
    let state = state(backend.clone());

    let response = call(&state, tool_call(1, "search_jobs", json!({ "keywords": "rust" }))).await;
    assert_eq!(response["error"]["code"], error_codes::RATE_LIMITED);
    assert_eq!(response["error"]["data"]["retryAfterSeconds"], 120);
    assert_eq!(state.sessions.state(), SessionState::Ready);
    // No retry at this layer
    assert_eq!(backend.executions(), 1);
}

#[tokio::test]
async fn test_missing_credential_is_configuration_error() {
    let backend = Arc::new(FakeBackend::default());
    let state = state_with(backend.clone(), &[], "stdio");

    let response = call(&state, tool_call(1, "get_recommended_jobs", json!({}))).await;
    assert_eq!(response["error"]["code"], error_codes::CONFIGURATION);
    assert_eq!(backend.opens(), 0);

    // The process keeps serving other methods
    let tools = call(&state, request(2, "tools/list", None)).await;
    assert!(tools.get("result").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_slow_initialization_times_out() {
    let backend = Arc::new(FakeBackend::slow(Duration::from_secs(600)));
    let state = state(backend.clone()).with_request_timeout(Duration::from_secs(5));

    let response = call(&state, profile_call(1)).await;
    assert_eq!(response["error"]["code"], error_codes::TIMEOUT);
    assert_eq!(response["error"]["data"]["kind"], "timeout");
}

// ============================================================================
// Session Teardown Tests
// ============================================================================

#[tokio::test]
async fn test_close_session_forces_new_acquisition() {
    let backend = Arc::new(FakeBackend::default());
    let state = state(backend.clone());

    call(&state, profile_call(1)).await;
    assert_eq!(state.sessions.state(), SessionState::Ready);

    let closed = call(&state, tool_call(2, "close_session", json!({}))).await;
    assert_eq!(closed["result"]["structuredContent"]["status"], "success");
    assert_eq!(closed["result"]["structuredContent"]["released"], true);
    assert_eq!(state.sessions.state(), SessionState::Uninitialized);
    assert_eq!(backend.closes(), 1);

    call(&state, profile_call(3)).await;
    assert_eq!(backend.opens(), 2);
    assert_eq!(state.sessions.init_attempts(), 2);
}

#[tokio::test]
async fn test_close_session_without_session_is_resource_free() {
    let backend = Arc::new(FakeBackend::default());
    let state = state(backend.clone());

    let closed = call(&state, tool_call(1, "close_session", json!({}))).await;
    assert_eq!(closed["result"]["structuredContent"]["released"], false);
    assert_eq!(backend.opens(), 0);
    assert_eq!(state.sessions.init_attempts(), 0);
}

#[tokio::test]
async fn test_calls_after_shutdown_fail_cleanly() {
    let state = state(Arc::new(FakeBackend::default()));
    state.sessions.shutdown().await;

    let response = call(&state, profile_call(1)).await;
    assert_eq!(response["error"]["code"], error_codes::RESOURCE_UNAVAILABLE);
    assert_eq!(response["error"]["data"]["kind"], "closed");
}

// ============================================================================
// stdio Transport Tests
// ============================================================================

#[tokio::test]
async fn test_stdio_round_trip() {
    let backend = Arc::new(FakeBackend::default());
    let state = state(backend.clone());

    let (mut client_tx, server_rx) = tokio::io::duplex(64 * 1024);
    let (server_tx, client_rx) = tokio::io::duplex(64 * 1024);

    let server = tokio::spawn(serve_lines(
        state.clone(),
        server_rx,
        server_tx,
        std::future::pending::<()>(),
    ));

    let input = [
        request(1, "initialize", None).to_string(),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
        "{broken".to_string(),
        profile_call(2).to_string(),
        String::new(),
        request(3, "tools/list", None).to_string(),
    ]
    .join("\n");
    client_tx.write_all(input.as_bytes()).await.unwrap();
    client_tx.write_all(b"\n").await.unwrap();
    client_tx.shutdown().await.unwrap();
    drop(client_tx);

    server.await.unwrap().unwrap();

    let mut lines = BufReader::new(client_rx).lines();
    let mut replies = Vec::new();
    while let Some(line) = lines.next_line().await.unwrap() {
        replies.push(serde_json::from_str::<Value>(&line).unwrap());
    }

    assert_eq!(replies.len(), 4);
    let parse_errors: Vec<_> = replies
        .iter()
        .filter(|r| r["error"]["code"] == error_codes::PARSE_ERROR)
        .collect();
    assert_eq!(parse_errors.len(), 1);
    assert!(parse_errors[0]["id"].is_null());

    for id in 1..=3 {
        assert!(
            replies.iter().any(|r| r["id"] == id && r.get("result").is_some()),
            "missing reply for id {}",
            id
        );
    }
    assert_eq!(backend.opens(), 1);
}
