//! Shared fixtures for linkedin-mcp integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use linkedin_core::{
    Credential, CredentialResolver, CredentialSources, LinkedInError, LinkedInRequest,
    MemoryStore, RawCredential, ResourceBackend, ResourceHandle, SessionManager,
};
use linkedin_mcp::ServerState;
use serde_json::{json, Value};

/// Backend double counting opens and closes
#[derive(Default)]
pub struct FakeBackend {
    pub opens: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
    pub executions: Arc<AtomicUsize>,
    pub open_delay: Option<Duration>,
    pub open_failures: Mutex<VecDeque<LinkedInError>>,
    pub execute_failures: Arc<Mutex<VecDeque<LinkedInError>>>,
}

impl FakeBackend {
    pub fn slow(delay: Duration) -> Self {
        Self {
            open_delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn failing_open(errors: Vec<LinkedInError>) -> Self {
        Self {
            open_failures: Mutex::new(errors.into()),
            ..Default::default()
        }
    }

    pub fn failing_execute(errors: Vec<LinkedInError>) -> Self {
        Self {
            execute_failures: Arc::new(Mutex::new(errors.into())),
            ..Default::default()
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

struct FakeHandle {
    closes: Arc<AtomicUsize>,
    executions: Arc<AtomicUsize>,
    failures: Arc<Mutex<VecDeque<LinkedInError>>>,
}

#[async_trait]
impl ResourceHandle for FakeHandle {
    async fn execute(&self, request: &LinkedInRequest) -> linkedin_core::Result<Value> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(json!({ "operation": request.operation(), "target": request.to_string() }))
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ResourceBackend for FakeBackend {
    async fn open(&self, _credential: &Credential) -> linkedin_core::Result<Arc<dyn ResourceHandle>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.open_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(Arc::new(FakeHandle {
            closes: self.closes.clone(),
            executions: self.executions.clone(),
            failures: self.execute_failures.clone(),
        }))
    }
}

/// Server state over `backend` with explicit and environment cookies
pub fn state_with(backend: Arc<FakeBackend>, cookies: &[&str], transport: &'static str) -> ServerState {
    let mut values = cookies.iter();
    let sources = CredentialSources {
        explicit: values.next().map(|c| RawCredential::Cookie(c.to_string())),
        environment: values.next().map(|c| RawCredential::Cookie(c.to_string())),
    };
    let resolver = CredentialResolver::new(sources, Arc::new(MemoryStore::new())).non_interactive(true);
    let sessions = SessionManager::new(backend, Arc::new(resolver));
    ServerState::new(Arc::new(sessions), transport)
}

pub fn state(backend: Arc<FakeBackend>) -> ServerState {
    state_with(backend, &["AQEDprimary"], "stdio")
}

pub fn request(id: i64, method: &str, params: Option<Value>) -> Value {
    let mut body = json!({ "jsonrpc": "2.0", "id": id, "method": method });
    if let Some(params) = params {
        body["params"] = params;
    }
    body
}

pub fn tool_call(id: i64, name: &str, arguments: Value) -> Value {
    request(id, "tools/call", Some(json!({ "name": name, "arguments": arguments })))
}

pub fn profile_call(id: i64) -> Value {
    tool_call(
        id,
        "get_person_profile",
        json!({ "profile_url": "https://www.linkedin.com/in/ada-lovelace/" }),
    )
}
