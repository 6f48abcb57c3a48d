//! Session lifecycle for the single LinkedIn resource session
//!
//! `Uninitialized -> Initializing -> Ready -> Invalid -> Closed`
//!
//! Only one initialization runs at a time. Callers arriving while it is in
//! flight wait on the same shared future and observe the same outcome. The
//! initialization runs on its own task so a cancelled caller cannot strand the
//! state machine in `Initializing`, and it is bounded by a wall-clock budget
//! after which the state rolls back to `Invalid`.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{LinkedInRequest, ResourceBackend, ResourceHandle};
use crate::credential::Credential;
use crate::error::{LinkedInError, Result};
use crate::resolver::CredentialResolver;

/// Default wall-clock budget for one initialization
pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Observable session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Invalid,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Initializing => "initializing",
            SessionState::Ready => "ready",
            SessionState::Invalid => "invalid",
            SessionState::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// When the first acquisition happens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPolicy {
    /// On the first tool call that needs the resource
    Lazy,
    /// Once at process start
    Eager,
}

/// A live binding between a credential and the resource
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    last_used_at: Mutex<DateTime<Utc>>,
    credential: Credential,
    handle: Arc<dyn ResourceHandle>,
    released: AtomicBool,
}

impl Session {
    fn new(credential: Credential, handle: Arc<dyn ResourceHandle>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            last_used_at: Mutex::new(now),
            credential,
            handle,
            released: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_used_at(&self) -> DateTime<Utc> {
        *self.last_used_at.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    fn touch(&self) {
        *self.last_used_at.lock().unwrap_or_else(|e| e.into_inner()) = Utc::now();
    }

    /// Run one operation against the resource
    pub async fn execute(&self, request: &LinkedInRequest) -> Result<Value> {
        if self.released.load(Ordering::SeqCst) {
            return Err(LinkedInError::ResourceUnavailable(
                "the session was released while the request was queued; retry".to_string(),
            ));
        }
        self.touch();
        self.handle.execute(request).await
    }

    async fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.handle.close().await;
            debug!(session_id = %self.id, "Session released");
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("credential", &self.credential)
            .finish()
    }
}

type InitFuture = Shared<BoxFuture<'static, Result<Arc<Session>>>>;

enum Phase {
    Uninitialized,
    Initializing(InitFuture),
    Ready(Arc<Session>),
    Invalid(LinkedInError),
    Closed,
}

impl Phase {
    fn state(&self) -> SessionState {
        match self {
            Phase::Uninitialized => SessionState::Uninitialized,
            Phase::Initializing(_) => SessionState::Initializing,
            Phase::Ready(_) => SessionState::Ready,
            Phase::Invalid(_) => SessionState::Invalid,
            Phase::Closed => SessionState::Closed,
        }
    }
}

struct Inner {
    phase: Phase,
    /// Bumped for every initialization and on shutdown; stale attempts compare against it
    generation: u64,
}

/// Owns the session state machine. The only component that mutates it.
pub struct SessionManager {
    backend: Arc<dyn ResourceBackend>,
    resolver: Arc<CredentialResolver>,
    init_timeout: Duration,
    inner: Arc<Mutex<Inner>>,
    attempts: Arc<AtomicU64>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn ResourceBackend>, resolver: Arc<CredentialResolver>) -> Self {
        Self {
            backend,
            resolver,
            init_timeout: DEFAULT_INIT_TIMEOUT,
            inner: Arc::new(Mutex::new(Inner {
                phase: Phase::Uninitialized,
                generation: 0,
            })),
            attempts: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> SessionState {
        self.lock().phase.state()
    }

    /// Error that put the session into `Invalid`, if that is the current state
    pub fn last_error(&self) -> Option<LinkedInError> {
        match &self.lock().phase {
            Phase::Invalid(e) => Some(e.clone()),
            _ => None,
        }
    }

    /// When the `Ready` session last ran an operation. Never acquires.
    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        match &self.lock().phase {
            Phase::Ready(session) => Some(session.last_used_at()),
            _ => None,
        }
    }

    /// Number of initialization attempts started so far
    pub fn init_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Apply the configured policy at process start.
    ///
    /// Eager start fails only on configuration errors; other failures leave
    /// the session `Invalid` for the first request to retry.
    pub async fn start(&self, policy: InitPolicy) -> Result<()> {
        if policy == InitPolicy::Lazy {
            debug!("Lazy session policy, deferring acquisition");
            return Ok(());
        }

        info!("Eager session policy, acquiring at startup");
        match self.acquire().await {
            Ok(session) => {
                info!(session_id = %session.id(), "Session ready at startup");
                Ok(())
            }
            Err(e @ LinkedInError::Configuration(_)) => Err(e),
            Err(e) => {
                warn!(error = %e, "Eager session acquisition failed; will retry on demand");
                Ok(())
            }
        }
    }

    /// Return the `Ready` session, initializing it if needed
    pub async fn acquire(&self) -> Result<Arc<Session>> {
        let init = {
            let mut inner = self.lock();
            match &inner.phase {
                Phase::Ready(session) => return Ok(session.clone()),
                Phase::Closed => return Err(LinkedInError::Closed),
                Phase::Initializing(init) => {
                    debug!("Joining in-flight session initialization");
                    init.clone()
                }
                Phase::Uninitialized | Phase::Invalid(_) => {
                    let from = inner.phase.state();
                    inner.generation += 1;
                    let init = self.begin_init(inner.generation);
                    inner.phase = Phase::Initializing(init.clone());
                    info!(%from, to = %SessionState::Initializing, generation = inner.generation, "Session transition");
                    init
                }
            }
        };
        init.await
    }

    fn begin_init(&self, generation: u64) -> InitFuture {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let backend = self.backend.clone();
        let resolver = self.resolver.clone();
        let inner = self.inner.clone();
        let budget = self.init_timeout;

        let task = tokio::spawn(async move {
            debug!(attempt, "Initializing session");
            let outcome = match tokio::time::timeout(budget, initialize(backend, resolver)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(attempt, budget_secs = budget.as_secs(), "Session initialization timed out");
                    Err(LinkedInError::Timeout(budget))
                }
            };
            settle(&inner, generation, outcome).await
        });

        let rollback = self.inner.clone();
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let err = LinkedInError::ResourceUnavailable(format!(
                        "session initialization aborted: {}",
                        e
                    ));
                    let mut inner = rollback.lock().unwrap_or_else(|e| e.into_inner());
                    if inner.generation == generation && matches!(inner.phase, Phase::Initializing(_)) {
                        inner.phase = Phase::Invalid(err.clone());
                    }
                    Err(err)
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Drop `session` after the resource rejected it mid-use.
    ///
    /// No-op if `session` is no longer the current one.
    pub async fn mark_invalid(&self, session: &Arc<Session>, error: &LinkedInError) {
        let transitioned = {
            let mut inner = self.lock();
            match &inner.phase {
                Phase::Ready(current) if current.id() == session.id() => {
                    inner.phase = Phase::Invalid(error.clone());
                    true
                }
                _ => false,
            }
        };

        if transitioned {
            warn!(session_id = %session.id(), error = %error, from = %SessionState::Ready, to = %SessionState::Invalid, "Session transition");
            if error.rejects_credential() {
                self.resolver.reject(session.credential());
            }
            session.release().await;
        }
    }

    /// Explicit teardown. Returns to `Uninitialized` so the next acquisition starts fresh.
    ///
    /// Returns whether a live session was released. An initialization in
    /// flight is left to complete.
    pub async fn invalidate(&self) -> Result<bool> {
        let released = {
            let mut inner = self.lock();
            match &inner.phase {
                Phase::Closed => return Err(LinkedInError::Closed),
                Phase::Initializing(_) => {
                    debug!("Teardown requested during initialization; leaving it in flight");
                    return Ok(false);
                }
                Phase::Uninitialized => return Ok(false),
                Phase::Ready(_) | Phase::Invalid(_) => {
                    let from = inner.phase.state();
                    info!(%from, to = %SessionState::Uninitialized, "Session transition");
                    match std::mem::replace(&mut inner.phase, Phase::Uninitialized) {
                        Phase::Ready(session) => Some(session),
                        _ => None,
                    }
                }
            }
        };

        match released {
            Some(session) => {
                session.release().await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Terminal transition. Further acquisitions fail with `Closed`.
    pub async fn shutdown(&self) {
        let released = {
            let mut inner = self.lock();
            if matches!(inner.phase, Phase::Closed) {
                return;
            }
            inner.generation += 1;
            let from = inner.phase.state();
            info!(%from, to = %SessionState::Closed, "Session transition");
            match std::mem::replace(&mut inner.phase, Phase::Closed) {
                Phase::Ready(session) => Some(session),
                _ => None,
            }
        };

        if let Some(session) = released {
            session.release().await;
        }
    }
}

async fn initialize(
    backend: Arc<dyn ResourceBackend>,
    resolver: Arc<CredentialResolver>,
) -> Result<Arc<Session>> {
    let credential = resolver.resolve().await?;
    match backend.open(&credential).await {
        Ok(handle) => Ok(Arc::new(Session::new(credential, handle))),
        Err(e) => {
            if e.rejects_credential() {
                resolver.reject(&credential);
            }
            Err(e)
        }
    }
}

/// Record the outcome of initialization `generation`, unless it was superseded
async fn settle(
    inner: &Mutex<Inner>,
    generation: u64,
    outcome: Result<Arc<Session>>,
) -> Result<Arc<Session>> {
    let superseded = {
        let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.generation != generation || !matches!(inner.phase, Phase::Initializing(_)) {
            true
        } else {
            match &outcome {
                Ok(session) => {
                    inner.phase = Phase::Ready(session.clone());
                    info!(session_id = %session.id(), provenance = %session.credential().provenance(), from = %SessionState::Initializing, to = %SessionState::Ready, "Session transition");
                }
                Err(e) => {
                    inner.phase = Phase::Invalid(e.clone());
                    warn!(error = %e, kind = e.kind(), from = %SessionState::Initializing, to = %SessionState::Invalid, "Session transition");
                }
            }
            false
        }
    };

    if superseded {
        debug!(generation, "Discarding superseded session initialization");
        if let Ok(session) = &outcome {
            session.release().await;
        }
        return Err(LinkedInError::Closed);
    }
    outcome
}
