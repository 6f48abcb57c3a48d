//! LinkedIn Core - credential resolution and session lifecycle
//!
//! This crate provides:
//! - The credential model (session cookie or OAuth token pair) with provenance
//!   and expiry, zeroized on drop and redacted in logs
//! - Secure credential stores (in-memory, owner-only JSON file)
//! - The prioritized credential resolver with the OAuth refresh path
//! - The session manager enforcing a single live resource session
//! - An HTTP collaborator that talks to LinkedIn

pub mod backend;
pub mod credential;
pub mod error;
pub mod refresh;
pub mod resolver;
pub mod session;
pub mod store;
pub mod voyager;

pub use backend::{LinkedInRequest, ResourceBackend, ResourceHandle};
pub use credential::{Credential, Provenance, Secret};
pub use error::{LinkedInError, Result};
pub use refresh::{OAuthRefresher, TokenGrant, TokenRefresher};
pub use resolver::{CredentialResolver, CredentialSources, InteractiveAcquirer, RawCredential, TtyPrompt};
pub use session::{InitPolicy, Session, SessionManager, SessionState, DEFAULT_INIT_TIMEOUT};
pub use store::{CredentialStore, FileStore, MemoryStore};
pub use voyager::VoyagerBackend;
