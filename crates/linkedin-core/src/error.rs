//! Error types for credential resolution and session lifecycle

use std::time::Duration;

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, LinkedInError>;

/// Errors raised while resolving credentials, opening sessions, or running tools.
///
/// The type is `Clone` so a single initialization outcome can be handed to
/// every caller that waited on it.
#[derive(Debug, Clone, Error)]
pub enum LinkedInError {
    /// Missing or unusable credential configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The resource rejected the credential
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The resource reports the credential is in use by another session
    #[error("Session conflict: {0}")]
    SessionConflict(String),

    /// The resource throttled the request
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Collaborator failure that does not affect the session
    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    /// The resource could not be reached
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Operation exceeded its wall-clock budget
    #[error("Operation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Credential store failure
    #[error("Credential store error: {0}")]
    Store(String),

    /// OAuth token refresh failed
    #[error("Token refresh failed: {0}")]
    Refresh(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The session manager has been shut down
    #[error("Session manager is closed")]
    Closed,
}

impl LinkedInError {
    /// Whether this failure means the remote session can no longer be used
    pub fn invalidates_session(&self) -> bool {
        matches!(
            self,
            LinkedInError::Authentication(_) | LinkedInError::SessionConflict(_)
        )
    }

    /// Whether the resource refused the credential itself.
    ///
    /// A conflict only says the credential is live elsewhere, so it does not
    /// count.
    pub fn rejects_credential(&self) -> bool {
        matches!(self, LinkedInError::Authentication(_))
    }

    /// Short machine-readable label
    pub fn kind(&self) -> &'static str {
        match self {
            LinkedInError::Configuration(_) => "configuration",
            LinkedInError::Authentication(_) => "authentication",
            LinkedInError::SessionConflict(_) => "session_conflict",
            LinkedInError::RateLimited { .. } => "rate_limited",
            LinkedInError::ToolExecution(_) => "tool_execution",
            LinkedInError::ResourceUnavailable(_) => "resource_unavailable",
            LinkedInError::Timeout(_) => "timeout",
            LinkedInError::Store(_) => "store",
            LinkedInError::Refresh(_) => "refresh",
            LinkedInError::Serialization(_) => "serialization",
            LinkedInError::Closed => "closed",
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LinkedInError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<std::io::Error> for LinkedInError {
    fn from(e: std::io::Error) -> Self {
        LinkedInError::Store(e.to_string())
    }
}

impl From<serde_json::Error> for LinkedInError {
    fn from(e: serde_json::Error) -> Self {
        LinkedInError::Serialization(e.to_string())
    }
}
