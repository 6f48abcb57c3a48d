//! Collaborator interfaces for the underlying LinkedIn resource

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::credential::Credential;
use crate::error::Result;

/// A data-retrieval operation, already reduced to LinkedIn identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkedInRequest {
    PersonProfile { public_id: String },
    CompanyProfile { universal_name: String },
    JobDetails { job_id: String },
    SearchJobs {
        keywords: Option<String>,
        location: Option<String>,
    },
    RecommendedJobs,
}

impl LinkedInRequest {
    /// Operation label for logs
    pub fn operation(&self) -> &'static str {
        match self {
            LinkedInRequest::PersonProfile { .. } => "person_profile",
            LinkedInRequest::CompanyProfile { .. } => "company_profile",
            LinkedInRequest::JobDetails { .. } => "job_details",
            LinkedInRequest::SearchJobs { .. } => "search_jobs",
            LinkedInRequest::RecommendedJobs => "recommended_jobs",
        }
    }
}

impl fmt::Display for LinkedInRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkedInRequest::PersonProfile { public_id } => write!(f, "person {}", public_id),
            LinkedInRequest::CompanyProfile { universal_name } => {
                write!(f, "company {}", universal_name)
            }
            LinkedInRequest::JobDetails { job_id } => write!(f, "job {}", job_id),
            LinkedInRequest::SearchJobs { .. } => f.write_str("job search"),
            LinkedInRequest::RecommendedJobs => f.write_str("recommended jobs"),
        }
    }
}

/// Opens resource sessions. Errors are typed: `Authentication` for a rejected
/// credential, `SessionConflict` when the credential is live elsewhere.
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    async fn open(&self, credential: &Credential) -> Result<Arc<dyn ResourceHandle>>;
}

/// A live session against the resource
#[async_trait]
pub trait ResourceHandle: Send + Sync {
    async fn execute(&self, request: &LinkedInRequest) -> Result<Value>;

    /// Release remote resources. Called once when the session leaves `Ready`.
    async fn close(&self);
}
