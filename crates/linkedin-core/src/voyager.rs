//! HTTP collaborator speaking LinkedIn's web API
//!
//! A cookie session authenticates with `li_at` plus a generated `JSESSIONID`
//! that doubles as the CSRF token. An OAuth session uses a bearer token; the
//! official API only exposes the member's own identity, so data operations
//! require a cookie session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, COOKIE, LOCATION, RETRY_AFTER};
use reqwest::{redirect, Client, Url};
use serde_json::Value;
use tracing::{debug, info};

use crate::backend::{LinkedInRequest, ResourceBackend, ResourceHandle};
use crate::credential::{Credential, Secret};
use crate::error::{LinkedInError, Result};

pub const DEFAULT_API_BASE: &str = "https://www.linkedin.com";

const RESTLI_PROTOCOL_VERSION: &str = "2.0.0";
const VOYAGER_ACCEPT: &str = "application/vnd.linkedin.normalized+json+2.1";
const JOB_PAGE_SIZE: &str = "25";

/// Map an HTTP outcome to the error taxonomy. `None` means success.
pub fn classify_status(
    status: u16,
    location: Option<&str>,
    retry_after: Option<&str>,
) -> Option<LinkedInError> {
    match status {
        200..=299 => None,
        300..=399 => {
            let target = location.unwrap_or_default();
            if ["/login", "/checkpoint", "/authwall", "/uas/"]
                .iter()
                .any(|marker| target.contains(marker))
            {
                Some(LinkedInError::Authentication(
                    "LinkedIn redirected to the login page; the credential is no longer valid"
                        .to_string(),
                ))
            } else {
                Some(LinkedInError::ToolExecution(format!(
                    "unexpected redirect ({})",
                    status
                )))
            }
        }
        401 | 403 => Some(LinkedInError::Authentication(format!(
            "LinkedIn rejected the credential ({})",
            status
        ))),
        409 => Some(LinkedInError::SessionConflict(
            "the credential is already in use by another session".to_string(),
        )),
        429 | 999 => Some(LinkedInError::RateLimited {
            message: format!("LinkedIn throttled the request ({})", status),
            retry_after: retry_after
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs),
        }),
        404 => Some(LinkedInError::ToolExecution(
            "the requested LinkedIn entity was not found".to_string(),
        )),
        500..=599 => Some(LinkedInError::ResourceUnavailable(format!(
            "LinkedIn returned {}",
            status
        ))),
        _ => Some(LinkedInError::ToolExecution(format!(
            "LinkedIn returned unexpected status {}",
            status
        ))),
    }
}

fn transport_error(e: reqwest::Error) -> LinkedInError {
    if e.is_timeout() {
        LinkedInError::ResourceUnavailable("LinkedIn did not answer in time".to_string())
    } else {
        LinkedInError::ResourceUnavailable(format!("LinkedIn unreachable: {}", e))
    }
}

fn sensitive(value: String) -> Result<HeaderValue> {
    let mut header = HeaderValue::from_str(&value)
        .map_err(|_| LinkedInError::Configuration("credential is not a valid header value".to_string()))?;
    header.set_sensitive(true);
    Ok(header)
}

/// Session mode derived from the credential kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Cookie,
    OAuth,
}

/// Opens sessions against LinkedIn over HTTPS
pub struct VoyagerBackend {
    base_url: Url,
    timeout: Duration,
}

impl VoyagerBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| LinkedInError::Configuration(format!("invalid API base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(LinkedInError::Configuration(format!(
                "API base URL {} cannot carry a path",
                base_url
            )));
        }
        Ok(Self { base_url, timeout })
    }

    fn client_for(&self, credential: &Credential) -> Result<(Client, Mode)> {
        let mut headers = HeaderMap::new();
        headers.insert("x-restli-protocol-version", HeaderValue::from_static(RESTLI_PROTOCOL_VERSION));

        let mode = match credential.secret() {
            Secret::Cookie { value } => {
                let jsession = format!("ajax:{:019}", rand::thread_rng().gen_range(0..10u64.pow(18)));
                headers.insert(
                    COOKIE,
                    sensitive(format!("li_at={}; JSESSIONID=\"{}\"", value, jsession))?,
                );
                headers.insert("csrf-token", sensitive(jsession)?);
                headers.insert(ACCEPT, HeaderValue::from_static(VOYAGER_ACCEPT));
                Mode::Cookie
            }
            Secret::OAuth { access_token, .. } => {
                headers.insert(AUTHORIZATION, sensitive(format!("Bearer {}", access_token))?);
                headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
                Mode::OAuth
            }
        };

        let client = Client::builder()
            .default_headers(headers)
            .redirect(redirect::Policy::none())
            .timeout(self.timeout)
            .build()
            .map_err(|e| LinkedInError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok((client, mode))
    }
}

#[async_trait]
impl ResourceBackend for VoyagerBackend {
    async fn open(&self, credential: &Credential) -> Result<Arc<dyn ResourceHandle>> {
        let (http, mode) = self.client_for(credential)?;
        let session = VoyagerSession {
            http,
            base_url: self.base_url.clone(),
            mode,
        };

        // A cheap authenticated call proves the credential before we report Ready
        let probe = match mode {
            Mode::Cookie => session.url(&["voyager", "api", "me"])?,
            Mode::OAuth => session.url(&["v2", "userinfo"])?,
        };
        session.get(probe).await?;

        info!(mode = ?mode, fingerprint = %credential.fingerprint(), "LinkedIn session verified");
        Ok(Arc::new(session))
    }
}

struct VoyagerSession {
    http: Client,
    base_url: Url,
    mode: Mode,
}

impl VoyagerSession {
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| LinkedInError::Configuration("API base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<Value> {
        debug!(path = %url.path(), "LinkedIn GET");
        let response = self.http.get(url).send().await.map_err(transport_error)?;

        let status = response.status().as_u16();
        let header = |name: reqwest::header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v: &HeaderValue| v.to_str().ok())
                .map(str::to_string)
        };
        let location = header(LOCATION);
        let retry_after = header(RETRY_AFTER);

        if let Some(err) = classify_status(status, location.as_deref(), retry_after.as_deref()) {
            return Err(err);
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| LinkedInError::ToolExecution(format!("unreadable LinkedIn response: {}", e)))
    }

    fn request_url(&self, request: &LinkedInRequest) -> Result<Url> {
        let url = match request {
            LinkedInRequest::PersonProfile { public_id } => {
                self.url(&["voyager", "api", "identity", "profiles", public_id.as_str(), "profileView"])?
            }
            LinkedInRequest::CompanyProfile { universal_name } => {
                let mut url = self.url(&["voyager", "api", "organization", "companies"])?;
                url.query_pairs_mut()
                    .append_pair("q", "universalName")
                    .append_pair("universalName", universal_name);
                url
            }
            LinkedInRequest::JobDetails { job_id } => {
                self.url(&["voyager", "api", "jobs", "jobPostings", job_id.as_str()])?
            }
            LinkedInRequest::SearchJobs { keywords, location } => {
                let mut url = self.url(&["voyager", "api", "voyagerJobsDashJobCards"])?;
                {
                    let mut query = url.query_pairs_mut();
                    query.append_pair("q", "jobSearch").append_pair("count", JOB_PAGE_SIZE);
                    if let Some(keywords) = keywords {
                        query.append_pair("keywords", keywords);
                    }
                    if let Some(location) = location {
                        query.append_pair("location", location);
                    }
                }
                url
            }
            LinkedInRequest::RecommendedJobs => {
                let mut url = self.url(&["voyager", "api", "voyagerJobsDashJobCards"])?;
                url.query_pairs_mut()
                    .append_pair("q", "jobCollectionRecommended")
                    .append_pair("count", JOB_PAGE_SIZE);
                url
            }
        };
        Ok(url)
    }
}

#[async_trait]
impl ResourceHandle for VoyagerSession {
    async fn execute(&self, request: &LinkedInRequest) -> Result<Value> {
        if self.mode == Mode::OAuth {
            return Err(LinkedInError::ToolExecution(format!(
                "{} requires a session cookie; the official OAuth API does not expose it",
                request.operation()
            )));
        }
        let url = self.request_url(request)?;
        self.get(url).await
    }

    async fn close(&self) {
        debug!(mode = ?self.mode, "Releasing LinkedIn session");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> VoyagerSession {
        VoyagerSession {
            http: Client::new(),
            base_url: Url::parse(DEFAULT_API_BASE).unwrap(),
            mode: Mode::Cookie,
        }
    }

    #[test]
    fn test_classify_success() {
        assert!(classify_status(200, None, None).is_none());
        assert!(classify_status(204, None, None).is_none());
    }

    #[test]
    fn test_classify_auth_failures() {
        assert!(matches!(
            classify_status(401, None, None),
            Some(LinkedInError::Authentication(_))
        ));
        assert!(matches!(
            classify_status(403, None, None),
            Some(LinkedInError::Authentication(_))
        ));
        assert!(matches!(
            classify_status(302, Some("https://www.linkedin.com/checkpoint/lg/login"), None),
            Some(LinkedInError::Authentication(_))
        ));
        assert!(matches!(
            classify_status(302, Some("https://www.linkedin.com/feed/"), None),
            Some(LinkedInError::ToolExecution(_))
        ));
    }

    #[test]
    fn test_classify_conflict_and_throttle() {
        assert!(matches!(
            classify_status(409, None, None),
            Some(LinkedInError::SessionConflict(_))
        ));

        let err = classify_status(429, None, Some("120")).unwrap();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(120)));

        let err = classify_status(999, None, Some("soon")).unwrap();
        assert!(matches!(err, LinkedInError::RateLimited { retry_after: None, .. }));
    }

    #[test]
    fn test_classify_server_and_other() {
        assert!(matches!(
            classify_status(503, None, None),
            Some(LinkedInError::ResourceUnavailable(_))
        ));
        assert!(matches!(
            classify_status(404, None, None),
            Some(LinkedInError::ToolExecution(_))
        ));
        assert!(matches!(
            classify_status(418, None, None),
            Some(LinkedInError::ToolExecution(_))
        ));
    }

    #[test]
    fn test_request_urls() {
        let session = session();

        let url = session
            .request_url(&LinkedInRequest::PersonProfile {
                public_id: "williamhgates".into(),
            })
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.linkedin.com/voyager/api/identity/profiles/williamhgates/profileView"
        );

        let url = session
            .request_url(&LinkedInRequest::SearchJobs {
                keywords: Some("rust engineer".into()),
                location: None,
            })
            .unwrap();
        assert!(url.as_str().contains("keywords=rust+engineer"));
        assert!(!url.as_str().contains("location="));
    }

    #[test]
    fn test_path_segments_are_escaped() {
        let url = session()
            .request_url(&LinkedInRequest::JobDetails {
                job_id: "../me".into(),
            })
            .unwrap();
        assert!(url.path().ends_with("/jobPostings/..%2Fme"));
    }

    #[test]
    fn test_rejects_bad_base() {
        assert!(VoyagerBackend::new("not a url", Duration::from_secs(5)).is_err());
        assert!(VoyagerBackend::new("mailto:me@example.com", Duration::from_secs(5)).is_err());
    }
}
