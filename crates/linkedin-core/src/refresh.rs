//! OAuth access-token refresh
//!
//! Exchanges a refresh token for a new access token. Callers make exactly one
//! attempt; a failure is reported, never retried here.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::credential::{Credential, Provenance, Secret};
use crate::error::{LinkedInError, Result};

/// Token endpoint path, relative to the OAuth host
pub const TOKEN_PATH: &str = "/oauth/v2/accessToken";

/// Default OAuth host
pub const DEFAULT_OAUTH_BASE: &str = "https://www.linkedin.com";

/// Response of a successful token exchange
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenGrant {
    /// Turn the grant into a `refreshed` credential.
    ///
    /// LinkedIn may omit the refresh token on rotation; the previous one is
    /// carried forward in that case.
    pub fn into_credential(&self, previous_refresh: Option<&str>) -> Result<Credential> {
        let refresh = self.refresh_token.as_deref().or(previous_refresh);
        let secret = Secret::oauth(&self.access_token, refresh)
            .map_err(|e| LinkedInError::Refresh(format!("token endpoint returned {}", e)))?;

        let credential = Credential::new(secret, Provenance::Refreshed);
        Ok(match self.expires_in {
            Some(seconds) => credential.with_expires_in(seconds),
            None => credential,
        })
    }
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Exchanges a refresh token for a fresh access token
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant>;
}

/// LinkedIn OAuth 2.0 refresh-token grant
pub struct OAuthRefresher {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

#[derive(Deserialize)]
struct OAuthErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl OAuthRefresher {
    pub fn new(base_url: &str, client_id: String, client_secret: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LinkedInError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            token_url: format!("{}{}", base_url.trim_end_matches('/'), TOKEN_PATH),
            client_id,
            client_secret,
        })
    }
}

impl Drop for OAuthRefresher {
    fn drop(&mut self) {
        self.client_secret.zeroize();
    }
}

#[async_trait]
impl TokenRefresher for OAuthRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        debug!(url = %self.token_url, "Refreshing OAuth access token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| LinkedInError::Refresh(format!("token endpoint unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body: Option<OAuthErrorBody> = response.json().await.ok();
            let reason = body
                .and_then(|b| b.error_description.or(b.error))
                .unwrap_or_else(|| "no error description".to_string());
            warn!(status = status.as_u16(), "OAuth refresh rejected");
            return Err(LinkedInError::Refresh(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                reason
            )));
        }

        response
            .json::<TokenGrant>()
            .await
            .map_err(|e| LinkedInError::Refresh(format!("malformed token response: {}", e)))
    }
}
