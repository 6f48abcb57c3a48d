//! The credential that drives the LinkedIn resource session
//!
//! A credential is either the `li_at` session cookie or an OAuth token pair.
//! Validation here is syntactic only; whether LinkedIn still accepts the
//! secret is discovered when a session is opened with it.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::{LinkedInError, Result};

/// Assumed lifetime of a session cookie from the moment it was acquired
pub const COOKIE_VALIDITY_DAYS: i64 = 30;

/// Lifetime of a LinkedIn access token when the grant did not say
pub const DEFAULT_TOKEN_VALIDITY_DAYS: i64 = 60;

/// Upper bound applied to `expires_in` values (ten years)
pub const MAX_EXPIRES_IN_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Where a credential came from, in descending resolution priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    ExplicitFlag,
    Environment,
    SecureStore,
    Interactive,
    /// Minted by exchanging a refresh token
    Refreshed,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Provenance::ExplicitFlag => "explicit-flag",
            Provenance::Environment => "environment",
            Provenance::SecureStore => "secure-store",
            Provenance::Interactive => "interactive",
            Provenance::Refreshed => "refreshed",
        };
        f.write_str(label)
    }
}

/// Secret material. Zeroized on drop and never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Secret {
    Cookie {
        value: String,
    },
    OAuth {
        access_token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        refresh_token: Option<String>,
    },
}

impl Secret {
    /// Parse a session cookie, accepting an optional `li_at=` prefix
    pub fn cookie(raw: &str) -> Result<Self> {
        let value = raw.trim();
        let value = value.strip_prefix("li_at=").unwrap_or(value);

        if value.is_empty() {
            return Err(LinkedInError::Configuration(
                "session cookie is empty".to_string(),
            ));
        }

        if let Some(c) = value.chars().find(|c| !is_cookie_char(*c)) {
            return Err(LinkedInError::Configuration(format!(
                "session cookie contains invalid character {:?}",
                c
            )));
        }

        Ok(Secret::Cookie {
            value: value.to_string(),
        })
    }

    /// Parse an OAuth access token with an optional refresh token
    pub fn oauth(access_token: &str, refresh_token: Option<&str>) -> Result<Self> {
        let access_token = validate_token(access_token, "access token")?;
        let refresh_token = refresh_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| validate_token(t, "refresh token"))
            .transpose()?;

        Ok(Secret::OAuth {
            access_token,
            refresh_token,
        })
    }

    /// The value presented to LinkedIn on every request
    pub fn expose(&self) -> &str {
        match self {
            Secret::Cookie { value } => value,
            Secret::OAuth { access_token, .. } => access_token,
        }
    }

    pub fn refresh_token(&self) -> Option<&str> {
        match self {
            Secret::Cookie { .. } => None,
            Secret::OAuth { refresh_token, .. } => refresh_token.as_deref(),
        }
    }

    pub fn is_cookie(&self) -> bool {
        matches!(self, Secret::Cookie { .. })
    }

    /// Short stable identifier, safe to log
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.expose().as_bytes());
        hex::encode(&digest[..6])
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        match self {
            Secret::Cookie { value } => value.zeroize(),
            Secret::OAuth {
                access_token,
                refresh_token,
            } => {
                access_token.zeroize();
                refresh_token.zeroize();
            }
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Secret::Cookie { .. } => write!(f, "Cookie(<redacted {}>)", self.fingerprint()),
            Secret::OAuth { refresh_token, .. } => write!(
                f,
                "OAuth(<redacted {}>, refresh: {})",
                self.fingerprint(),
                refresh_token.is_some()
            ),
        }
    }
}

fn is_cookie_char(c: char) -> bool {
    c.is_ascii_graphic() && !matches!(c, ';' | ',' | '"' | '\\')
}

fn validate_token(raw: &str, what: &str) -> Result<String> {
    let token = raw.trim();
    if token.is_empty() {
        return Err(LinkedInError::Configuration(format!("{} is empty", what)));
    }
    if !token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~' | '+' | '/' | '='))
    {
        return Err(LinkedInError::Configuration(format!(
            "{} is not a well-formed bearer token",
            what
        )));
    }
    Ok(token.to_string())
}

/// A resolved credential. Immutable once resolved.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    secret: Secret,
    provenance: Provenance,
    acquired_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Credential {
    /// Credential acquired now, with the expiry policy of its secret kind
    pub fn new(secret: Secret, provenance: Provenance) -> Self {
        Self::acquired_at(secret, provenance, Utc::now())
    }

    pub fn acquired_at(secret: Secret, provenance: Provenance, acquired_at: DateTime<Utc>) -> Self {
        let validity = if secret.is_cookie() {
            Duration::days(COOKIE_VALIDITY_DAYS)
        } else {
            Duration::days(DEFAULT_TOKEN_VALIDITY_DAYS)
        };
        Self {
            secret,
            provenance,
            acquired_at,
            expires_at: expiry(acquired_at, validity),
        }
    }

    /// Override the estimated expiry with an explicit `expires_in` from a token grant
    ///
    /// Values above [`MAX_EXPIRES_IN_SECS`] are clamped.
    pub fn with_expires_in(mut self, seconds: u64) -> Self {
        let seconds = seconds.min(MAX_EXPIRES_IN_SECS) as i64;
        self.expires_at = expiry(self.acquired_at, Duration::seconds(seconds));
        self
    }

    /// Same secret, different provenance (used when persisting to the store)
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn acquired(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn fingerprint(&self) -> String {
        self.secret.fingerprint()
    }
}

fn expiry(acquired_at: DateTime<Utc>, validity: Duration) -> DateTime<Utc> {
    acquired_at
        .checked_add_signed(validity)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &self.secret)
            .field("provenance", &self.provenance)
            .field("acquired_at", &self.acquired_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
