//! Credential resolution
//!
//! Sources are consulted in a fixed order: explicit flag, environment, secure
//! store, interactive prompt. The first present, syntactically valid and not
//! previously rejected credential wins. In non-interactive mode a miss is a
//! configuration error and the prompt is never touched.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::credential::{Credential, Provenance, Secret};
use crate::error::{LinkedInError, Result};
use crate::refresh::TokenRefresher;
use crate::store::CredentialStore;

/// Unvalidated credential material as it arrived from a flag or variable
#[derive(Clone)]
pub enum RawCredential {
    Cookie(String),
    OAuth {
        access_token: String,
        refresh_token: Option<String>,
        expires_in: Option<u64>,
    },
}

impl RawCredential {
    fn validate(&self, provenance: Provenance) -> Result<Credential> {
        match self {
            RawCredential::Cookie(value) => Ok(Credential::new(Secret::cookie(value)?, provenance)),
            RawCredential::OAuth {
                access_token,
                refresh_token,
                expires_in,
            } => {
                let credential = Credential::new(
                    Secret::oauth(access_token, refresh_token.as_deref())?,
                    provenance,
                );
                Ok(match expires_in {
                    Some(seconds) => credential.with_expires_in(*seconds),
                    None => credential,
                })
            }
        }
    }
}

impl Drop for RawCredential {
    fn drop(&mut self) {
        match self {
            RawCredential::Cookie(value) => value.zeroize(),
            RawCredential::OAuth {
                access_token,
                refresh_token,
                ..
            } => {
                access_token.zeroize();
                refresh_token.zeroize();
            }
        }
    }
}

impl fmt::Debug for RawCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawCredential::Cookie(_) => f.write_str("Cookie(<redacted>)"),
            RawCredential::OAuth { .. } => f.write_str("OAuth(<redacted>)"),
        }
    }
}

/// Non-interactive sources captured once at startup
#[derive(Debug, Clone, Default)]
pub struct CredentialSources {
    pub explicit: Option<RawCredential>,
    pub environment: Option<RawCredential>,
}

/// Acquires a credential from a human operator
#[async_trait]
pub trait InteractiveAcquirer: Send + Sync {
    async fn acquire(&self) -> Result<Secret>;
}

/// Prompts on the controlling terminal for the `li_at` cookie
pub struct TtyPrompt;

#[async_trait]
impl InteractiveAcquirer for TtyPrompt {
    async fn acquire(&self) -> Result<Secret> {
        let line = tokio::task::spawn_blocking(read_tty_line)
            .await
            .map_err(|e| LinkedInError::Configuration(format!("prompt task failed: {}", e)))??;
        Secret::cookie(&line)
    }
}

#[cfg(unix)]
fn read_tty_line() -> Result<String> {
    use std::io::{BufRead, BufReader, Write};

    let mut tty = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/tty")
        .map_err(|e| LinkedInError::Configuration(format!("no controlling terminal: {}", e)))?;

    tty.write_all(b"LinkedIn li_at cookie: ")?;
    tty.flush()?;

    let mut line = String::new();
    BufReader::new(tty).read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(not(unix))]
fn read_tty_line() -> Result<String> {
    Err(LinkedInError::Configuration(
        "interactive credential entry is only supported on unix terminals".to_string(),
    ))
}

/// Resolves the driving credential and owns the OAuth refresh path
pub struct CredentialResolver {
    sources: CredentialSources,
    store: Arc<dyn CredentialStore>,
    non_interactive: bool,
    interactive: Option<Arc<dyn InteractiveAcquirer>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    /// Fingerprints of credentials the resource has rejected
    rejected: Mutex<HashSet<String>>,
    /// Rejected OAuth credential whose refresh token has not been tried yet
    pending_refresh: Mutex<Option<Credential>>,
}

impl CredentialResolver {
    pub fn new(sources: CredentialSources, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            sources,
            store,
            non_interactive: false,
            interactive: None,
            refresher: None,
            rejected: Mutex::new(HashSet::new()),
            pending_refresh: Mutex::new(None),
        }
    }

    pub fn non_interactive(mut self, non_interactive: bool) -> Self {
        self.non_interactive = non_interactive;
        self
    }

    pub fn with_interactive(mut self, acquirer: Arc<dyn InteractiveAcquirer>) -> Self {
        self.interactive = Some(acquirer);
        self
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    fn is_rejected(&self, credential: &Credential) -> bool {
        self.rejected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&credential.fingerprint())
    }

    fn candidate(&self, raw: Option<&RawCredential>, provenance: Provenance) -> Option<Credential> {
        let raw = raw?;
        match raw.validate(provenance) {
            Ok(credential) if self.is_rejected(&credential) => {
                debug!(%provenance, fingerprint = %credential.fingerprint(), "Skipping rejected credential");
                None
            }
            Ok(credential) => Some(credential),
            Err(e) => {
                warn!(%provenance, error = %e, "Ignoring malformed credential");
                None
            }
        }
    }

    fn stored(&self) -> Option<Credential> {
        match self.store.load() {
            Ok(Some(credential)) if self.is_rejected(&credential) => {
                debug!(fingerprint = %credential.fingerprint(), "Skipping rejected stored credential");
                None
            }
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Credential store unreadable");
                None
            }
        }
    }

    /// Walk the priority order and return the first usable credential.
    ///
    /// If the last rejected credential carried a refresh token, a single
    /// refresh is attempted first.
    pub async fn resolve(&self) -> Result<Credential> {
        let stale = self
            .pending_refresh
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(stale) = stale {
            match self.refresh(&stale).await {
                Ok(fresh) if !self.is_rejected(&fresh) => return Ok(fresh),
                Ok(_) => warn!("Refresh returned an already rejected token"),
                Err(e) => warn!(error = %e, "OAuth refresh failed, falling back to resolution"),
            }
        }

        let found = self
            .candidate(self.sources.explicit.as_ref(), Provenance::ExplicitFlag)
            .or_else(|| self.candidate(self.sources.environment.as_ref(), Provenance::Environment))
            .or_else(|| self.stored());

        if let Some(credential) = found {
            if credential.is_expired(Utc::now()) {
                warn!(
                    provenance = %credential.provenance(),
                    fingerprint = %credential.fingerprint(),
                    expires_at = %credential.expires_at(),
                    "Credential is past its estimated expiry; trying it anyway"
                );
            }
            info!(
                provenance = %credential.provenance(),
                fingerprint = %credential.fingerprint(),
                expires_at = %credential.expires_at(),
                "Resolved LinkedIn credential"
            );
            return Ok(credential);
        }

        if self.non_interactive {
            return Err(LinkedInError::Configuration(
                "no usable LinkedIn credential: set LINKEDIN_COOKIE or LINKEDIN_ACCESS_TOKEN, \
                 or store one by running once interactively"
                    .to_string(),
            ));
        }

        let acquirer = self.interactive.as_ref().ok_or_else(|| {
            LinkedInError::Configuration(
                "no usable LinkedIn credential and no interactive prompt available".to_string(),
            )
        })?;

        let credential = Credential::new(acquirer.acquire().await?, Provenance::Interactive);
        if self.is_rejected(&credential) {
            return Err(LinkedInError::Configuration(
                "the entered credential was already rejected by LinkedIn".to_string(),
            ));
        }

        self.persist(&credential);
        info!(fingerprint = %credential.fingerprint(), "Acquired credential interactively");
        Ok(credential)
    }

    /// Remember that the resource refused this credential
    pub fn reject(&self, credential: &Credential) {
        let fingerprint = credential.fingerprint();
        self.rejected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(fingerprint.clone());

        if let Ok(Some(stored)) = self.store.load() {
            if stored.fingerprint() == fingerprint {
                match self.store.clear() {
                    Ok(()) => info!(%fingerprint, "Cleared rejected credential from store"),
                    Err(e) => warn!(%fingerprint, error = %e, "Failed to clear rejected credential"),
                }
            }
        }
        if self.can_refresh(credential) {
            *self.pending_refresh.lock().unwrap_or_else(|e| e.into_inner()) = Some(credential.clone());
        }
        warn!(provenance = %credential.provenance(), %fingerprint, "Credential rejected");
    }

    /// Whether `refresh` could be attempted for this credential
    pub fn can_refresh(&self, credential: &Credential) -> bool {
        self.refresher.is_some() && credential.secret().refresh_token().is_some()
    }

    /// Exchange the credential's refresh token for a new access token. One attempt.
    pub async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        let refresh_token = credential
            .secret()
            .refresh_token()
            .ok_or_else(|| LinkedInError::Refresh("credential carries no refresh token".to_string()))?;
        let refresher = self
            .refresher
            .as_ref()
            .ok_or_else(|| LinkedInError::Refresh("OAuth refresh is not configured".to_string()))?;

        let grant = refresher.refresh(refresh_token).await?;
        let refreshed = grant.into_credential(Some(refresh_token))?;

        self.persist(&refreshed);
        info!(
            fingerprint = %refreshed.fingerprint(),
            expires_at = %refreshed.expires_at(),
            "Refreshed OAuth access token"
        );
        Ok(refreshed)
    }

    fn persist(&self, credential: &Credential) {
        if let Err(e) = self.store.save(credential) {
            warn!(error = %e, "Failed to save credential to store");
        }
    }
}
