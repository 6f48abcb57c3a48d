//! Secure credential storage
//!
//! The resolver only needs `load`/`save`/`clear`. Two backends ship with the
//! server: an in-memory store for tests and ephemeral instances, and a JSON
//! file readable only by its owner.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::credential::{Credential, Provenance};
use crate::error::{LinkedInError, Result};

/// Minimal persistence interface for the driving credential
pub trait CredentialStore: Send + Sync {
    /// Stored credential, if any. Provenance is always `secure-store`.
    fn load(&self) -> Result<Option<Credential>>;

    fn save(&self, credential: &Credential) -> Result<()>;

    /// Remove the stored credential. Clearing an empty store is not an error.
    fn clear(&self) -> Result<()>;
}

/// Process-local store
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn with_credential(credential: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(credential.with_provenance(Provenance::SecureStore))),
        }
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<Credential>>> {
        self.slot
            .lock()
            .map_err(|_| LinkedInError::Store("memory store lock poisoned".to_string()))
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<Credential>> {
        Ok(self.slot()?.clone())
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        *self.slot()? = Some(credential.clone().with_provenance(Provenance::SecureStore));
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot()? = None;
        Ok(())
    }
}

/// JSON file store with owner-only permissions
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `<config dir>/linkedin-mcp/credential.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("linkedin-mcp")
            .join("credential.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileStore {
    fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let credential: Credential = serde_json::from_str(&content).map_err(|e| {
            LinkedInError::Store(format!(
                "unreadable credential file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(path = %self.path.display(), fingerprint = %credential.fingerprint(), "Loaded stored credential");
        Ok(Some(credential.with_provenance(Provenance::SecureStore)))
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let stored = credential.clone().with_provenance(Provenance::SecureStore);
        let content = serde_json::to_string_pretty(&stored)?;

        // Write atomically
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&temp_path, &self.path)?;

        debug!(path = %self.path.display(), fingerprint = %stored.fingerprint(), "Saved credential");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Cleared stored credential");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
