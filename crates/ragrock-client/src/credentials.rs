//! Persisted login session.
//!
//! Stores the username and bearer token as TOML, restricted to owner-only
//! access on unix. Nothing is loaded implicitly: callers run `init` once at
//! startup and inject the store into the `ApiClient` as its session provider.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use ragrock_core::backend::SessionProvider;
use ragrock_core::config::AuthConfig;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// A logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub access_token: String,
}

/// File-backed holder of the current credentials.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    current: Mutex<Option<Credentials>>,
}

impl CredentialStore {
    /// Creates an empty store backed by `path`. Does not touch the file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            current: Mutex::new(None),
        }
    }

    pub fn from_config(auth: &AuthConfig) -> Self {
        Self::new(auth.credentials_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Option<Credentials>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load persisted credentials, if any.
    ///
    /// A missing file is not an error. An unreadable or corrupt file is.
    pub fn init(&self) -> Result<Option<Credentials>, ClientError> {
        if !self.path.exists() {
            tracing::debug!("No stored credentials at {}", self.path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let credentials: Credentials =
            toml::from_str(&content).map_err(|e| ClientError::Decode(e.to_string()))?;
        tracing::info!(username = %credentials.username, "Loaded stored credentials");

        *self.lock() = Some(credentials.clone());
        Ok(Some(credentials))
    }

    /// Remember `credentials` and persist them.
    pub fn login(&self, credentials: Credentials) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(&credentials).map_err(|e| ClientError::Decode(e.to_string()))?;
        std::fs::write(&self.path, content)?;

        // Restrict credentials file to owner-only access.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::info!(username = %credentials.username, "Credentials saved to {}", self.path.display());
        *self.lock() = Some(credentials);
        Ok(())
    }

    /// Forget the current credentials and delete the file.
    pub fn logout(&self) -> Result<(), ClientError> {
        self.lock().take();
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!("Credentials removed from {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn current(&self) -> Option<Credentials> {
        self.lock().clone()
    }
}

impl SessionProvider for CredentialStore {
    fn token(&self) -> Option<String> {
        self.lock()
            .as_ref()
            .map(|c| c.access_token.clone())
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Credentials {
        Credentials {
            username: "alice".to_string(),
            access_token: "tok-123".to_string(),
        }
    }

    #[test]
    fn test_init_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.toml"));

        assert_eq!(store.init().unwrap(), None);
        assert_eq!(store.current(), None);
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_login_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.toml");

        let store = CredentialStore::new(&path);
        store.login(alice()).unwrap();
        assert_eq!(store.token().as_deref(), Some("tok-123"));

        let reopened = CredentialStore::new(&path);
        assert_eq!(reopened.token(), None);
        assert_eq!(reopened.init().unwrap(), Some(alice()));
        assert_eq!(reopened.current(), Some(alice()));
    }

    #[cfg(unix)]
    #[test]
    fn test_credentials_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.toml"));
        store.login(alice()).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_logout_clears_memory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.toml"));
        store.login(alice()).unwrap();

        store.logout().unwrap();
        assert_eq!(store.current(), None);
        assert!(!store.path().exists());

        // Second logout is a no-op.
        store.logout().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.toml");
        std::fs::write(&path, "username = ").unwrap();

        let store = CredentialStore::new(&path);
        assert!(matches!(store.init(), Err(ClientError::Decode(_))));
        assert_eq!(store.current(), None);
    }

    #[test]
    fn test_empty_token_is_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.toml"));
        store
            .login(Credentials {
                username: "bob".to_string(),
                access_token: String::new(),
            })
            .unwrap();
        assert_eq!(store.token(), None);
    }
}
