//! Persistence for the single OAuth credential the application acts with.
//!
//! The store is an explicit object handed to [`crate::oauth::OAuthManager`] rather than
//! process-global state, so tests can swap in [`MemoryTokenStore`].

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Default location of the credential file, relative to the working directory.
pub const DEFAULT_TOKEN_PATH: &str = "tmp/tokens.json";

/// An OAuth2 access/refresh token pair and the moment the access token stops being valid.
///
/// `expires_at` only carries whole seconds since that is all the persisted form keeps.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredCredential")]
pub struct Credential {
    access_token: String,
    refresh_token: String,
    #[serde(with = "jiff::fmt::serde::timestamp::second::required")]
    expires_at: Timestamp,
}

impl Credential {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: Timestamp,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: Timestamp::from_second(expires_at.as_second()).unwrap_or(expires_at),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    /// Whether the access token can no longer be presented at `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

// Tokens never end up in logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// On-disk shape of [`Credential`], checked before it is accepted.
#[derive(Deserialize)]
struct StoredCredential {
    access_token: String,
    refresh_token: String,
    #[serde(with = "jiff::fmt::serde::timestamp::second::required")]
    expires_at: Timestamp,
}

impl TryFrom<StoredCredential> for Credential {
    type Error = &'static str;

    fn try_from(stored: StoredCredential) -> Result<Self, Self::Error> {
        if stored.access_token.is_empty() {
            return Err("stored credential has an empty access token");
        }
        if stored.refresh_token.is_empty() {
            return Err("stored credential has an empty refresh token");
        }
        Ok(Self {
            access_token: stored.access_token,
            refresh_token: stored.refresh_token,
            expires_at: stored.expires_at,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("token store I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("stored credential is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Holds at most one [`Credential`].
///
/// `load` never fails: anything that cannot be turned into a credential counts as "no
/// credential", so callers fall back to the authorization flow.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> impl Future<Output = Option<Credential>> + Send;

    fn save(&self, credential: &Credential)
    -> impl Future<Output = Result<(), TokenStoreError>> + Send;

    /// Removes the stored credential. Clearing an empty store succeeds.
    fn clear(&self) -> impl Future<Output = Result<(), TokenStoreError>> + Send;
}

/// Keeps the credential as a JSON document on disk.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the credential file, reporting why it could not be used.
    ///
    /// A missing file is `Ok(None)`; unparseable content is [`TokenStoreError::Malformed`].
    pub async fn read(&self) -> Result<Option<Credential>, TokenStoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let credential = serde_json::from_slice(&raw)?;
        Ok(Some(credential))
    }
}

impl TokenStore for FileTokenStore {
    async fn load(&self) -> Option<Credential> {
        match self.read().await {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "ignoring unusable credential file"
                );
                None
            }
        }
    }

    async fn save(&self, credential: &Credential) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(credential)?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&self.path).await?;
        // an existing file keeps its old mode on open
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600)).await?;
        }
        file.write_all(&json).await?;
        file.flush().await?;

        tracing::debug!(
            path = %self.path.display(),
            expires_at = %credential.expires_at,
            "saved credential"
        );
        Ok(())
    }

    async fn clear(&self) -> Result<(), TokenStoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "removed credential file");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// A [`TokenStore`] that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    credential: Mutex<Option<Credential>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: Mutex::new(Some(credential)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Option<Credential> {
        self.credential.lock().await.clone()
    }

    async fn save(&self, credential: &Credential) -> Result<(), TokenStoreError> {
        *self.credential.lock().await = Some(credential.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), TokenStoreError> {
        self.credential.lock().await.take();
        Ok(())
    }
}
