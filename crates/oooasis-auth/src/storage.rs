use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use oooasis_core::AuthError;
use serde::{Deserialize, Serialize};

/// Default token cache, looked up in the working directory.
pub const DEFAULT_TOKEN_CACHE: &str = "token.json";

/// Seconds before expiry at which a token is treated as stale.
const REFRESH_MARGIN_SECS: i64 = 300;

/// Token set for OAuth2 authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    /// Access token for API requests
    pub access_token: String,

    /// Optional refresh token for token renewal
    pub refresh_token: Option<String>,

    /// Token expiration timestamp (Unix timestamp)
    pub expires_at: i64,

    /// Scopes granted to this token
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl TokenSet {
    /// Check if the token needs refresh (within 5 minutes of expiry)
    pub fn needs_refresh(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at.saturating_sub(REFRESH_MARGIN_SECS)
    }

    /// Whether every requested scope was granted. Tokens cached without
    /// scope information are trusted.
    pub fn covers(&self, scopes: &[&str]) -> bool {
        self.scopes.is_empty()
            || scopes
                .iter()
                .all(|wanted| self.scopes.iter().any(|granted| granted == wanted))
    }
}

/// Exclusive hold on a credential store, released on drop.
pub struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to release token cache lock: {}", e);
        }
    }
}

/// Where the authenticator keeps its credential between invocations.
pub trait CredentialStore {
    /// Read the stored credential, `None` when nothing is stored yet.
    fn read(&self) -> Result<Option<TokenSet>, AuthError>;

    /// Replace the stored credential.
    fn write(&self, token_set: &TokenSet) -> Result<(), AuthError>;

    /// Take exclusive access for a read-then-write sequence. Stores that
    /// cannot be shared between processes need no lock.
    fn lock(&self) -> Result<Option<StoreLock>, AuthError> {
        Ok(None)
    }
}

impl<T: CredentialStore + ?Sized> CredentialStore for &T {
    fn read(&self) -> Result<Option<TokenSet>, AuthError> {
        (**self).read()
    }

    fn write(&self, token_set: &TokenSet) -> Result<(), AuthError> {
        (**self).write(token_set)
    }

    fn lock(&self) -> Result<Option<StoreLock>, AuthError> {
        (**self).lock()
    }
}

/// JSON token cache on disk.
///
/// Writes go to a temporary file in the same directory which then replaces
/// the cache, so an interrupted write leaves the previous token intact.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }
}

impl CredentialStore for FileCredentialStore {
    fn read(&self) -> Result<Option<TokenSet>, AuthError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AuthError::StorageError(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        match serde_json::from_str::<TokenSet>(&json) {
            Ok(token_set) => {
                tracing::debug!("Retrieved token from {}", self.path.display());
                Ok(Some(token_set))
            }
            Err(e) => {
                // An unreadable cache is treated like a missing one; the next
                // successful sign-in overwrites it.
                tracing::warn!("Ignoring malformed token cache {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    fn write(&self, token_set: &TokenSet) -> Result<(), AuthError> {
        let storage_err =
            |what: &str, e: &dyn std::fmt::Display| AuthError::StorageError(format!("{}: {}", what, e));

        let json = serde_json::to_string_pretty(token_set)
            .map_err(|e| storage_err("Failed to serialize token set", &e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(self.dir())
            .map_err(|e| storage_err("Failed to create temporary token file", &e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| storage_err("Failed to write token file", &e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| storage_err("Failed to flush token file", &e))?;
        tmp.persist(&self.path)
            .map_err(|e| storage_err("Failed to replace token file", &e.error))?;

        tracing::info!("Stored token at {}", self.path.display());
        Ok(())
    }

    fn lock(&self) -> Result<Option<StoreLock>, AuthError> {
        let lock_path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| {
                AuthError::StorageError(format!("Failed to open {}: {}", lock_path.display(), e))
            })?;

        file.lock_exclusive().map_err(|e| {
            AuthError::StorageError(format!("Failed to lock {}: {}", lock_path.display(), e))
        })?;

        tracing::debug!("Locked token cache via {}", lock_path.display());
        Ok(Some(StoreLock { file }))
    }
}

/// In-memory store for tests and one-shot sessions.
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<TokenSet>>,
    writes: Mutex<usize>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token_set: TokenSet) -> Self {
        Self {
            token: Mutex::new(Some(token_set)),
            writes: Mutex::new(0),
        }
    }

    /// Number of times `write` was called.
    pub fn write_count(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn read(&self) -> Result<Option<TokenSet>, AuthError> {
        self.token
            .lock()
            .map(|token| token.clone())
            .map_err(|_| AuthError::StorageError("Token store poisoned".to_string()))
    }

    fn write(&self, token_set: &TokenSet) -> Result<(), AuthError> {
        let mut token = self
            .token
            .lock()
            .map_err(|_| AuthError::StorageError("Token store poisoned".to_string()))?;
        *token = Some(token_set.clone());

        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
        Ok(())
    }
}
