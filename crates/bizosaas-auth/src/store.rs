//! Session storage backends

use async_trait::async_trait;
use bizosaas_core::session::AuthSession;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{AuthError, Result};

/// Where an `AuthClient` keeps its session
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<AuthSession>>;

    async fn save(&self, session: &AuthSession) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Session held in memory only; lost when the store is dropped
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    session: RwLock<Option<AuthSession>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<AuthSession>> {
        Ok(self.session.read().await.clone())
    }

    async fn save(&self, session: &AuthSession) -> Result<()> {
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.session.write().await = None;
        Ok(())
    }
}

/// Session persisted as JSON on disk, owner-only (`0600`) on unix
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
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<AuthSession>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AuthError::Storage(e.to_string())),
        };

        match serde_json::from_slice(&bytes) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                // A corrupt file is treated as signed out
                warn!("Discarding unreadable session file {:?}: {}", self.path, e);
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &AuthSession) -> Result<()> {
        let bytes =
            serde_json::to_vec_pretty(session).map_err(|e| AuthError::Storage(e.to_string()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AuthError::Storage(e.to_string()))?;
        }

        let tmp = self.path.with_extension("tmp");
        write_private(&tmp, &bytes)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        debug!("Saved session to {:?}", self.path);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Storage(e.to_string())),
        }
    }
}

/// Write `bytes` to `path` so that only the owner can read it
async fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options.open(path).await?;

    // A stale temp file keeps its old mode, so tighten it before writing
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await?;
    }

    file.write_all(bytes).await?;
    file.sync_all().await
}
