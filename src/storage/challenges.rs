//! HTTP-01 challenge files.
//!
//! The ACME server validates a domain by fetching
//! `/.well-known/acme-challenge/<token>` from it. Gildra answers that request
//! by asking the control plane for the key authorization stored here.

use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use super::{check_name, ensure_dir, read_optional, write_file, StorageError, StorageResult};

/// One file per pending token, named after the token.
#[derive(Debug, Clone)]
pub struct ChallengeStore {
    dir: PathBuf,
}

impl ChallengeStore {
    /// Open the store, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        ensure_dir(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, token: &str) -> StorageResult<PathBuf> {
        Ok(self.dir.join(check_name("token", token)?))
    }

    /// Register a key authorization for `token`.
    pub async fn put(&self, token: &str, key_authorization: &str) -> StorageResult<()> {
        let path = self.path(token)?;
        write_file(&path, key_authorization.as_bytes(), false).await?;
        debug!(token = %token, "Registered HTTP-01 challenge");
        Ok(())
    }

    /// Look up the key authorization for `token`.
    pub async fn get(&self, token: &str) -> StorageResult<Option<String>> {
        let result = read_optional(&self.path(token)?).await?;
        trace!(token = %token, found = result.is_some(), "Challenge lookup");
        Ok(result)
    }

    /// Drop a completed challenge. Missing files are not an error.
    pub async fn remove(&self, token: &str) -> StorageResult<()> {
        let path = self.path(token)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(token = %token, "Removed HTTP-01 challenge");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    /// Remove several tokens, logging rather than failing on errors.
    pub async fn remove_all<I, S>(&self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for token in tokens {
            if let Err(e) = self.remove(token.as_ref()).await {
                warn!(token = %token.as_ref(), error = %e, "Failed to remove challenge file");
            }
        }
    }
}
