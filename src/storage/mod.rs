//! Filesystem persistence subsystem.
//!
//! # Layout
//! ```text
//! <cert_dir>/<domain>.cert          PEM certificate chain
//! <cert_dir>/<domain>.key           PEM private key (0600)
//! <challenge_dir>/<token>           HTTP-01 key authorization
//! <account_dir>/<provider>.json     ACME account credentials (0600)
//! ```
//!
//! Domains and tokens come straight from API requests, so every name is
//! checked to be a single harmless path component before it is joined onto a
//! directory.

pub mod accounts;
pub mod certs;
pub mod challenges;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use accounts::{AccountStore, StoredAccount};
pub use certs::{CertStore, CertificateBundle};
pub use challenges::ChallengeStore;

/// Longest name accepted as a file stem (the DNS name limit).
const MAX_NAME_LEN: usize = 253;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid {kind} '{name}'")]
    InvalidName { kind: &'static str, name: String },

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Reject anything that is not a single, plain path component.
///
/// Allowed characters are ASCII alphanumerics plus `.`, `-`, `_` and `*`
/// (wildcard domains). Leading dots and `..` sequences are refused.
pub fn check_name<'a>(kind: &'static str, name: &'a str) -> StorageResult<&'a str> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && !name.starts_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '*'));

    if valid {
        Ok(name)
    } else {
        Err(StorageError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

/// Create `dir` (and parents) if missing.
pub(crate) fn ensure_dir(dir: &Path) -> StorageResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))
}

/// Replace `path` with `contents` atomically: the data goes to a temporary
/// file in the same directory which is then renamed over `path`. Readers see
/// either the old file or the new one, never a partial write. Owner-only
/// permissions when `private` is set.
pub(crate) async fn write_file(path: &Path, contents: &[u8], private: bool) -> StorageResult<()> {
    let target = path.to_path_buf();
    let contents = contents.to_vec();
    tokio::task::spawn_blocking(move || write_atomic(&target, &contents, private))
        .await
        .map_err(|e| StorageError::io(path, io::Error::other(e)))?
}

fn write_atomic(path: &Path, contents: &[u8], private: bool) -> StorageResult<()> {
    use std::io::Write;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| StorageError::io(tmp.path(), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = if private { 0o600 } else { 0o644 };
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(mode))
            .map_err(|e| StorageError::io(tmp.path(), e))?;
    }
    #[cfg(not(unix))]
    let _ = private;

    tmp.persist(path)
        .map_err(|e| StorageError::io(path, e.error))?;
    Ok(())
}

/// Read a UTF-8 file, mapping "not found" to `None`.
pub(crate) async fn read_optional(path: &Path) -> StorageResult<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::io(path, e)),
    }
}
