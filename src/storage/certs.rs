//! Certificate and key files, one pair per domain.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{check_name, ensure_dir, read_optional, write_file, StorageResult};

/// A PEM certificate chain with its private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateBundle {
    /// PEM-encoded certificate chain.
    pub cert_pem: String,
    /// PEM-encoded private key.
    pub key_pem: String,
}

/// Stores `<domain>.cert` / `<domain>.key` pairs in a single directory.
#[derive(Debug, Clone)]
pub struct CertStore {
    dir: PathBuf,
}

impl CertStore {
    /// Open the store, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        ensure_dir(&dir)?;
        debug!(dir = %dir.display(), "Certificate store ready");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn paths(&self, domain: &str) -> StorageResult<(PathBuf, PathBuf)> {
        let domain = check_name("domain", domain)?;
        Ok((
            self.dir.join(format!("{domain}.cert")),
            self.dir.join(format!("{domain}.key")),
        ))
    }

    /// Persist a freshly issued bundle, replacing any previous one.
    ///
    /// Each file is swapped in by rename. The key goes first: if that fails
    /// the old pair is untouched, and a cert is never published without its
    /// key already on disk.
    pub async fn save(&self, domain: &str, bundle: &CertificateBundle) -> StorageResult<()> {
        let (cert_path, key_path) = self.paths(domain)?;
        write_file(&key_path, bundle.key_pem.as_bytes(), true).await?;
        write_file(&cert_path, bundle.cert_pem.as_bytes(), false).await?;
        info!(domain = %domain, cert = %cert_path.display(), "Stored certificate");
        Ok(())
    }

    /// Load the bundle for `domain`. Returns `None` unless both files exist.
    pub async fn load(&self, domain: &str) -> StorageResult<Option<CertificateBundle>> {
        let (cert_path, key_path) = self.paths(domain)?;
        let Some(cert_pem) = read_optional(&cert_path).await? else {
            return Ok(None);
        };
        let Some(key_pem) = read_optional(&key_path).await? else {
            return Ok(None);
        };
        Ok(Some(CertificateBundle { cert_pem, key_pem }))
    }
}
