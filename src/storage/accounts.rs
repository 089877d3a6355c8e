//! Persisted ACME account credentials, one JSON document per provider.
//!
//! The credentials type is owned by the ACME client and treated as opaque
//! here; anything serde can round-trip is accepted. [`StoredAccount`] wraps it
//! with the directory and EAB key id it was registered under, so a config
//! change pointing at another CA never reuses the old registration.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{check_name, ensure_dir, read_optional, write_file, StorageResult};

/// Credentials plus the identity of the CA account they belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAccount<C> {
    pub directory: String,
    #[serde(default)]
    pub eab_kid: Option<String>,
    pub credentials: C,
}

impl<C> StoredAccount<C> {
    /// True when these credentials were registered against `directory` with
    /// the same external account key id.
    pub fn matches(&self, directory: &str, eab_kid: Option<&str>) -> bool {
        self.directory == directory && self.eab_kid.as_deref() == eab_kid
    }
}

#[derive(Debug, Clone)]
pub struct AccountStore {
    dir: PathBuf,
}

impl AccountStore {
    /// Open the store, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        ensure_dir(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, provider: &str) -> StorageResult<PathBuf> {
        Ok(self.dir.join(format!("{}.json", check_name("provider", provider)?)))
    }

    pub async fn load<T: DeserializeOwned>(&self, provider: &str) -> StorageResult<Option<T>> {
        let Some(content) = read_optional(&self.path(provider)?).await? else {
            debug!(provider = %provider, "No stored ACME account");
            return Ok(None);
        };
        let credentials = serde_json::from_str(&content)?;
        debug!(provider = %provider, "Loaded ACME account credentials");
        Ok(Some(credentials))
    }

    pub async fn save<T: Serialize>(&self, provider: &str, credentials: &T) -> StorageResult<()> {
        let path = self.path(provider)?;
        let content = serde_json::to_vec_pretty(credentials)?;
        write_file(&path, &content, true).await?;
        info!(provider = %provider, "Saved ACME account credentials");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Creds {
        id: String,
        key: String,
    }

    #[tokio::test]
    async fn round_trip_per_provider() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::new(dir.path()).unwrap();
        let creds = Creds {
            id: "https://ca.example/acct/1".into(),
            key: "pkcs8".into(),
        };

        store.save("zerossl", &creds).await.unwrap();

        assert_eq!(store.load::<Creds>("zerossl").await.unwrap(), Some(creds));
        assert_eq!(store.load::<Creds>("le-staging").await.unwrap(), None);
    }

    #[tokio::test]
    async fn stored_account_keeps_its_origin() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::new(dir.path()).unwrap();
        let stored = StoredAccount {
            directory: "https://acme.zerossl.com/v2/DV90".to_string(),
            eab_kid: Some("kid-1".to_string()),
            credentials: Creds {
                id: "https://ca.example/acct/1".into(),
                key: "pkcs8".into(),
            },
        };

        store.save("zerossl", &stored).await.unwrap();
        let loaded: StoredAccount<Creds> = store.load("zerossl").await.unwrap().unwrap();

        assert_eq!(loaded, stored);
        assert!(loaded.matches("https://acme.zerossl.com/v2/DV90", Some("kid-1")));
    }

    #[test]
    fn account_from_another_ca_or_key_does_not_match() {
        let stored = StoredAccount {
            directory: "https://acme-staging-v02.api.letsencrypt.org/directory".to_string(),
            eab_kid: None,
            credentials: (),
        };

        assert!(stored.matches("https://acme-staging-v02.api.letsencrypt.org/directory", None));
        assert!(!stored.matches("https://acme-v02.api.letsencrypt.org/directory", None));
        assert!(!stored.matches(
            "https://acme-staging-v02.api.letsencrypt.org/directory",
            Some("kid-2")
        ));
    }

    #[tokio::test]
    async fn bare_credentials_do_not_load_as_stored_account() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::new(dir.path()).unwrap();
        store
            .save(
                "le-staging",
                &Creds {
                    id: "https://ca.example/acct/1".into(),
                    key: "pkcs8".into(),
                },
            )
            .await
            .unwrap();

        let err = store
            .load::<StoredAccount<Creds>>("le-staging")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Json(_)));
    }

    #[tokio::test]
    async fn corrupt_file_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("zerossl.json"), "{not json").unwrap();

        let err = store.load::<Creds>("zerossl").await.unwrap_err();
        assert!(matches!(err, StorageError::Json(_)));
    }
}
