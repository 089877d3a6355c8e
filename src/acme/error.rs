//! Issuance errors, one variant per step of the ACME flow.

use thiserror::Error;

use crate::acme::Provider;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AcmeError {
    #[error("ZeroSSL requires external account binding; set ZEROSSL_KID and ZEROSSL_HMAC")]
    MissingEab,

    #[error("external account HMAC key is not valid base64url")]
    InvalidEabKey,

    #[error("failed to register account with {provider}: {source}")]
    Account {
        provider: Provider,
        #[source]
        source: instant_acme::Error,
    },

    #[error("failed to create order for '{domain}': {source}")]
    NewOrder {
        domain: String,
        #[source]
        source: instant_acme::Error,
    },

    #[error("failed to fetch authorizations for '{domain}': {source}")]
    Authorizations {
        domain: String,
        #[source]
        source: instant_acme::Error,
    },

    #[error("authorization for '{domain}' is {status}")]
    AuthorizationState { domain: String, status: String },

    #[error("no http-01 challenge offered for '{domain}' (offered: {offered})")]
    NoHttp01Challenge { domain: String, offered: String },

    #[error("failed to mark challenge ready for '{domain}': {source}")]
    ChallengeReady {
        domain: String,
        #[source]
        source: instant_acme::Error,
    },

    #[error("failed to refresh order for '{domain}': {source}")]
    Refresh {
        domain: String,
        #[source]
        source: instant_acme::Error,
    },

    #[error("order for '{domain}' became invalid: {detail}")]
    OrderInvalid { domain: String, detail: String },

    #[error("authorization for '{domain}' did not complete within {timeout_secs}s")]
    AuthorizationTimeout { domain: String, timeout_secs: u64 },

    #[error("failed to build CSR for '{domain}': {source}")]
    Csr {
        domain: String,
        #[source]
        source: rcgen::Error,
    },

    #[error("failed to finalize order for '{domain}': {source}")]
    Finalize {
        domain: String,
        #[source]
        source: instant_acme::Error,
    },

    #[error("failed to download certificate for '{domain}': {source}")]
    Certificate {
        domain: String,
        #[source]
        source: instant_acme::Error,
    },

    #[error("certificate for '{domain}' was not issued within {timeout_secs}s")]
    CertificateTimeout { domain: String, timeout_secs: u64 },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for issuance.
pub type AcmeResult<T> = Result<T, AcmeError>;
