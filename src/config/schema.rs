//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the control
//! plane. All types derive Serde traits for deserialization from config files,
//! and every section has defaults so an empty file is a valid configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Let's Encrypt staging directory.
pub const LE_STAGING_DIRECTORY: &str = "https://acme-staging-v02.api.letsencrypt.org/directory";

/// ZeroSSL production directory.
pub const ZEROSSL_DIRECTORY: &str = "https://acme.zerossl.com/v2/DV90/directory";

/// Root configuration for the control plane.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// ACME providers and issuance tuning.
    pub acme: AcmeConfig,

    /// Where certificates, keys, challenges and accounts live on disk.
    pub storage: StorageConfig,

    /// Routing documents handed to Gildra.
    pub routing: RoutingSettings,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Startup/shutdown behaviour.
    pub lifecycle: LifecycleConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// ACME issuance configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AcmeConfig {
    /// Contact address registered with new accounts.
    pub contact_email: String,

    /// Directory URL used for the `le-staging` provider.
    pub le_staging_directory: String,

    /// Directory URL used for the `zerossl` provider.
    pub zerossl_directory: String,

    /// External account binding for ZeroSSL.
    pub zerossl_eab: Option<EabConfig>,

    /// Upper bound for authorizations to complete, in seconds.
    pub auth_timeout_secs: u64,

    /// Upper bound for the certificate to become available after finalization.
    pub finalize_timeout_secs: u64,

    /// First delay between order polls in milliseconds.
    pub poll_interval_ms: u64,

    /// Cap for the poll delay in milliseconds. Equal to `poll_interval_ms`
    /// for a fixed interval.
    pub poll_max_interval_ms: u64,

    /// Persist and reuse account credentials per provider.
    pub reuse_accounts: bool,
}

impl Default for AcmeConfig {
    fn default() -> Self {
        Self {
            contact_email: "admin@example.com".to_string(),
            le_staging_directory: LE_STAGING_DIRECTORY.to_string(),
            zerossl_directory: ZEROSSL_DIRECTORY.to_string(),
            zerossl_eab: None,
            auth_timeout_secs: 60,
            finalize_timeout_secs: 60,
            poll_interval_ms: 2000,
            poll_max_interval_ms: 2000,
            reuse_accounts: true,
        }
    }
}

/// External account binding credentials.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct EabConfig {
    /// Key identifier issued by the CA.
    pub kid: String,

    /// Base64url-encoded HMAC key issued by the CA.
    pub hmac_key: String,
}

/// Filesystem layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `<domain>.cert` and `<domain>.key`.
    pub cert_dir: String,

    /// Directory holding one file per pending challenge token.
    pub challenge_dir: String,

    /// Directory holding persisted ACME account credentials.
    pub account_dir: String,

    /// Delete challenge files once an issuance finishes.
    pub cleanup_challenges: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cert_dir: ".".to_string(),
            challenge_dir: "challenges".to_string(),
            account_dir: "accounts".to_string(),
            cleanup_challenges: true,
        }
    }
}

/// Routing documents served at `/domains/{domain}/config`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RoutingSettings {
    /// Upstreams used for any domain without an override.
    pub default_destinations: Vec<String>,

    /// Per-domain upstream overrides.
    pub domains: HashMap<String, DomainRoute>,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            default_destinations: vec!["http://localhost:8080".to_string()],
            domains: HashMap::new(),
        }
    }
}

/// Upstreams for a single domain.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DomainRoute {
    pub destinations: Vec<String>,
}

/// Timeout configuration for API requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout in seconds. Must cover a full issuance.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 180 }
    }
}

/// Shutdown behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Delay between the shutdown signal and closing the listener, giving a
    /// load balancer time to deregister the instance.
    pub shutdown_sleep_secs: u64,

    /// How long in-flight requests may take to drain.
    pub shutdown_timeout_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_sleep_secs: 0,
            shutdown_timeout_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "debug".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 64 * 1024,
        }
    }
}
