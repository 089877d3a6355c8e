//! Certificate authorities the control plane can issue from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AcmeConfig;

/// A supported ACME certificate authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Provider {
    /// Let's Encrypt staging environment. Used when no provider is given.
    #[default]
    #[serde(rename = "le-staging")]
    LetsEncryptStaging,

    /// ZeroSSL, which requires external account binding.
    #[serde(rename = "zerossl")]
    ZeroSsl,
}

/// Returned when a request names a provider we do not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown provider '{0}', expected 'le-staging' or 'zerossl'")]
pub struct UnknownProvider(pub String);

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::LetsEncryptStaging, Provider::ZeroSsl];

    /// Stable identifier used in requests, file names and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::LetsEncryptStaging => "le-staging",
            Provider::ZeroSsl => "zerossl",
        }
    }

    /// Directory URL for this provider under the given configuration.
    pub fn directory_url<'a>(&self, config: &'a AcmeConfig) -> &'a str {
        match self {
            Provider::LetsEncryptStaging => &config.le_staging_directory,
            Provider::ZeroSsl => &config.zerossl_directory,
        }
    }

    /// Whether account registration needs external account binding.
    pub fn requires_eab(&self) -> bool {
        matches!(self, Provider::ZeroSsl)
    }

    /// Parse an optional request value; absent or empty selects the default.
    pub fn from_request(value: Option<&str>) -> Result<Self, UnknownProvider> {
        match value.map(str::trim) {
            None | Some("") => Ok(Provider::default()),
            Some(other) => other.parse(),
        }
    }
}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
