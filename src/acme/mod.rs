//! Certificate issuance subsystem.
//!
//! # Data Flow
//! ```text
//! POST /create
//!     → InFlight (one issuance per domain at a time)
//!     → CertificateIssuer::issue(domain, provider)
//!         → AcmeIssuer (instant-acme, HTTP-01)
//!         → ChallengeStore (key authorizations served to Gildra)
//!     → CertStore (certificate + key persisted)
//! ```
//!
//! # Design Decisions
//! - The ACME protocol lives in `instant-acme`; nothing here speaks JWS
//! - Issuers sit behind a trait so the API can be exercised without a CA
//! - Challenge files are keyed by token, certificates by domain

pub mod error;
pub mod inflight;
pub mod issuer;
pub mod provider;

#[cfg(test)]
mod mock_ca;

pub use error::{AcmeError, AcmeResult};
pub use inflight::{InFlight, InFlightGuard};
pub use issuer::{AcmeIssuer, CertificateIssuer, HttpClientFactory};
pub use provider::{Provider, UnknownProvider};
