//! Gildra control plane library.
//!
//! Issues certificates over ACME (HTTP-01), stores them with their keys,
//! serves pending challenge key authorizations, and hands each domain a
//! routing document.

pub mod acme;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod storage;

pub use config::schema::ControlPlaneConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
