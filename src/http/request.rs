//! Request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every request
//! - Decode and validate API request bodies and path parameters

use axum::http::{HeaderMap, HeaderValue, Request};
use serde::{Deserialize, Serialize};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::acme::Provider;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates `x-request-id` values for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Read the request ID from a header map.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl RequestIdExt for HeaderMap {
    fn request_id(&self) -> &str {
        self.get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

/// Body of `POST /create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCertRequest {
    #[serde(rename = "Domain", alias = "domain")]
    pub domain: String,

    #[serde(rename = "Provider", alias = "provider", default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl CreateCertRequest {
    /// Normalize the domain and resolve the provider.
    pub fn validate(&self) -> Result<(String, Provider), String> {
        let domain = validate_domain(&self.domain)?;
        if domain.starts_with("*.") {
            return Err(format!("'{domain}': wildcard names cannot be validated over HTTP-01"));
        }
        let provider = Provider::from_request(self.provider.as_deref()).map_err(|e| e.to_string())?;
        Ok((domain, provider))
    }
}

/// Check that `raw` is a fully qualified DNS name and return it lowercased,
/// without a trailing dot.
pub fn validate_domain(raw: &str) -> Result<String, String> {
    let domain = raw.trim().trim_end_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return Err("missing domain".to_string());
    }
    if domain.len() > 253 {
        return Err(format!("'{domain}' is longer than 253 characters"));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(format!("'{domain}' is not a fully qualified domain name"));
    }
    for (i, label) in labels.iter().enumerate() {
        if i == 0 && *label == "*" {
            continue;
        }
        let valid = !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(format!("'{domain}' has an invalid label '{label}'"));
        }
    }

    Ok(domain)
}
