//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs and value ranges
//! - Check that EAB credentials are complete and decodable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ControlPlaneConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use thiserror::Error;
use url::Url;

use crate::config::schema::ControlPlaneConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a fully merged configuration.
pub fn validate_config(config: &ControlPlaneConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let acme = &config.acme;
    let email = acme.contact_email.trim();
    if email.is_empty() || !email.contains('@') || email.contains(char::is_whitespace) {
        errors.push(ValidationError::new(
            "acme.contact_email",
            format!("'{}' is not an email address", acme.contact_email),
        ));
    }
    check_directory_url(&mut errors, "acme.le_staging_directory", &acme.le_staging_directory);
    check_directory_url(&mut errors, "acme.zerossl_directory", &acme.zerossl_directory);

    if acme.auth_timeout_secs == 0 {
        errors.push(ValidationError::new("acme.auth_timeout_secs", "must be greater than 0"));
    }
    if acme.finalize_timeout_secs == 0 {
        errors.push(ValidationError::new("acme.finalize_timeout_secs", "must be greater than 0"));
    }
    if acme.poll_interval_ms == 0 {
        errors.push(ValidationError::new("acme.poll_interval_ms", "must be greater than 0"));
    }
    if acme.poll_max_interval_ms < acme.poll_interval_ms {
        errors.push(ValidationError::new(
            "acme.poll_max_interval_ms",
            "must not be smaller than acme.poll_interval_ms",
        ));
    }

    if let Some(eab) = &acme.zerossl_eab {
        if eab.kid.trim().is_empty() {
            errors.push(ValidationError::new("acme.zerossl_eab.kid", "must not be empty"));
        }
        if eab.hmac_key.trim().is_empty() {
            errors.push(ValidationError::new("acme.zerossl_eab.hmac_key", "must not be empty"));
        } else if decode_hmac_key(&eab.hmac_key).is_none() {
            errors.push(ValidationError::new(
                "acme.zerossl_eab.hmac_key",
                "is not valid base64url",
            ));
        }
    }

    for (field, value) in [
        ("storage.cert_dir", &config.storage.cert_dir),
        ("storage.challenge_dir", &config.storage.challenge_dir),
        ("storage.account_dir", &config.storage.account_dir),
    ] {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        }
    }

    if config.routing.default_destinations.is_empty() {
        errors.push(ValidationError::new(
            "routing.default_destinations",
            "at least one destination is required",
        ));
    }
    for destination in &config.routing.default_destinations {
        check_url(&mut errors, "routing.default_destinations", destination);
    }
    for (domain, route) in &config.routing.domains {
        let field = format!("routing.domains.{domain}.destinations");
        if route.destinations.is_empty() {
            errors.push(ValidationError::new(field.clone(), "at least one destination is required"));
        }
        for destination in &route.destinations {
            check_url(&mut errors, &field, destination);
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.lifecycle.shutdown_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "lifecycle.shutdown_timeout_secs",
            "must be greater than 0",
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Decode an EAB HMAC key. CAs hand these out base64url-encoded, usually
/// without padding.
pub fn decode_hmac_key(encoded: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(encoded.trim().trim_end_matches('='))
        .ok()
        .filter(|key| !key.is_empty())
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {}
        Ok(_) => errors.push(ValidationError::new(
            field,
            format!("'{value}' must be an http(s) URL with a host"),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("'{value}': {e}"))),
    }
}

/// The ACME client only speaks TLS, so a plain-http directory could never
/// be reached.
fn check_directory_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "https" && url.host().is_some() => {}
        Ok(_) => errors.push(ValidationError::new(
            field,
            format!("'{value}' must be an https URL with a host"),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("'{value}': {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{DomainRoute, EabConfig};

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&ControlPlaneConfig::default()).is_ok());
    }

    #[test]
    fn reports_every_problem() {
        let mut config = ControlPlaneConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.acme.contact_email = "nobody".into();
        config.acme.poll_interval_ms = 0;
        config.routing.default_destinations = vec!["ftp://files".into()];

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"listener.bind_address"));
        assert!(fields.contains(&"acme.contact_email"));
        assert!(fields.contains(&"acme.poll_interval_ms"));
        assert!(fields.contains(&"routing.default_destinations"));
    }

    #[test]
    fn acme_directories_must_use_https() {
        let mut config = ControlPlaneConfig::default();
        config.acme.le_staging_directory = "http://localhost:14000/dir".into();
        config.acme.zerossl_directory = "ftp://acme.zerossl.com/v2/DV90".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["acme.le_staging_directory", "acme.zerossl_directory"]
        );
        assert!(errors[0].message.contains("https"));
    }

    #[test]
    fn destinations_may_be_plain_http() {
        let mut config = ControlPlaneConfig::default();
        config.routing.default_destinations = vec!["http://10.0.0.5:8080".into()];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn poll_cap_must_cover_base_interval() {
        let mut config = ControlPlaneConfig::default();
        config.acme.poll_interval_ms = 5000;
        config.acme.poll_max_interval_ms = 1000;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "acme.poll_max_interval_ms");
    }

    #[test]
    fn eab_key_must_decode() {
        let mut config = ControlPlaneConfig::default();
        config.acme.zerossl_eab = Some(EabConfig {
            kid: "kid".into(),
            hmac_key: "not base64!".into(),
        });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "acme.zerossl_eab.hmac_key");
    }

    #[test]
    fn domain_override_needs_destinations() {
        let mut config = ControlPlaneConfig::default();
        config
            .routing
            .domains
            .insert("a.example.com".into(), DomainRoute { destinations: vec![] });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "routing.domains.a.example.com.destinations");
    }

    #[test]
    fn hmac_key_decoding_tolerates_padding() {
        assert_eq!(decode_hmac_key("c2VjcmV0").unwrap(), b"secret");
        assert_eq!(decode_hmac_key("c2VjcmV0==").unwrap(), b"secret");
        assert!(decode_hmac_key("").is_none());
    }
}
