//! API handlers.
//!
//! # Routes
//! - `GET  /hc`                                  liveness check
//! - `GET  /`                                    echo request headers
//! - `POST /create`                              issue a certificate
//! - `GET  /domains/{domain}/cert`               certificate and key
//! - `GET  /domains/{domain}/config`             routing document
//! - `GET  /domains/{domain}/challenge/{token}`  HTTP-01 key authorization

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    Json,
};

use crate::acme::AcmeError;
use crate::http::request::{validate_domain, CreateCertRequest, RequestIdExt};
use crate::http::response::{ApiError, ChallengeTokenResponse, GetCertResponse};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::routing::RoutingConfig;

pub async fn health_check() -> &'static str {
    "ok"
}

/// Echo the request headers, one `name: value` per line.
pub async fn hello(headers: HeaderMap) -> String {
    let mut out = String::new();
    for (name, value) in &headers {
        let _ = writeln!(out, "{}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
    out
}

/// Issue a certificate and persist it.
///
/// The order runs on its own task so a client that hangs up does not
/// abandon it half way; the in-flight slot is held until that task ends.
pub async fn create_cert(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateCertRequest>, JsonRejection>,
) -> Result<&'static str, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let (domain, provider) = request.validate().map_err(ApiError::BadRequest)?;

    let guard = state.in_flight.try_acquire(&domain).ok_or_else(|| {
        ApiError::Conflict(format!("certificate for {domain} is already being created"))
    })?;

    tracing::info!(
        request_id = %headers.request_id(),
        domain = %domain,
        provider = %provider,
        "creating cert"
    );

    let issuer = Arc::clone(&state.issuer);
    let certs = state.certs.clone();
    let task = tokio::spawn(async move {
        let _guard = guard;
        let start = Instant::now();
        let result = async {
            let bundle = issuer.issue(&domain, provider).await?;
            certs.save(&domain, &bundle).await?;
            Ok::<_, AcmeError>(())
        }
        .await;
        metrics::record_issuance(provider.as_str(), result.is_ok(), start);
        result
    });

    match task.await {
        Ok(Ok(())) => Ok("created cert for domain!"),
        Ok(Err(e)) => Err(ApiError::internal("error creating cert", e)),
        Err(e) => Err(ApiError::internal("error creating cert", e)),
    }
}

pub async fn get_cert(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Result<Json<GetCertResponse>, ApiError> {
    let domain = validate_domain(&domain).map_err(ApiError::BadRequest)?;

    match state.certs.load(&domain).await {
        Ok(Some(bundle)) => Ok(Json(GetCertResponse {
            cert: bundle.cert_pem,
            key: bundle.key_pem,
        })),
        Ok(None) => Err(ApiError::NotFound(format!("no certificate for {domain}"))),
        Err(e) => Err(ApiError::storage("error reading cert", e)),
    }
}

pub async fn get_config(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Result<Json<RoutingConfig>, ApiError> {
    let domain = validate_domain(&domain).map_err(ApiError::BadRequest)?;
    Ok(Json(state.routes.config_for(&domain)))
}

pub async fn get_challenge_key(
    State(state): State<AppState>,
    Path((domain, token)): Path<(String, String)>,
) -> Result<Json<ChallengeTokenResponse>, ApiError> {
    let domain = validate_domain(&domain).map_err(ApiError::BadRequest)?;

    match state.challenges.get(&token).await {
        Ok(Some(key)) => {
            tracing::debug!(domain = %domain, token = %token, "serving challenge key");
            Ok(Json(ChallengeTokenResponse { key }))
        }
        Ok(None) => Err(ApiError::NotFound(format!("no challenge for token {token}"))),
        Err(e) => Err(ApiError::storage("error reading challenge", e)),
    }
}
