//! Response bodies and error mapping.
//!
//! # Design Decisions
//! - Client mistakes map to 400/404/409 with a readable message
//! - Internal failures are logged with their full cause chain and answered
//!   with a short fixed message

use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StorageError;

/// Body of `GET /domains/{domain}/cert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetCertResponse {
    #[serde(rename = "Cert")]
    pub cert: String,
    #[serde(rename = "Key")]
    pub key: String,
}

/// Body of `GET /domains/{domain}/challenge/{token}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeTokenResponse {
    #[serde(rename = "Key")]
    pub key: String,
}

type BoxError = Box<dyn StdError + Send + Sync>;

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{message}")]
    Internal {
        message: &'static str,
        #[source]
        source: BoxError,
    },
}

impl ApiError {
    pub fn internal(message: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Internal {
            message,
            source: source.into(),
        }
    }

    /// Map a storage failure; bad names are the caller's fault.
    pub fn storage(message: &'static str, err: StorageError) -> Self {
        match err {
            StorageError::InvalidName { .. } => Self::BadRequest(err.to_string()),
            other => Self::internal(message, other),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Render `err` and all of its sources as `outer: inner: root`.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal { message, source } => {
                tracing::error!(error = %error_chain(source.as_ref()), "{message}");
            }
            other => {
                tracing::debug!(status = other.status().as_u16(), error = %other, "Rejected request");
            }
        }
        (self.status(), self.to_string()).into_response()
    }
}
