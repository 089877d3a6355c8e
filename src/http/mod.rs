//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → middleware/ (access log, request metrics)
//!     → handlers.rs (one function per route)
//!         → request.rs (decode + validate input)
//!         → acme / storage / routing
//!         → response.rs (JSON bodies, error mapping)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{CreateCertRequest, RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use response::{ApiError, ChallengeTokenResponse, GetCertResponse};
pub use server::{AppState, HttpServer};
