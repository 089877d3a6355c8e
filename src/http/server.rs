//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID, CORS, metrics)
//! - Bind server to listener and serve until shutdown
//! - Apply routing updates from the config watcher

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::acme::{AcmeIssuer, CertificateIssuer, InFlight};
use crate::config::ControlPlaneConfig;
use crate::http::handlers;
use crate::http::middleware::track_requests;
use crate::http::request::UuidRequestId;
use crate::routing::RouteTable;
use crate::storage::{AccountStore, CertStore, ChallengeStore, StorageError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<dyn CertificateIssuer>,
    pub certs: CertStore,
    pub challenges: ChallengeStore,
    pub routes: RouteTable,
    pub in_flight: InFlight,
}

/// HTTP server for the control plane API.
pub struct HttpServer {
    router: Router,
    config: ControlPlaneConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a server that issues certificates over ACME.
    pub fn new(config: ControlPlaneConfig) -> Result<Self, StorageError> {
        let challenges = ChallengeStore::new(&config.storage.challenge_dir)?;
        let accounts = if config.acme.reuse_accounts {
            Some(AccountStore::new(&config.storage.account_dir)?)
        } else {
            None
        };
        let issuer = AcmeIssuer::new(config.acme.clone(), challenges, accounts)
            .cleanup_challenges(config.storage.cleanup_challenges);

        Self::with_issuer(config, Arc::new(issuer))
    }

    /// Create a server around any issuer.
    pub fn with_issuer(
        config: ControlPlaneConfig,
        issuer: Arc<dyn CertificateIssuer>,
    ) -> Result<Self, StorageError> {
        let state = AppState {
            issuer,
            certs: CertStore::new(&config.storage.cert_dir)?,
            challenges: ChallengeStore::new(&config.storage.challenge_dir)?,
            routes: RouteTable::new(config.routing.clone()),
            in_flight: InFlight::new(),
        };

        let router = Self::build_router(&config, state.clone());
        Ok(Self {
            router,
            config,
            state,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ControlPlaneConfig, state: AppState) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/hc", get(handlers::health_check))
            .route("/", get(handlers::hello))
            .route("/create", post(handlers::create_cert))
            .route("/domains/{domain}/cert", get(handlers::get_cert))
            .route("/domains/{domain}/config", get(handlers::get_config))
            .route(
                "/domains/{domain}/challenge/{token}",
                get(handlers::get_challenge_key),
            )
            .route_layer(axum_middleware::from_fn(track_requests))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(cors)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configs received on `config_updates` replace the routing table. The
    /// server drains and returns once `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ControlPlaneConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            cert_dir = %self.state.certs.dir().display(),
            challenge_dir = %self.state.challenges.dir().display(),
            "HTTP server starting"
        );

        let routes = self.state.routes.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                routes.replace(config.routing);
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered router, for driving the API without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ControlPlaneConfig {
        &self.config
    }
}
