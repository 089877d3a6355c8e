//! Startup helpers.
//!
//! # Responsibilities
//! - Install the metrics exporter when enabled
//! - Bind the API listener
//! - Start the config file watcher

use std::net::SocketAddr;
use std::path::Path;

use notify::RecommendedWatcher;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::schema::{ListenerConfig, ObservabilityConfig};
use crate::config::watcher::ConfigWatcher;
use crate::config::ControlPlaneConfig;
use crate::observability::metrics;

/// Install the Prometheus exporter if configured. Failure is logged, not
/// fatal: the API works without metrics.
pub fn start_metrics(config: &ObservabilityConfig) {
    if !config.metrics_enabled {
        return;
    }
    match config.metrics_address.parse::<SocketAddr>() {
        Ok(addr) => {
            if let Err(e) = metrics::init_metrics(addr) {
                tracing::error!(error = %e, "Failed to install metrics exporter");
            }
        }
        Err(_) => tracing::error!(
            metrics_address = %config.metrics_address,
            "Failed to parse metrics address"
        ),
    }
}

/// Bind the API listener.
pub async fn bind(config: &ListenerConfig) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(&config.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");
    Ok(listener)
}

/// Watch `path` for changes. Without a path the receiver never yields.
///
/// The returned watcher must be kept alive for updates to flow.
pub fn watch_config(
    path: Option<&Path>,
) -> (Option<RecommendedWatcher>, mpsc::UnboundedReceiver<ControlPlaneConfig>) {
    let Some(path) = path else {
        let (_tx, rx) = mpsc::unbounded_channel();
        return (None, rx);
    };

    let (watcher, rx) = ConfigWatcher::new(path);
    match watcher.run() {
        Ok(handle) => (Some(handle), rx),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Config hot reload disabled");
            (None, rx)
        }
    }
}
