//! Gildra control plane.
//!
//! # Architecture Overview
//!
//! ```text
//!     Gildra / operator
//!            │
//!            ▼
//!     ┌─────────────┐    ┌──────────────┐    ┌──────────────┐
//!     │ http server │───▶│     acme     │───▶│  ACME CA     │
//!     │  + handlers │    │  (issuer)    │    │ (LE / ZeroSSL)│
//!     └──────┬──────┘    └──────┬───────┘    └──────────────┘
//!            │                  │
//!            ▼                  ▼
//!     ┌─────────────┐    ┌──────────────┐
//!     │   routing   │    │   storage    │
//!     │  documents  │    │ certs/chall. │
//!     └─────────────┘    └──────────────┘
//!
//!     Cross-cutting: config (+ hot reload), observability, lifecycle
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use gildra_control_plane::config::load_config;
use gildra_control_plane::http::HttpServer;
use gildra_control_plane::lifecycle::{shutdown, signals, startup, Shutdown};
use gildra_control_plane::observability::init_logging;

#[derive(Parser)]
#[command(name = "gildra-control-plane", version)]
#[command(about = "Certificate and routing control plane for the Gildra edge proxy", long_about = None)]
struct Args {
    /// Path to a TOML config file. Watched for routing changes.
    #[arg(short, long, env = "CONTROL_PLANE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    init_logging(&config.observability);
    tracing::debug!("starting control plane");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        cert_dir = %config.storage.cert_dir,
        challenge_dir = %config.storage.challenge_dir,
        zerossl_eab = config.acme.zerossl_eab.is_some(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    startup::start_metrics(&config.observability);

    let listener = startup::bind(&config.listener).await?;
    let (_watcher, config_updates) = startup::watch_config(args.config.as_deref());

    let lifecycle = config.lifecycle.clone();
    let server = HttpServer::new(config)?;

    let shutdown_coordinator = Shutdown::new();
    let mut server_task = tokio::spawn(server.run(
        listener,
        config_updates,
        shutdown_coordinator.subscribe(),
    ));

    tokio::select! {
        signal = signals::wait_for_signal() => match signal {
            Ok(name) => tracing::warn!(signal = name, "received shutdown signal!"),
            Err(e) => tracing::error!(error = %e, "failed to listen for signals, shutting down"),
        },
        result = &mut server_task => {
            match result {
                Ok(Ok(())) => tracing::error!("HTTP server exited unexpectedly"),
                Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
                Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
            }
            return Err("HTTP server stopped before shutdown was requested".into());
        }
    }

    shutdown::drain_delay(Duration::from_secs(lifecycle.shutdown_sleep_secs)).await;
    shutdown_coordinator.trigger();

    let deadline = Duration::from_secs(lifecycle.shutdown_timeout_secs);
    match shutdown::await_stopped(server_task, deadline).await {
        Ok(Ok(())) => tracing::info!("successfully shutdown HTTP server"),
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server exited with an error"),
        Err(e) => tracing::error!(error = %e, "failed to shutdown HTTP server"),
    }

    Ok(())
}
