//! OS signal handling.
//!
//! SIGINT and SIGTERM both start a graceful shutdown. Config reloads come
//! from the file watcher, so SIGHUP is left alone.

/// Wait for SIGINT or SIGTERM and return the signal's name.
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    let interrupt = async {
        tokio::signal::ctrl_c().await?;
        Ok::<_, std::io::Error>("SIGINT")
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate())?.recv().await;
        Ok::<_, std::io::Error>("SIGTERM")
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<std::io::Result<&'static str>>();

    tokio::select! {
        result = interrupt => result,
        result = terminate => result,
    }
}
