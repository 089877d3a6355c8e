//! Shutdown coordination for the control plane.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("task did not stop within {0:?}")]
    Timeout(Duration),

    #[error("task failed: {0}")]
    Join(#[from] JoinError),
}

/// Keep serving for `delay` after a signal so load balancers can take the
/// instance out of rotation first.
pub async fn drain_delay(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    tracing::info!(delay_secs = delay.as_secs(), "sleeping before shutdown");
    tokio::time::sleep(delay).await;
}

/// Wait for `task` to finish, aborting it once `deadline` passes.
pub async fn await_stopped<T>(task: JoinHandle<T>, deadline: Duration) -> Result<T, ShutdownError> {
    let abort = task.abort_handle();
    match tokio::time::timeout(deadline, task).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            abort.abort();
            Err(ShutdownError::Timeout(deadline))
        }
    }
}
