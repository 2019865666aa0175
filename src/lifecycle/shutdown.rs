//! Shutdown coordination.

use tokio::sync::broadcast;

use crate::lifecycle::host::ModuleHost;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that the server and any background task
/// can subscribe to.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve on Ctrl+C or when `shutdown` fires, whichever comes first.
pub async fn wait_for_shutdown(mut shutdown: broadcast::Receiver<()>) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                // Without a signal handler only the broadcast can stop us.
                let _ = shutdown.recv().await;
            }
        }
        _ = shutdown.recv() => {}
    }
    tracing::info!("Shutdown signal received");
}

/// Stop every loaded module once the server has stopped accepting traffic.
pub fn stop_modules(host: &ModuleHost) {
    let total = host.loaded().len();
    let stopped = host.shutdown();
    if stopped == total {
        tracing::info!(modules = stopped, "All modules stopped");
    } else {
        tracing::warn!(stopped, total, "Some modules failed to stop");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::pipeline::{Options, Pipeline};

    #[tokio::test]
    async fn trigger_resolves_waiters() {
        let shutdown = Shutdown::new();
        let waiter = tokio::spawn(wait_for_shutdown(shutdown.subscribe()));
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter did not finish")
            .unwrap();
    }

    #[test]
    fn stop_modules_empties_host() {
        let host = ModuleHost::new(Arc::new(Pipeline::new()));
        host.load_kind("echo", "echo", &Options::new()).unwrap();
        stop_modules(&host);
        assert!(host.loaded().is_empty());
    }
}
