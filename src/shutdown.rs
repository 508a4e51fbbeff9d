//! Graceful shutdown handling

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

/// Shutdown coordinator
pub struct ShutdownCoordinator {
    tx: watch::Sender<bool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Get a shutdown notifier
    pub fn subscribe(&self) -> ShutdownNotifier {
        ShutdownNotifier {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger shutdown manually
    pub fn shutdown(&self) {
        info!("Shutdown triggered");
        self.tx.send_replace(true);
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once shutdown has been triggered, including before the call
#[derive(Clone)]
pub struct ShutdownNotifier {
    rx: watch::Receiver<bool>,
}

impl ShutdownNotifier {
    pub async fn wait(mut self) {
        loop {
            let triggered = *self.rx.borrow_and_update();
            if triggered {
                return;
            }
            if self.rx.changed().await.is_err() {
                // Coordinator dropped without triggering.
                std::future::pending::<()>().await;
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Completes on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
