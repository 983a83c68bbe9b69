//! Interrupt handling and ordered cleanup

use futures::future::BoxFuture;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use crate::error::{ConsumerError, Result};

/// One named cleanup action
pub struct ShutdownStep {
    pub name: &'static str,
    pub future: BoxFuture<'static, Result<()>>,
}

impl ShutdownStep {
    pub fn new(name: &'static str, future: BoxFuture<'static, Result<()>>) -> Self {
        Self { name, future }
    }
}

/// Run `steps` in order, each bounded by `step_timeout`.
///
/// A failed or timed-out step is logged and the remaining steps still run.
/// Returns [`ConsumerError::Shutdown`] naming every step that did not finish
/// cleanly.
pub async fn run_shutdown(steps: Vec<ShutdownStep>, step_timeout: Duration) -> Result<()> {
    let mut failed = Vec::new();

    for ShutdownStep { name, future } in steps {
        match tokio::time::timeout(step_timeout, future).await {
            Ok(Ok(())) => info!(step = name, "Closed"),
            Ok(Err(e)) => {
                error!(step = name, error = %e, "Error during shutdown");
                failed.push(name);
            },
            Err(_) => {
                let e = ConsumerError::StepTimedOut {
                    step: name,
                    secs: step_timeout.as_secs(),
                };
                error!(step = name, error = %e, "Error during shutdown");
                failed.push(name);
            },
        }
    }

    if failed.is_empty() {
        info!("Graceful shutdown complete");
        Ok(())
    } else {
        Err(ConsumerError::Shutdown { failed })
    }
}

/// Resolves on the first SIGINT or SIGTERM.
///
/// A handler that cannot be installed is logged and never fires.
pub async fn interrupt_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, shutting down gracefully..."),
        _ = terminate => warn!("Received SIGTERM, shutting down gracefully..."),
    }
}
