//! Graceful shutdown signal handling.

use std::time::Duration;

use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix;

use crate::TRACING_TARGET_SHUTDOWN;

/// Waits for a shutdown signal (SIGINT/Ctrl+C or SIGTERM).
///
/// Resolves once a signal is received; the caller then has
/// `shutdown_timeout` to drain in-flight work. A branch whose handler
/// cannot be installed pends forever so the other branch stays armed.
pub(crate) async fn shutdown_signal(shutdown_timeout: Duration) {
    let interrupt = async {
        if let Err(error) = ctrl_c().await {
            tracing::error!(
                target: TRACING_TARGET_SHUTDOWN,
                error = %error,
                "failed to install Ctrl+C handler"
            );
            std::future::pending::<()>().await;
        }

        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            "received Ctrl+C, initiating graceful shutdown"
        );
    };

    #[cfg(unix)]
    let terminate = async {
        match unix::signal(unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                tracing::info!(
                    target: TRACING_TARGET_SHUTDOWN,
                    "received SIGTERM, initiating graceful shutdown"
                );
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_SHUTDOWN,
                    error = %error,
                    "failed to install SIGTERM handler"
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {},
    }

    tracing::info!(
        target: TRACING_TARGET_SHUTDOWN,
        timeout_secs = shutdown_timeout.as_secs(),
        "draining in-flight requests"
    );
}
