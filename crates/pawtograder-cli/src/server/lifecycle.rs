//! Server lifecycle management: startup logging, shutdown signals and the
//! final outcome.

use std::future::{Future, pending};
use std::io;
use std::time::{Duration, Instant};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use crate::config::ServerConfig;
use crate::server::{ServerError, ServerResult};
use crate::{TRACING_TARGET_SERVER_SHUTDOWN, TRACING_TARGET_SERVER_STARTUP};

/// Runs the server future, logging startup warnings and the final outcome.
pub async fn serve_with_shutdown<F>(
    server_config: &ServerConfig,
    serve_fn: impl FnOnce() -> F,
) -> ServerResult<()>
where
    F: Future<Output = io::Result<()>>,
{
    let start_time = Instant::now();

    if server_config.binds_to_all_interfaces() {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_STARTUP,
            "Server bound to all interfaces, ensure firewall is configured"
        );
    }

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        addr = %server_config.server_addr(),
        tls = server_config.is_tls_enabled(),
        "Server is ready and listening for connections"
    );

    let result = serve_fn().await.map_err(ServerError::Runtime);
    handle_result(result, start_time)
}

/// Process signal that requested shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT, or Ctrl+C on a terminal.
    Interrupt,
    /// SIGTERM, as sent by container orchestrators.
    Terminate,
}

impl ShutdownSignal {
    /// Returns the conventional signal name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
        }
    }
}

/// Waits for SIGINT or SIGTERM and logs the drain deadline.
pub async fn shutdown_requested(drain_timeout: Duration) -> ShutdownSignal {
    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())?.recv().await;
        Ok::<_, io::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = pending::<io::Result<()>>();

    let received = first_signal(tokio::signal::ctrl_c(), terminate).await;

    tracing::info!(
        target: TRACING_TARGET_SERVER_SHUTDOWN,
        signal = received.name(),
        drain_timeout_secs = drain_timeout.as_secs(),
        "Shutdown requested, draining in-flight requests"
    );

    received
}

/// Resolves with whichever signal fires first.
///
/// A handler that fails to install is logged and never fires.
async fn first_signal(
    interrupt: impl Future<Output = io::Result<()>>,
    terminate: impl Future<Output = io::Result<()>>,
) -> ShutdownSignal {
    tokio::select! {
        received = listen(ShutdownSignal::Interrupt, interrupt) => received,
        received = listen(ShutdownSignal::Terminate, terminate) => received,
    }
}

async fn listen(
    kind: ShutdownSignal,
    handler: impl Future<Output = io::Result<()>>,
) -> ShutdownSignal {
    match handler.await {
        Ok(()) => kind,
        Err(err) => {
            tracing::error!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                signal = kind.name(),
                error = %err,
                "Failed to install signal handler"
            );
            pending().await
        }
    }
}

/// Logs the server outcome together with its uptime.
fn handle_result(result: ServerResult<()>, start_time: Instant) -> ServerResult<()> {
    let uptime = start_time.elapsed();

    match result {
        Ok(()) => {
            tracing::info!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                uptime_secs = uptime.as_secs(),
                "Shutdown completed"
            );
            Ok(())
        }
        Err(err) => {
            tracing::error!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                error = %err,
                code = err.error_code(),
                uptime_secs = uptime.as_secs(),
                "Fatal error"
            );

            if let Some(suggestion) = err.suggestion() {
                tracing::info!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    suggestion = suggestion,
                    "Recovery suggestion"
                );
            }

            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serve_with_shutdown_success() {
        let config = ServerConfig::default();
        let result = serve_with_shutdown(&config, || async { Ok(()) }).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn serve_with_shutdown_wraps_runtime_errors() {
        let config = ServerConfig::default();
        let result =
            serve_with_shutdown(&config, || async { Err(io::Error::other("test error")) }).await;

        assert!(matches!(result, Err(ServerError::Runtime(_))));
    }

    #[tokio::test]
    async fn first_signal_reports_which_fired() {
        let received = first_signal(pending(), async { Ok(()) }).await;
        assert_eq!(received, ShutdownSignal::Terminate);

        let received = first_signal(async { Ok(()) }, pending()).await;
        assert_eq!(received, ShutdownSignal::Interrupt);
    }

    #[tokio::test]
    async fn failed_handler_does_not_trigger_shutdown() {
        let failed = async { Err(io::Error::other("no signal support")) };
        let waiting = first_signal(failed, pending());

        let outcome = tokio::time::timeout(Duration::from_millis(20), waiting).await;
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn failed_handler_leaves_the_other_active() {
        let failed = async { Err(io::Error::other("no signal support")) };
        let terminate = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(())
        };

        let received = first_signal(failed, terminate).await;
        assert_eq!(received, ShutdownSignal::Terminate);
    }
}
