//! Implementation of the `warden daemon` command.

use crate::config::SupervisorConfig;
use crate::error::{Result, WardenError};
use crate::ipc::run_daemon;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Run the supervisor in the foreground until SIGINT, SIGTERM or a
/// `shutdown` request.
pub async fn cmd_daemon(config: SupervisorConfig) -> Result<()> {
    let shutdown = CancellationToken::new();
    let signals = spawn_signal_listener(shutdown.clone())?;

    println!("warden daemon listening on {}", config.socket_path.display());
    let result = run_daemon(config, shutdown).await;

    signals.abort();
    result
}

/// Cancel `shutdown` on the first SIGINT or SIGTERM.
fn spawn_signal_listener(shutdown: CancellationToken) -> Result<JoinHandle<()>> {
    let install = |kind: SignalKind, name: &str| {
        signal(kind).map_err(|e| {
            WardenError::UserError(format!("failed to install {} handler: {}", name, e))
        })
    };
    let mut sigterm = install(SignalKind::terminate(), "SIGTERM")?;
    let mut sigint = install(SignalKind::interrupt(), "SIGINT")?;

    Ok(tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
            _ = sigint.recv() => tracing::info!("received SIGINT"),
            _ = shutdown.cancelled() => return,
        }
        shutdown.cancel();
    }))
}
