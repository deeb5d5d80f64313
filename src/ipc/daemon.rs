//! Daemon entry point: PID file, supervisor, socket server.

use super::server::IpcServer;
use crate::config::SupervisorConfig;
use crate::error::Result;
use crate::pidfile::acquire_pid_file;
use crate::supervisor::Supervisor;
use tokio_util::sync::CancellationToken;

/// Run the supervisor daemon until `shutdown` fires or a controller sends
/// `shutdown`.
///
/// On return every agent has been stopped and the socket and PID files are
/// gone.
pub async fn run_daemon(config: SupervisorConfig, shutdown: CancellationToken) -> Result<()> {
    config.validate()?;
    let pid_file = acquire_pid_file(&config.pid_path)?;

    let (supervisor, report) = Supervisor::new(config.clone());
    tracing::info!(
        agents = report.loaded,
        reclassified = report.reclassified.len(),
        dropped = report.dropped.len(),
        state_file = %config.state_file.display(),
        "supervisor ready"
    );

    let server = IpcServer::bind(&config.socket_path, supervisor, shutdown)?;
    server.run().await;

    pid_file.release()?;
    tracing::info!("daemon stopped");
    Ok(())
}
