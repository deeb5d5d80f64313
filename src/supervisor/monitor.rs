//! Per-agent exit monitor.

use super::Supervisor;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Poll `agent_id`'s process until it exits or the monitor is cancelled.
///
/// Each poll takes the supervisor lock, so a finalization here can never
/// interleave with an explicit `stop` of the same agent. The cancellation
/// check after locking covers a `stop` that won the lock first.
pub(super) fn spawn_monitor(
    supervisor: Weak<Mutex<Supervisor>>,
    agent_id: String,
    poll: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(poll) => {}
            }

            let Some(supervisor) = supervisor.upgrade() else {
                return;
            };
            let mut supervisor = supervisor.lock().await;
            if cancel.is_cancelled() {
                return;
            }
            if supervisor.reap_if_exited(&agent_id) {
                tracing::debug!(agent_id = %agent_id, "exit monitor finished");
                return;
            }
        }
    })
}
