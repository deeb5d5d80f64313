//! Worker-side blocking wait for a human decision.

use super::store::CheckpointStore;
use super::types::{CheckpointStatus, WaitOutcome};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

impl CheckpointStore {
    /// Poll the log until `checkpoint_id` leaves `pending`.
    ///
    /// Cancellation is checked before and after every sleep and also wakes
    /// the sleep itself, so a stop request is never delayed by a full
    /// interval. A checkpoint that disappears from the log lets the worker
    /// proceed.
    pub async fn wait_for_decision(
        &self,
        checkpoint_id: &str,
        interval: Duration,
        cancel: &CancellationToken,
    ) -> WaitOutcome {
        loop {
            if cancel.is_cancelled() {
                return WaitOutcome::Cancelled;
            }

            match self.find(checkpoint_id) {
                None => {
                    tracing::warn!(checkpoint_id, "checkpoint vanished while waiting; proceeding");
                    return WaitOutcome::Proceed(None);
                }
                Some(record) => match record.status {
                    CheckpointStatus::Pending if !record.completed => {}
                    CheckpointStatus::Rejected => return WaitOutcome::Rejected(record),
                    _ => return WaitOutcome::Proceed(Some(record)),
                },
            }

            tokio::select! {
                _ = cancel.cancelled() => return WaitOutcome::Cancelled,
                _ = tokio::time::sleep(interval) => {}
            }

            if cancel.is_cancelled() {
                return WaitOutcome::Cancelled;
            }
        }
    }
}
