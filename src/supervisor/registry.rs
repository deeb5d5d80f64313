//! The supervisor: agent registry and lifecycle operations.

use super::monitor::spawn_monitor;
use super::process::{self, EndReason};
use super::record::{AgentRecord, AgentStatus};
use super::state::{RecoveryReport, recover_state, save_state};
use crate::config::{AgentConfig, SupervisorConfig};
use crate::error::{Result, WardenError};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Live OS process attached to a running agent.
#[derive(Debug)]
struct RunningProcess {
    child: Child,
    pid: u32,
    monitor: CancellationToken,
}

/// An agent whose worker is being terminated outside the lock. `done` fires
/// once the outcome is recorded.
#[derive(Debug)]
struct Stopping {
    pid: u32,
    done: CancellationToken,
}

/// What a stop has left to do once the lock is released.
enum StopStep {
    /// Nothing was running; the record is final.
    Done(AgentRecord),
    /// Another caller is already terminating this worker.
    InProgress(CancellationToken),
    /// The worker was detached and must be terminated.
    Terminate {
        child: Child,
        pid: u32,
        grace: Duration,
    },
}

/// Handle to the supervisor shared by the IPC handlers and exit monitors.
///
/// Terminating a worker can take the whole grace period, so `stop`, `remove`
/// and `shutdown` live on the handle: they hold the lock only to detach the
/// process and to record its outcome, never while waiting for it to die.
#[derive(Debug, Clone)]
pub struct SharedSupervisor(Arc<Mutex<Supervisor>>);

impl SharedSupervisor {
    pub async fn lock(&self) -> MutexGuard<'_, Supervisor> {
        self.0.lock().await
    }

    /// Stop an agent's worker, escalating to SIGKILL after the grace period.
    ///
    /// Stopping an agent with no process only confirms `stopped`. A stop
    /// already in flight is awaited, not repeated. Termination runs on its
    /// own task so it completes even if the caller goes away.
    pub async fn stop(&self, agent_id: &str) -> Result<AgentRecord> {
        let step = self.lock().await.begin_stop(agent_id)?;
        match step {
            StopStep::Done(record) => return Ok(record),
            StopStep::InProgress(done) => done.cancelled().await,
            StopStep::Terminate {
                mut child,
                pid,
                grace,
            } => {
                let supervisor = self.clone();
                let id = agent_id.to_string();
                tokio::spawn(async move {
                    let exit_code = process::terminate(&mut child, pid, grace).await;
                    supervisor.lock().await.finish_stop(&id, exit_code);
                })
                .await
                .map_err(|e| {
                    WardenError::UserError(format!("stopping agent {} failed: {}", agent_id, e))
                })?;
            }
        }
        self.lock().await.status(agent_id)
    }

    /// Stop if running, then forget the agent.
    pub async fn remove(&self, agent_id: &str) -> Result<AgentRecord> {
        let live = {
            let supervisor = self.lock().await;
            supervisor.status(agent_id)?;
            supervisor.has_process(agent_id)
        };
        if live {
            self.stop(agent_id).await?;
        }
        self.lock().await.forget(agent_id)
    }

    /// Stop every running agent and refuse further lifecycle commands.
    ///
    /// Agents are stopped concurrently. A second call is a no-op.
    pub async fn shutdown(&self) {
        let Some(live) = self.lock().await.begin_shutdown() else {
            return;
        };
        tracing::info!(count = live.len(), "stopping agents for shutdown");

        let mut stops = JoinSet::new();
        for agent_id in live {
            let supervisor = self.clone();
            stops.spawn(async move {
                let result = supervisor.stop(&agent_id).await;
                (agent_id, result)
            });
        }
        while let Some(joined) = stops.join_next().await {
            match joined {
                Ok((_, Ok(_))) => {}
                Ok((agent_id, Err(e))) => {
                    tracing::warn!(agent_id = %agent_id, error = %e, "failed to stop agent during shutdown");
                }
                Err(e) => tracing::warn!(error = %e, "stop task failed during shutdown"),
            }
        }
        self.lock().await.persist();
    }
}

/// Owner of every agent record and worker process.
///
/// All access goes through the [`SharedSupervisor`] mutex, which serializes
/// command handling and exit-monitor finalization. Invariant: an agent whose
/// status is `running` has an entry in exactly one of `processes` (watched
/// by its exit monitor) or `stopping` (being terminated).
#[derive(Debug)]
pub struct Supervisor {
    config: SupervisorConfig,
    agents: BTreeMap<String, AgentRecord>,
    processes: HashMap<String, RunningProcess>,
    stopping: HashMap<String, Stopping>,
    shut_down: bool,
    this: Weak<Mutex<Supervisor>>,
}

impl Supervisor {
    /// Build a supervisor, recovering agents from the configured state file.
    ///
    /// The cleaned state is written back when recovery changed anything.
    pub fn new(config: SupervisorConfig) -> (SharedSupervisor, RecoveryReport) {
        let (agents, report) = recover_state(&config.state_file);
        if !report.dropped.is_empty() {
            tracing::info!(count = report.dropped.len(), "dropped agents with missing spec files");
        }
        if report.changed()
            && let Err(e) = save_state(&config.state_file, &agents)
        {
            tracing::warn!(error = %e, "failed to persist recovered agent state");
        }

        let supervisor = Arc::new_cyclic(|this| {
            Mutex::new(Supervisor {
                config,
                agents,
                processes: HashMap::new(),
                stopping: HashMap::new(),
                shut_down: false,
                this: this.clone(),
            })
        });

        (SharedSupervisor(supervisor), report)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn status(&self, agent_id: &str) -> Result<AgentRecord> {
        self.agents
            .get(agent_id)
            .cloned()
            .ok_or_else(|| WardenError::NotFound(agent_id.to_string()))
    }

    /// All agents, ordered by id.
    pub fn list(&self) -> Vec<AgentRecord> {
        self.agents.values().cloned().collect()
    }

    /// PID of the agent's live process, if any.
    pub fn pid(&self, agent_id: &str) -> Option<u32> {
        self.processes
            .get(agent_id)
            .map(|p| p.pid)
            .or_else(|| self.stopping.get(agent_id).map(|s| s.pid))
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create a `ready` record without starting anything.
    pub fn register(&mut self, agent_id: &str, config: Option<AgentConfig>) -> Result<AgentRecord> {
        self.ensure_accepting()?;
        if self.agents.contains_key(agent_id) {
            return Err(WardenError::AlreadyExists(agent_id.to_string()));
        }

        let record = AgentRecord::new(agent_id, config.unwrap_or_default());
        self.agents.insert(agent_id.to_string(), record.clone());
        self.persist();

        tracing::info!(agent_id, "agent registered");
        Ok(record)
    }

    /// Start (or restart) an agent's worker.
    ///
    /// Unknown ids are registered first. A given `config` replaces the stored
    /// one. The config is checked before anything is mutated; a failed spawn
    /// leaves the record `failed`. A worker that is still being stopped
    /// counts as running.
    pub fn start(&mut self, agent_id: &str, config: Option<AgentConfig>) -> Result<AgentRecord> {
        self.ensure_accepting()?;
        if self.has_process(agent_id) {
            return Err(WardenError::AlreadyRunning(agent_id.to_string()));
        }

        let config = config
            .or_else(|| self.agents.get(agent_id).map(|r| r.config.clone()))
            .unwrap_or_default();
        config.require_launch_paths()?;

        let record = self
            .agents
            .entry(agent_id.to_string())
            .or_insert_with(|| AgentRecord::new(agent_id, AgentConfig::default()));
        record.config = config;
        record.status = AgentStatus::Starting;
        record.started_at = Some(Utc::now());
        record.stopped_at = None;
        record.exit_code = None;

        let spawned = match process::spawn_worker(agent_id, &self.config, &record.config) {
            Ok(spawned) => spawned,
            Err(e) => {
                record.status = AgentStatus::Failed;
                record.stopped_at = Some(Utc::now());
                self.persist();
                tracing::error!(agent_id, error = %e, "failed to start agent");
                return Err(e);
            }
        };

        record.status = AgentStatus::Running;
        record.log_path = Some(spawned.log_path);
        let snapshot = record.clone();

        let monitor = CancellationToken::new();
        spawn_monitor(
            self.this.clone(),
            agent_id.to_string(),
            self.config.monitor_poll(),
            monitor.clone(),
        );
        self.processes.insert(
            agent_id.to_string(),
            RunningProcess {
                child: spawned.child,
                pid: spawned.pid,
                monitor,
            },
        );
        self.persist();

        tracing::info!(agent_id, pid = spawned.pid, "agent started");
        Ok(snapshot)
    }

    /// First half of a stop: detach the worker from its exit monitor.
    fn begin_stop(&mut self, agent_id: &str) -> Result<StopStep> {
        if !self.agents.contains_key(agent_id) {
            return Err(WardenError::NotFound(agent_id.to_string()));
        }
        if let Some(stopping) = self.stopping.get(agent_id) {
            return Ok(StopStep::InProgress(stopping.done.clone()));
        }

        if let Some(running) = self.processes.remove(agent_id) {
            running.monitor.cancel();
            self.stopping.insert(
                agent_id.to_string(),
                Stopping {
                    pid: running.pid,
                    done: CancellationToken::new(),
                },
            );
            tracing::debug!(agent_id, pid = running.pid, "stopping agent");
            return Ok(StopStep::Terminate {
                child: running.child,
                pid: running.pid,
                grace: self.config.stop_grace(),
            });
        }

        if let Some(record) = self.agents.get_mut(agent_id)
            && record.status != AgentStatus::Stopped
        {
            record.status = AgentStatus::Stopped;
            record.stopped_at = Some(Utc::now());
            self.persist();
        }
        Ok(StopStep::Done(self.status(agent_id)?))
    }

    /// Second half of a stop: record the outcome and wake other waiters.
    fn finish_stop(&mut self, agent_id: &str, exit_code: Option<i32>) {
        self.finalize(agent_id, exit_code, EndReason::Stopped);
        if let Some(stopping) = self.stopping.remove(agent_id) {
            stopping.done.cancel();
        }
        tracing::info!(agent_id, ?exit_code, "agent stopped");
    }

    /// Delete a record whose worker is gone. An agent restarted since its
    /// stop is refused rather than orphaned.
    fn forget(&mut self, agent_id: &str) -> Result<AgentRecord> {
        if self.has_process(agent_id) {
            return Err(WardenError::AlreadyRunning(agent_id.to_string()));
        }
        let record = self
            .agents
            .remove(agent_id)
            .ok_or_else(|| WardenError::NotFound(agent_id.to_string()))?;
        self.persist();

        tracing::info!(agent_id, "agent removed");
        Ok(record)
    }

    /// Mark the supervisor as shutting down. Returns the agents that still
    /// have a worker, or `None` when shutdown already began.
    fn begin_shutdown(&mut self) -> Option<Vec<String>> {
        if self.shut_down {
            return None;
        }
        self.shut_down = true;
        Some(
            self.processes
                .keys()
                .chain(self.stopping.keys())
                .cloned()
                .collect(),
        )
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Called by the exit monitor. Returns true once the agent has no live
    /// process left to watch.
    pub(super) fn reap_if_exited(&mut self, agent_id: &str) -> bool {
        let Some(running) = self.processes.get_mut(agent_id) else {
            return true;
        };

        let exit_code = match running.child.try_wait() {
            Ok(None) => return false,
            Ok(Some(status)) => process::exit_code(status),
            Err(e) => {
                tracing::warn!(agent_id, error = %e, "failed to poll worker; treating as exited");
                None
            }
        };

        self.processes.remove(agent_id);
        self.finalize(agent_id, exit_code, EndReason::Exited);
        tracing::info!(agent_id, ?exit_code, "agent exited");
        true
    }

    /// The single place a run ends: record the outcome, close the log, persist.
    fn finalize(&mut self, agent_id: &str, exit_code: Option<i32>, reason: EndReason) {
        let Some(record) = self.agents.get_mut(agent_id) else {
            return;
        };
        record.status = AgentStatus::Stopped;
        record.exit_code = exit_code;
        record.stopped_at = Some(Utc::now());
        if let Some(log_path) = &record.log_path {
            process::write_footer(log_path, reason, exit_code);
        }
        self.persist();
    }

    fn has_process(&self, agent_id: &str) -> bool {
        self.processes.contains_key(agent_id) || self.stopping.contains_key(agent_id)
    }

    fn ensure_accepting(&self) -> Result<()> {
        if self.shut_down {
            return Err(WardenError::UserError(
                "Supervisor is shutting down".to_string(),
            ));
        }
        Ok(())
    }

    /// Mirror the registry to the state file. Failures are logged: the
    /// in-memory registry stays authoritative while the daemon runs.
    fn persist(&self) {
        if let Err(e) = save_state(&self.config.state_file, &self.agents) {
            tracing::warn!(
                path = %self.config.state_file.display(),
                error = %e,
                "failed to persist agent state"
            );
        }
    }
}
