//! Worker subprocess spawning, termination and log framing.

use crate::config::{AUTO_ACCEPT_ENV, AgentConfig, SupervisorConfig};
use crate::context::WorkspaceContext;
use crate::error::{Result, WardenError};
use chrono::Utc;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};

const LOG_RULE_WIDTH: usize = 60;

/// A freshly spawned worker.
#[derive(Debug)]
pub(super) struct SpawnedWorker {
    pub child: Child,
    pub pid: u32,
    pub log_path: PathBuf,
}

/// How a run ended, as written in the log footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EndReason {
    /// Terminated by an explicit `stop`.
    Stopped,
    /// Exited on its own and was noticed by the exit monitor.
    Exited,
}

impl EndReason {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Exited => "exited",
        }
    }
}

/// Arguments for the worker: configured program plus flags derived from the
/// agent config.
pub(super) fn worker_argv(config: &SupervisorConfig, agent: &AgentConfig) -> Result<Vec<String>> {
    let (spec_file, project_dir) = agent.require_launch_paths()?;
    let mut argv = config.worker_argv()?;

    argv.push("--spec-file".to_string());
    argv.push(spec_file.display().to_string());
    argv.push("--project-dir".to_string());
    argv.push(project_dir.display().to_string());
    argv.push("--target-branch".to_string());
    argv.push(
        agent
            .target_branch
            .clone()
            .unwrap_or_else(|| config.default_target_branch.clone()),
    );
    if let Some(max_iterations) = agent.max_iterations {
        argv.push("--max-iterations".to_string());
        argv.push(max_iterations.to_string());
    }

    Ok(argv)
}

/// Spawn the worker for `agent_id` with output captured to a new log file.
///
/// The child runs in its own process group so `stop` can signal everything
/// it started.
pub(super) fn spawn_worker(
    agent_id: &str,
    config: &SupervisorConfig,
    agent: &AgentConfig,
) -> Result<SpawnedWorker> {
    let argv = worker_argv(config, agent)?;
    let ctx = WorkspaceContext::for_agent(agent, &config.agent_dir_name)?;
    let spawn_error = |source: std::io::Error| WardenError::SpawnError {
        agent_id: agent_id.to_string(),
        source,
    };

    std::fs::create_dir_all(&ctx.logs_dir).map_err(spawn_error)?;
    let log_path = ctx.logs_dir.join(format!(
        "{}-{}.log",
        agent_id,
        Utc::now().format("%Y%m%d-%H%M%S")
    ));

    let mut log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(spawn_error)?;
    write_header(&mut log, agent_id, &argv, &ctx.project_dir).map_err(spawn_error)?;

    let stdout = log.try_clone().map_err(spawn_error)?;
    let stderr = log.try_clone().map_err(spawn_error)?;

    let mut command = Command::new(&argv[0]);
    command
        .args(&argv[1..])
        .current_dir(&ctx.project_dir)
        .envs(&config.worker_environment)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .process_group(0);
    if agent.auto_accept {
        command.env(AUTO_ACCEPT_ENV, "1");
    }

    let child = command.spawn().map_err(|e| {
        let _ = writeln!(log, "Failed to start: {}", e);
        spawn_error(e)
    })?;
    let pid = child.id().ok_or_else(|| {
        spawn_error(std::io::Error::other("process exited before its pid was read"))
    })?;

    tracing::info!(agent_id, pid, log = %log_path.display(), "worker spawned");
    Ok(SpawnedWorker {
        child,
        pid,
        log_path,
    })
}

/// Exit code of a finished process; signal deaths are the negated signal.
pub(super) fn exit_code(status: ExitStatus) -> Option<i32> {
    status.code().or_else(|| status.signal().map(|signal| -signal))
}

/// Stop a worker: SIGTERM to its process group, then SIGKILL after `grace`.
///
/// Always reaps the child. Returns its exit code when the OS reported one.
pub(super) async fn terminate(child: &mut Child, pid: u32, grace: Duration) -> Option<i32> {
    if let Ok(Some(status)) = child.try_wait() {
        return exit_code(status);
    }

    signal_group(child, pid, Signal::SIGTERM);
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => exit_code(status),
        Ok(Err(e)) => {
            tracing::warn!(pid, error = %e, "failed to wait for worker");
            None
        }
        Err(_) => {
            tracing::warn!(pid, grace_secs = grace.as_secs_f64(), "worker ignored SIGTERM; killing");
            signal_group(child, pid, Signal::SIGKILL);
            match child.wait().await {
                Ok(status) => exit_code(status),
                Err(e) => {
                    tracing::warn!(pid, error = %e, "failed to reap killed worker");
                    None
                }
            }
        }
    }
}

/// Signal the worker's process group, falling back to the child alone.
fn signal_group(child: &mut Child, pid: u32, signal: Signal) {
    let group = i32::try_from(pid).ok().map(Pid::from_raw);
    let sent = group.is_some_and(|pgid| killpg(pgid, signal).is_ok());
    if !sent && signal == Signal::SIGKILL {
        let _ = child.start_kill();
    }
}

fn write_header(log: &mut File, agent_id: &str, argv: &[String], cwd: &Path) -> std::io::Result<()> {
    writeln!(log, "=== Agent {} started at {} ===", agent_id, Utc::now().to_rfc3339())?;
    writeln!(log, "Command: {}", shell_words::join(argv))?;
    writeln!(log, "Working directory: {}", cwd.display())?;
    writeln!(log, "{}", "=".repeat(LOG_RULE_WIDTH))?;
    log.flush()
}

/// Append the end-of-run footer. Failures are logged, not returned: the run
/// is over either way.
pub(super) fn write_footer(log_path: &Path, reason: EndReason, exit_code: Option<i32>) {
    let result = OpenOptions::new()
        .append(true)
        .open(log_path)
        .and_then(|mut log| {
            writeln!(log)?;
            writeln!(log, "=== Agent {} at {} ===", reason.as_str(), Utc::now().to_rfc3339())?;
            match exit_code {
                Some(code) => writeln!(log, "Exit code: {}", code)?,
                None => writeln!(log, "Exit code: unknown")?,
            }
            log.flush()
        });

    if let Err(e) = result {
        tracing::warn!(log = %log_path.display(), error = %e, "failed to write log footer");
    }
}
