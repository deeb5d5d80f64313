//! Controller commands: `ping`, `list`, `status`, `register`, `start`,
//! `stop`, `remove`, `shutdown`.
//!
//! Each opens one connection to the daemon, sends one request and prints
//! the result. Daemon-side failures come back as `WardenError::Remote` and
//! keep their exit code.

use crate::cli::{AgentArgs, AgentIdArgs};
use crate::config::SupervisorConfig;
use crate::error::Result;
use crate::ipc::{AgentView, DaemonClient, read_daemon_pid};
use chrono::{DateTime, Utc};

async fn connect(config: &SupervisorConfig) -> Result<DaemonClient> {
    DaemonClient::connect(&config.socket_path).await
}

pub async fn cmd_ping(config: &SupervisorConfig) -> Result<()> {
    connect(config).await?.ping().await?;
    match read_daemon_pid(&config.pid_path) {
        Some(pid) => println!("pong (daemon pid {})", pid),
        None => println!("pong"),
    }
    Ok(())
}

pub async fn cmd_list(config: &SupervisorConfig) -> Result<()> {
    let agents = connect(config).await?.list().await?;
    if agents.is_empty() {
        println!("No agents registered.");
        return Ok(());
    }

    println!("{}", list_header());
    for agent in &agents {
        println!("{}", list_row(agent));
    }
    Ok(())
}

pub async fn cmd_status(config: &SupervisorConfig, args: AgentIdArgs) -> Result<()> {
    let agent = connect(config).await?.status(&args.agent_id).await?;
    print!("{}", render_agent(&agent));
    Ok(())
}

pub async fn cmd_register(config: &SupervisorConfig, args: AgentArgs) -> Result<()> {
    let agent = connect(config)
        .await?
        .register(&args.agent_id, args.config.into_config())
        .await?;
    println!("Registered agent {}", agent.record.agent_id);
    Ok(())
}

pub async fn cmd_start(config: &SupervisorConfig, args: AgentArgs) -> Result<()> {
    let agent = connect(config)
        .await?
        .start(&args.agent_id, args.config.into_config())
        .await?;
    match agent.pid {
        Some(pid) => println!("Started agent {} (pid {})", agent.record.agent_id, pid),
        None => println!("Started agent {}", agent.record.agent_id),
    }
    if let Some(log_path) = &agent.record.log_path {
        println!("Log: {}", log_path.display());
    }
    Ok(())
}

pub async fn cmd_stop(config: &SupervisorConfig, args: AgentIdArgs) -> Result<()> {
    let agent = connect(config).await?.stop(&args.agent_id).await?;
    println!(
        "Stopped agent {} (exit code {})",
        agent.record.agent_id,
        exit_code_text(agent.record.exit_code)
    );
    Ok(())
}

pub async fn cmd_remove(config: &SupervisorConfig, args: AgentIdArgs) -> Result<()> {
    let agent = connect(config).await?.remove(&args.agent_id).await?;
    println!("Removed agent {}", agent.record.agent_id);
    Ok(())
}

pub async fn cmd_shutdown(config: &SupervisorConfig) -> Result<()> {
    connect(config).await?.shutdown().await?;
    println!("Daemon is shutting down.");
    Ok(())
}

// ============================================================================
// Rendering
// ============================================================================

fn timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn exit_code_text(code: Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn list_header() -> String {
    format!("{:<20} {:<9} {:>8}  {:<23}  {}", "AGENT", "STATUS", "PID", "STARTED", "EXIT")
}

fn list_row(agent: &AgentView) -> String {
    let record = &agent.record;
    let pid = agent.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
    let exit = record
        .exit_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<20} {:<9} {:>8}  {:<23}  {}",
        record.agent_id,
        record.status.as_str(),
        pid,
        timestamp(record.started_at),
        exit
    )
}

fn render_agent(agent: &AgentView) -> String {
    let record = &agent.record;
    let mut out = String::new();
    let mut line = |label: &str, value: String| {
        out.push_str(&format!("{:<12}{}\n", label, value));
    };

    line("Agent:", record.agent_id.clone());
    line("Status:", record.status.to_string());
    if let Some(pid) = agent.pid {
        line("PID:", pid.to_string());
    }
    line("Started:", timestamp(record.started_at));
    if record.stopped_at.is_some() {
        line("Stopped:", timestamp(record.stopped_at));
        line("Exit code:", exit_code_text(record.exit_code));
    }
    if let Some(log_path) = &record.log_path {
        line("Log:", log_path.display().to_string());
    }
    if let Some(spec_file) = &record.config.spec_file {
        line("Spec:", spec_file.display().to_string());
    }
    if let Some(project_dir) = &record.config.project_dir {
        line("Project:", project_dir.display().to_string());
    }
    if record.config.auto_accept {
        line("Approvals:", "automatic".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::supervisor::{AgentRecord, AgentStatus};
    use std::path::PathBuf;

    fn running_view() -> AgentView {
        let mut record = AgentRecord::new(
            "a1",
            AgentConfig {
                spec_file: Some(PathBuf::from("/work/spec.md")),
                project_dir: Some(PathBuf::from("/work")),
                ..Default::default()
            },
        );
        record.status = AgentStatus::Running;
        AgentView::new(record, Some(4242))
    }

    #[test]
    fn test_list_row_shows_pid_and_status() {
        let row = list_row(&running_view());
        assert!(row.starts_with("a1 "));
        assert!(row.contains("running"));
        assert!(row.contains("4242"));
    }

    #[test]
    fn test_render_agent_hides_exit_code_while_running() {
        let text = render_agent(&running_view());
        assert!(text.contains("Status:     running"));
        assert!(text.contains("PID:        4242"));
        assert!(text.contains("Spec:       /work/spec.md"));
        assert!(!text.contains("Exit code"));
    }

    #[test]
    fn test_render_stopped_agent_reports_signal_exit() {
        let mut view = running_view();
        view.pid = None;
        view.record.status = AgentStatus::Stopped;
        view.record.stopped_at = Some(Utc::now());
        view.record.exit_code = Some(-9);

        let text = render_agent(&view);
        assert!(text.contains("Exit code:  -9"));
        assert!(!text.contains("PID:"));
    }
}
