//! CLI argument parsing for warden.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::config::AgentConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Warden: supervisor for autonomous coding agents.
///
/// A foreground daemon owns the agent processes; every other subcommand is
/// a controller talking to it over a local Unix socket:
/// - `daemon` runs the supervisor
/// - `register` / `start` / `stop` / `remove` manage agents
/// - `checkpoint` resolves pending human approval gates
/// - `check-command` runs the worker-side command allow-list
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Supervisor configuration file (YAML). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless WARDEN_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for warden.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the supervisor daemon in the foreground.
    ///
    /// Stops every agent and removes the socket and PID file on SIGINT,
    /// SIGTERM or a `shutdown` request.
    Daemon,

    /// Check that the daemon is answering.
    Ping,

    /// List all agents.
    List,

    /// Show one agent.
    Status(AgentIdArgs),

    /// Register an agent without starting it.
    Register(AgentArgs),

    /// Start (or restart) an agent's worker. Unknown ids are registered.
    Start(AgentArgs),

    /// Stop an agent's worker.
    ///
    /// Sends SIGTERM, then SIGKILL after the configured grace period.
    Stop(AgentIdArgs),

    /// Stop an agent if needed and forget it.
    Remove(AgentIdArgs),

    /// Stop every agent and shut the daemon down.
    Shutdown,

    /// Inspect or resolve a workspace's pending checkpoint.
    Checkpoint(CheckpointCommand),

    /// Run a shell command line through the command allow-list.
    ///
    /// Prints the decision. Exits with code 2 when the command is denied.
    CheckCommand(CheckCommandArgs),
}

/// Arguments naming one agent.
#[derive(Args, Debug)]
pub struct AgentIdArgs {
    /// Agent identifier.
    pub agent_id: String,
}

/// Arguments for `register` and `start`.
#[derive(Args, Debug)]
pub struct AgentArgs {
    /// Agent identifier.
    pub agent_id: String,

    #[command(flatten)]
    pub config: AgentConfigArgs,
}

/// Per-agent configuration flags.
///
/// When none are given the daemon keeps the agent's stored config.
#[derive(Args, Debug, Default)]
pub struct AgentConfigArgs {
    /// Specification file the worker implements.
    #[arg(long)]
    pub spec_file: Option<PathBuf>,

    /// Project directory the worker runs in.
    #[arg(long)]
    pub project_dir: Option<PathBuf>,

    /// Branch the worker targets.
    #[arg(long)]
    pub target_branch: Option<String>,

    /// Cap on worker iterations.
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Resolve checkpoints automatically instead of waiting for a human.
    #[arg(long)]
    pub auto_accept: bool,

    /// Spec slug used for the workspace state directory.
    #[arg(long)]
    pub spec_slug: Option<String>,

    /// Spec hash used for the workspace state directory.
    #[arg(long)]
    pub spec_hash: Option<String>,
}

impl AgentConfigArgs {
    /// The config to send, or `None` when no flag was given.
    pub fn into_config(self) -> Option<AgentConfig> {
        let config = AgentConfig {
            spec_file: self.spec_file,
            project_dir: self.project_dir,
            target_branch: self.target_branch,
            max_iterations: self.max_iterations,
            auto_accept: self.auto_accept,
            spec_slug: self.spec_slug,
            spec_hash: self.spec_hash,
        };
        (config != AgentConfig::default()).then_some(config)
    }
}

/// Checkpoint subcommands.
#[derive(Parser, Debug)]
pub struct CheckpointCommand {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    #[command(subcommand)]
    pub action: CheckpointAction,
}

/// Locates a workspace's checkpoint log.
#[derive(Args, Debug)]
pub struct WorkspaceArgs {
    /// Project directory of the agent.
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Spec slug of the agent's workspace.
    #[arg(long, global = true)]
    pub spec_slug: Option<String>,

    /// Spec hash of the agent's workspace.
    #[arg(long, global = true)]
    pub spec_hash: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum CheckpointAction {
    /// Show the pending checkpoint, if any.
    Show(ShowArgs),

    /// Approve the pending checkpoint.
    Approve(NotesArgs),

    /// Reject the pending checkpoint.
    Reject(RejectArgs),

    /// Skip the pending checkpoint.
    Skip(NotesArgs),

    /// Approve the pending checkpoint with an edited payload.
    Modify(ModifyArgs),

    /// Record a new pending checkpoint and print its id.
    Create(CreateArgs),

    /// Block until a checkpoint is resolved.
    ///
    /// Exits 0 when the worker may proceed and 1 when the checkpoint was
    /// rejected. With WARDEN_AUTO_ACCEPT=1 the checkpoint is approved
    /// immediately.
    Wait(WaitArgs),

    /// Approve the pending checkpoint using its recommended decision.
    AutoApprove,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Print every checkpoint in the log, not only the pending one.
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct NotesArgs {
    /// Notes recorded with the decision.
    #[arg(short, long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct RejectArgs {
    /// Reason for rejection (required).
    #[arg(short, long)]
    pub reason: String,
}

#[derive(Args, Debug)]
pub struct ModifyArgs {
    /// Replacement payload, as a JSON value.
    #[arg(short, long)]
    pub modifications: String,

    /// Notes recorded with the decision.
    #[arg(short, long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Checkpoint type, e.g. `spec_to_issues` or any custom label.
    pub checkpoint_type: String,

    /// Context shown to the reviewer, as a JSON object.
    #[arg(long)]
    pub context: Option<String>,

    /// Issue the checkpoint belongs to.
    #[arg(long)]
    pub issue: Option<String>,
}

#[derive(Args, Debug)]
pub struct WaitArgs {
    /// Checkpoint id printed by `checkpoint create`.
    pub checkpoint_id: String,

    /// Poll interval in milliseconds.
    #[arg(long, default_value_t = 2000)]
    pub interval_ms: u64,
}

/// Arguments for `check-command`.
#[derive(Args, Debug)]
pub struct CheckCommandArgs {
    /// The command line to check, as a single argument.
    pub command: String,

    /// Directory the command would run in. Defaults to the current one.
    #[arg(long)]
    pub cwd: Option<PathBuf>,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_start_with_config_flags() {
        let cli = Cli::try_parse_from([
            "warden",
            "start",
            "a1",
            "--spec-file",
            "spec.md",
            "--project-dir",
            "/work",
            "--max-iterations",
            "3",
            "--auto-accept",
        ])
        .unwrap();

        let Command::Start(args) = cli.command else {
            panic!("expected start");
        };
        assert_eq!(args.agent_id, "a1");
        let config = args.config.into_config().unwrap();
        assert_eq!(config.spec_file, Some(PathBuf::from("spec.md")));
        assert_eq!(config.max_iterations, Some(3));
        assert!(config.auto_accept);
    }

    #[test]
    fn test_start_without_flags_sends_no_config() {
        let cli = Cli::try_parse_from(["warden", "start", "a1"]).unwrap();
        let Command::Start(args) = cli.command else {
            panic!("expected start");
        };
        assert!(args.config.into_config().is_none());
    }

    #[test]
    fn test_checkpoint_reject_requires_reason() {
        assert!(Cli::try_parse_from(["warden", "checkpoint", "reject"]).is_err());

        let cli = Cli::try_parse_from([
            "warden",
            "checkpoint",
            "reject",
            "--reason",
            "scope too wide",
            "--project-dir",
            "/work",
            "--spec-slug",
            "demo",
            "--spec-hash",
            "abcde",
        ])
        .unwrap();
        let Command::Checkpoint(cmd) = cli.command else {
            panic!("expected checkpoint");
        };
        assert_eq!(cmd.workspace.spec_slug.as_deref(), Some("demo"));
        assert!(matches!(cmd.action, CheckpointAction::Reject(ref r) if r.reason == "scope too wide"));
    }

    #[test]
    fn test_checkpoint_create_and_wait() {
        let cli = Cli::try_parse_from([
            "warden",
            "checkpoint",
            "create",
            "issue_selection",
            "--context",
            "{}",
            "--issue",
            "7",
        ])
        .unwrap();
        let Command::Checkpoint(cmd) = cli.command else {
            panic!("expected checkpoint");
        };
        let CheckpointAction::Create(args) = cmd.action else {
            panic!("expected create");
        };
        assert_eq!(args.checkpoint_type, "issue_selection");
        assert_eq!(args.issue.as_deref(), Some("7"));

        let cli = Cli::try_parse_from(["warden", "checkpoint", "wait", "abc123"]).unwrap();
        let Command::Checkpoint(cmd) = cli.command else {
            panic!("expected checkpoint");
        };
        let CheckpointAction::Wait(args) = cmd.action else {
            panic!("expected wait");
        };
        assert_eq!(args.interval_ms, 2000);
    }

    #[test]
    fn test_global_flags() {
        let cli =
            Cli::try_parse_from(["warden", "list", "--verbose", "--config", "w.yaml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("w.yaml")));
    }
}
