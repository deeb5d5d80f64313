//! Command implementations for warden.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Agent commands talk to the daemon over its socket;
//! `checkpoint` and `check-command` work locally.

mod agents;
mod check_command;
mod checkpoint;
mod daemon;

use crate::cli::{Cli, Command};
use crate::config::SupervisorConfig;
use crate::error::Result;
use std::path::Path;

/// Dispatch a command to its implementation.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Daemon => daemon::cmd_daemon(load_config(config_path)?).await,
        Command::Ping => agents::cmd_ping(&load_config(config_path)?).await,
        Command::List => agents::cmd_list(&load_config(config_path)?).await,
        Command::Status(args) => agents::cmd_status(&load_config(config_path)?, args).await,
        Command::Register(args) => agents::cmd_register(&load_config(config_path)?, args).await,
        Command::Start(args) => agents::cmd_start(&load_config(config_path)?, args).await,
        Command::Stop(args) => agents::cmd_stop(&load_config(config_path)?, args).await,
        Command::Remove(args) => agents::cmd_remove(&load_config(config_path)?, args).await,
        Command::Shutdown => agents::cmd_shutdown(&load_config(config_path)?).await,
        Command::Checkpoint(cmd) => {
            checkpoint::cmd_checkpoint(&load_config(config_path)?, cmd).await
        }
        Command::CheckCommand(args) => check_command::cmd_check_command(args),
    }
}

fn load_config(path: Option<&Path>) -> Result<SupervisorConfig> {
    let config = SupervisorConfig::load_or_default(path)?;
    config.validate()?;
    Ok(config)
}
