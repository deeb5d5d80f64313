//! Warden: supervisor for autonomous coding agents.
//!
//! This is the main entry point for the `warden` CLI. It parses arguments,
//! sets up logging and the async runtime, dispatches to the appropriate
//! command handler, and handles errors with proper exit codes.

mod cli;
mod commands;
pub mod checkpoint;
pub mod config;
pub mod context;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod ipc;
pub mod logging;
pub mod pidfile;
pub mod security;
pub mod supervisor;

#[cfg(test)]
mod test_support;

use anyhow::Context;
use cli::Cli;
use std::process::ExitCode;
use tokio::runtime::Runtime;

fn bootstrap(verbose: bool) -> anyhow::Result<Runtime> {
    logging::init(verbose)?;
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let runtime = match bootstrap(cli.verbose) {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            return ExitCode::from(exit_codes::USER_ERROR as u8);
        }
    };

    match runtime.block_on(commands::dispatch(cli)) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
