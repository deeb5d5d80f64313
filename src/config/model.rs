//! SupervisorConfig struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Configuration for the supervisor daemon.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    // =========================================================================
    // Runtime files
    // =========================================================================
    /// Unix socket the daemon listens on.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// PID file written while the daemon runs.
    #[serde(default = "default_pid_path")]
    pub pid_path: PathBuf,

    /// JSON file mirroring the agent registry.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    // =========================================================================
    // Worker invocation
    // =========================================================================
    /// Worker program plus leading arguments (shell-words parsed; no shell).
    #[serde(default = "default_worker_command")]
    pub worker_command: String,

    /// Extra environment variables for every worker.
    #[serde(default)]
    pub worker_environment: BTreeMap<String, String>,

    /// Per-project directory holding workspace state (default: ".warden").
    #[serde(default = "default_agent_dir_name")]
    pub agent_dir_name: String,

    /// Branch passed to workers whose config names none.
    #[serde(default = "default_target_branch")]
    pub default_target_branch: String,

    // =========================================================================
    // Lifecycle timing
    // =========================================================================
    /// Seconds between SIGTERM and SIGKILL when stopping an agent.
    #[serde(default = "default_stop_grace_seconds")]
    pub stop_grace_seconds: u64,

    /// Exit-monitor poll interval in milliseconds.
    #[serde(default = "default_monitor_poll_ms")]
    pub monitor_poll_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            pid_path: default_pid_path(),
            state_file: default_state_file(),
            worker_command: default_worker_command(),
            worker_environment: BTreeMap::new(),
            agent_dir_name: default_agent_dir_name(),
            default_target_branch: default_target_branch(),
            stop_grace_seconds: default_stop_grace_seconds(),
            monitor_poll_ms: default_monitor_poll_ms(),
        }
    }
}
