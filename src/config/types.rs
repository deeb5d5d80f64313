//! Constants and default value functions used by the config structs.

use std::path::PathBuf;

/// Environment variable set on the worker when `auto_accept` is enabled.
pub const AUTO_ACCEPT_ENV: &str = "WARDEN_AUTO_ACCEPT";

/// Slug used for log directories when an agent config carries none.
pub const DEFAULT_SLUG: &str = "unknown";

/// Spec hash used for log directories when an agent config carries none.
pub const DEFAULT_SPEC_HASH: &str = "00000";

pub(crate) fn default_socket_path() -> PathBuf {
    std::env::temp_dir().join("warden.sock")
}
pub(crate) fn default_pid_path() -> PathBuf {
    std::env::temp_dir().join("warden.pid")
}
pub(crate) fn default_state_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("warden")
        .join("state.json")
}
pub(crate) fn default_worker_command() -> String {
    "warden-worker".to_string()
}
pub(crate) fn default_agent_dir_name() -> String {
    ".warden".to_string()
}
pub(crate) fn default_target_branch() -> String {
    "main".to_string()
}
pub(crate) fn default_stop_grace_seconds() -> u64 {
    5
}
pub(crate) fn default_monitor_poll_ms() -> u64 {
    1000
}
