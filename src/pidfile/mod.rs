//! Single-instance guard for the daemon.
//!
//! The daemon writes a PID file with **create_new** semantics (exclusive
//! create) so only one supervisor runs per PID path. The file holds JSON
//! metadata:
//! - `owner`: who started the daemon (e.g., `user@HOST`)
//! - `pid`: the daemon's process ID
//! - `created_at`: RFC3339 timestamp
//!
//! A PID file naming a dead process is stale and is replaced. The guard
//! removes the file when dropped.

mod guard;
mod metadata;
mod operations;

#[cfg(test)]
mod tests;

// Re-export public API
pub use guard::PidFileGuard;
pub use metadata::PidMetadata;
pub use operations::{acquire_pid_file, is_process_alive, read_pid};
