//! Exit code constants for the warden CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, bad config, I/O failure)
//! - 2: Command denied by the security validator
//! - 3: Agent lifecycle conflict (unknown agent, already running, spawn failure)
//! - 4: Supervisor unreachable or connection lost

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration, or filesystem failure.
pub const USER_ERROR: i32 = 1;

/// The command validator denied the candidate command.
pub const VALIDATION_DENIED: i32 = 2;

/// Lifecycle failure: not found, already exists/running, or spawn error.
pub const LIFECYCLE_FAILURE: i32 = 3;

/// The supervisor socket could not be reached or the connection dropped.
pub const DAEMON_UNAVAILABLE: i32 = 4;
