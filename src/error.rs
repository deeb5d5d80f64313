//! Error types for warden.
//!
//! Uses thiserror for derive macros. Every message is meant to be shown to a
//! human as-is, either on stderr or inside an IPC `error` response.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for warden operations.
#[derive(Error, Debug)]
pub enum WardenError {
    /// No agent is registered under this id.
    #[error("Agent {0} not found")]
    NotFound(String),

    /// `register` was called with an id that is already taken.
    #[error("Agent {0} already exists")]
    AlreadyExists(String),

    /// `start` was called on an agent whose process is alive.
    #[error("Agent {0} already running")]
    AlreadyRunning(String),

    /// The OS refused to create the worker process.
    #[error("Failed to start agent {agent_id}: {source}")]
    SpawnError {
        agent_id: String,
        #[source]
        source: std::io::Error,
    },

    /// The IPC connection broke mid-request.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// The supervisor socket is absent or refuses connections.
    #[error("Daemon is not running: {0}")]
    DaemonNotRunning(String),

    /// The command validator refused a command.
    #[error("Command denied: {0}")]
    ValidationDenied(String),

    /// A persisted file could not be read or parsed.
    #[error("State file is corrupt: {0}")]
    StateCorrupt(String),

    /// A request was structurally valid JSON but semantically incomplete.
    #[error("{0}")]
    InvalidRequest(String),

    /// Generic user-actionable failure (I/O, configuration).
    #[error("{0}")]
    UserError(String),

    /// An `error` response from the daemon, as seen by a client.
    #[error("{message}")]
    Remote {
        /// The daemon-side error kind, when the response carried one.
        kind: Option<String>,
        message: String,
    },
}

impl WardenError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            WardenError::NotFound(_)
            | WardenError::AlreadyExists(_)
            | WardenError::AlreadyRunning(_)
            | WardenError::SpawnError { .. } => exit_codes::LIFECYCLE_FAILURE,
            WardenError::ConnectionLost(_) | WardenError::DaemonNotRunning(_) => {
                exit_codes::DAEMON_UNAVAILABLE
            }
            WardenError::ValidationDenied(_) => exit_codes::VALIDATION_DENIED,
            WardenError::StateCorrupt(_)
            | WardenError::InvalidRequest(_)
            | WardenError::UserError(_) => exit_codes::USER_ERROR,
            WardenError::Remote { kind, .. } => match kind.as_deref() {
                Some("not_found" | "already_exists" | "already_running" | "spawn_error") => {
                    exit_codes::LIFECYCLE_FAILURE
                }
                Some("validation_denied") => exit_codes::VALIDATION_DENIED,
                _ => exit_codes::USER_ERROR,
            },
        }
    }

    /// Stable snake_case name of the variant, carried in IPC error responses.
    pub fn kind(&self) -> &str {
        match self {
            WardenError::NotFound(_) => "not_found",
            WardenError::AlreadyExists(_) => "already_exists",
            WardenError::AlreadyRunning(_) => "already_running",
            WardenError::SpawnError { .. } => "spawn_error",
            WardenError::ConnectionLost(_) => "connection_lost",
            WardenError::DaemonNotRunning(_) => "daemon_not_running",
            WardenError::ValidationDenied(_) => "validation_denied",
            WardenError::StateCorrupt(_) => "state_corrupt",
            WardenError::InvalidRequest(_) => "invalid_request",
            WardenError::UserError(_) => "user_error",
            WardenError::Remote { kind, .. } => kind.as_deref().unwrap_or("remote"),
        }
    }
}

/// Result type alias for warden operations.
pub type Result<T> = std::result::Result<T, WardenError>;
