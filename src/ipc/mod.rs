//! Local control channel between controllers and the supervisor daemon.
//!
//! Newline-delimited JSON over a Unix domain socket. Each line is one
//! request; the daemon answers each with exactly one response line, in
//! order. A connection carries any number of sequential requests and the
//! daemon never pushes unsolicited messages, so controllers poll `status`
//! or `list`.
//!
//! A malformed frame (bad JSON, oversize line, unknown command) gets an
//! `error` response and the connection stays usable. A controller that
//! disconnects mid-request only loses its own connection.

mod client;
mod daemon;
mod protocol;
mod server;


// Re-export public API
pub use client::{DaemonClient, is_daemon_running, read_daemon_pid};
pub use daemon::run_daemon;
pub use protocol::{
    AgentView, CommandKind, MAX_LINE_LENGTH, Request, Response, ResponseStatus,
};
pub use server::IpcServer;
