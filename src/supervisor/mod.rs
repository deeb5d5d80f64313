//! Agent process supervisor.
//!
//! Owns the authoritative `agent_id -> AgentRecord` map, mirrors it to a JSON
//! state file after every mutation, and mediates every worker lifecycle
//! transition:
//!
//! - `register` / `start` / `stop` / `remove` / `shutdown` come from IPC
//! - one exit monitor per running agent notices workers that exit on their own
//!
//! Both `stop` and the exit monitor end a run through the same finalization
//! (status, exit code, timestamp, log footer, persist) under the supervisor
//! lock, so an exit is recorded exactly once.
//!
//! # Startup recovery
//!
//! A new supervisor reloads the state file. Records that were `running`
//! become `stopped` (their processes died with the previous supervisor) and
//! records whose spec file has vanished are dropped.

mod monitor;
mod process;
mod record;
mod registry;
mod state;


// Re-export public API
pub use record::{AgentRecord, AgentStatus};
pub use registry::{SharedSupervisor, Supervisor};
pub use state::{PersistedState, RecoveryReport, read_state};
