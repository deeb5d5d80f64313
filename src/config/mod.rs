//! Configuration model for warden.
//!
//! `SupervisorConfig` is the daemon's YAML configuration. It supports
//! forward-compatible parsing (unknown fields are ignored), defaults for every
//! field, and validation of values.
//!
//! `AgentConfig` is the per-agent configuration carried over IPC and persisted
//! in the state file. It is strict: unknown keys are rejected at the boundary.

mod agent;
mod model;
mod operations;
mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use agent::AgentConfig;
pub use model::SupervisorConfig;
pub use types::{AUTO_ACCEPT_ENV, DEFAULT_SLUG, DEFAULT_SPEC_HASH};
