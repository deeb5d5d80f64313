//! Human-approval checkpoints.
//!
//! A worker raises a checkpoint when it needs a human decision, then polls
//! until a controller (possibly another process) resolves it. Records live in
//! a per-workspace JSON log and are never deleted.
//!
//! # Sharing discipline
//!
//! Only workers create and only controllers resolve, so the log has a single
//! writer per field. Each write is a whole-file atomic rewrite (temp file,
//! fsync, rename); readers always see a complete file.
//!
//! # Pending semantics
//!
//! The "pending" checkpoint is the most recently created record that is not
//! completed. Creating a second one while the first is unresolved is allowed;
//! the first becomes pending again once the second is resolved.

mod auto;
mod store;
mod types;
mod wait;


// Re-export public API
pub use store::{CheckpointLog, CheckpointStore};
pub use types::{
    CheckpointRecord, CheckpointStatus, CheckpointType, GLOBAL_GROUP, Resolution, WaitOutcome,
};
