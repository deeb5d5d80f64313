//! Filesystem utilities for warden.
//!
//! Persisted state is always replaced wholesale through [`atomic_write`], never
//! edited in place.

pub mod atomic;

pub use atomic::{StagedWrite, atomic_write, stage};
