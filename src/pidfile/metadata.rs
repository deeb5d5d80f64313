//! PID file metadata.

use crate::error::{Result, WardenError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Metadata stored in the PID file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PidMetadata {
    /// Owner of the daemon (e.g., `user@HOST`).
    pub owner: String,

    pub pid: u32,

    /// Timestamp when the daemon started (RFC3339).
    pub created_at: DateTime<Utc>,
}

impl PidMetadata {
    /// Metadata for the current process.
    pub fn current() -> Self {
        Self {
            owner: get_owner_string(),
            pid: std::process::id(),
            created_at: Utc::now(),
        }
    }

    /// Parse metadata from a PID file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            WardenError::UserError(format!(
                "failed to read pid file '{}': {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            WardenError::UserError(format!(
                "failed to parse pid file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| WardenError::UserError(format!("failed to serialize pid metadata: {}", e)))
    }
}

/// Get the owner string for PID metadata.
pub(crate) fn get_owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
