//! Per-agent configuration.

use crate::error::{Result, WardenError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for one supervised agent.
///
/// Passed through to the worker invocation. Every field is optional at
/// registration; `start` requires `spec_file` and `project_dir`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_branch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,

    /// Resolve checkpoints without waiting for a human.
    #[serde(default)]
    pub auto_accept: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_slug: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_hash: Option<String>,
}

impl AgentConfig {
    /// Parse a config object received over the wire.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| WardenError::InvalidRequest(format!("Invalid agent config: {}", e)))
    }

    /// The paths a worker cannot run without.
    ///
    /// Fails with `InvalidRequest` naming the first missing field.
    pub fn require_launch_paths(&self) -> Result<(&PathBuf, &PathBuf)> {
        let spec_file = self.spec_file.as_ref().ok_or_else(|| {
            WardenError::InvalidRequest("config.spec_file is required to start an agent".into())
        })?;
        let project_dir = self.project_dir.as_ref().ok_or_else(|| {
            WardenError::InvalidRequest("config.project_dir is required to start an agent".into())
        })?;
        Ok((spec_file, project_dir))
    }
}
