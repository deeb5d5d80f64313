//! Per-workspace path resolution.
//!
//! Every agent run and every checkpoint log belongs to a workspace directory
//! inside the target project:
//!
//! ```text
//! <project_dir>/<agent_dir_name>/<spec_slug>-<spec_hash>/
//!     logs/<agent_id>-YYYYmmdd-HHMMSS.log
//!     .checkpoint_log.json
//! ```
//!
//! The supervisor and the checkpoint CLI both resolve paths here so workers
//! and controllers agree on where shared state lives.

use crate::config::{AgentConfig, DEFAULT_SLUG, DEFAULT_SPEC_HASH};
use crate::error::{Result, WardenError};
use std::path::{Path, PathBuf};

/// File name of the checkpoint log inside a workspace directory.
pub const CHECKPOINT_LOG_FILE: &str = ".checkpoint_log.json";

/// Name of the per-run log directory inside a workspace directory.
pub const LOGS_DIR: &str = "logs";

/// Resolved paths for one workspace. All paths derive from `project_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceContext {
    /// The project the worker operates on.
    pub project_dir: PathBuf,

    /// `{project_dir}/{agent_dir_name}/{slug}-{hash}/`.
    pub state_dir: PathBuf,

    /// `{state_dir}/logs/`.
    pub logs_dir: PathBuf,

    /// `{state_dir}/.checkpoint_log.json`.
    pub checkpoint_log_path: PathBuf,
}

impl WorkspaceContext {
    /// Resolve workspace paths from explicit components.
    pub fn new(project_dir: &Path, agent_dir_name: &str, spec_slug: &str, spec_hash: &str) -> Self {
        let state_dir = project_dir
            .join(agent_dir_name)
            .join(format!("{}-{}", spec_slug, spec_hash));
        let logs_dir = state_dir.join(LOGS_DIR);
        let checkpoint_log_path = state_dir.join(CHECKPOINT_LOG_FILE);

        Self {
            project_dir: project_dir.to_path_buf(),
            state_dir,
            logs_dir,
            checkpoint_log_path,
        }
    }

    /// Resolve the workspace an agent config points at.
    ///
    /// Missing slug or hash fall back to placeholders so logs always have a
    /// home. Fails when the config has no `project_dir`.
    pub fn for_agent(config: &AgentConfig, agent_dir_name: &str) -> Result<Self> {
        let project_dir = config.project_dir.as_deref().ok_or_else(|| {
            WardenError::InvalidRequest("config.project_dir is required".to_string())
        })?;
        Ok(Self::new(
            project_dir,
            agent_dir_name,
            config.spec_slug.as_deref().unwrap_or(DEFAULT_SLUG),
            config.spec_hash.as_deref().unwrap_or(DEFAULT_SPEC_HASH),
        ))
    }

    /// Create the logs directory (and the state directory above it).
    pub fn ensure_logs_dir(&self) -> Result<&Path> {
        std::fs::create_dir_all(&self.logs_dir).map_err(|e| {
            WardenError::UserError(format!(
                "failed to create logs directory '{}': {}",
                self.logs_dir.display(),
                e
            ))
        })?;
        Ok(&self.logs_dir)
    }
}
