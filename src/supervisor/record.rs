//! Agent records and lifecycle status.

use crate::config::AgentConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle status of an agent.
///
/// ```text
/// ready -> starting -> running -> stopped -> starting ...
///              \-> failed -> starting ...
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Ready,
    Starting,
    Running,
    Stopped,
    Failed,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }

    /// Whether a process may be attached to a record in this status.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One supervised agent, as persisted in the state file.
///
/// The OS process handle lives beside the record in the supervisor, never
/// in it, so a record can always be cloned and serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_id: String,

    #[serde(default)]
    pub config: AgentConfig,

    pub status: AgentStatus,

    /// Combined stdout/stderr capture of the latest run.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub stopped_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub exit_code: Option<i32>,
}

impl AgentRecord {
    /// A freshly registered agent.
    pub fn new(agent_id: impl Into<String>, config: AgentConfig) -> Self {
        Self {
            agent_id: agent_id.into(),
            config,
            status: AgentStatus::Ready,
            log_path: None,
            started_at: None,
            stopped_at: None,
            exit_code: None,
        }
    }
}
