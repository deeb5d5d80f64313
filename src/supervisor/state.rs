//! State file persistence and startup recovery.

use super::record::{AgentRecord, AgentStatus};
use crate::error::{Result, WardenError};
use crate::fs::atomic_write;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// On-disk shape of the state file: `{"agents": {<id>: AgentRecord}}`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub agents: BTreeMap<String, AgentRecord>,
}

/// What startup recovery did to the persisted state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Records kept.
    pub loaded: usize,

    /// Records that claimed a live process and were marked stopped.
    pub reclassified: Vec<String>,

    /// Records dropped because their spec file no longer exists.
    pub dropped: Vec<String>,

    /// The state file existed but could not be parsed.
    pub corrupt: bool,
}

impl RecoveryReport {
    /// Whether the cleaned state differs from what was on disk.
    pub fn changed(&self) -> bool {
        !self.reclassified.is_empty() || !self.dropped.is_empty()
    }
}

/// Atomically rewrite the state file.
pub fn save_state(path: &Path, agents: &BTreeMap<String, AgentRecord>) -> Result<()> {
    #[derive(Serialize)]
    struct View<'a> {
        agents: &'a BTreeMap<String, AgentRecord>,
    }

    let json = serde_json::to_vec_pretty(&View { agents })
        .map_err(|e| WardenError::UserError(format!("failed to serialize state: {}", e)))?;
    atomic_write(path, &json)
}

/// Read the state file. A missing file is empty state.
pub fn read_state(path: &Path) -> Result<PersistedState> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(PersistedState::default());
        }
        Err(e) => {
            return Err(WardenError::StateCorrupt(format!("{}: {}", path.display(), e)));
        }
    };

    serde_json::from_str(&content)
        .map_err(|e| WardenError::StateCorrupt(format!("{}: {}", path.display(), e)))
}

/// Load persisted agents and repair them for a fresh supervisor.
///
/// - A corrupt file is logged and treated as empty.
/// - `running`/`starting` records become `stopped`: their processes died
///   with the previous supervisor.
/// - Records whose `spec_file` is gone are dropped.
pub fn recover_state(path: &Path) -> (BTreeMap<String, AgentRecord>, RecoveryReport) {
    let mut report = RecoveryReport::default();

    let state = match read_state(path) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!(error = %e, "starting with empty agent state");
            report.corrupt = true;
            PersistedState::default()
        }
    };

    let now = Utc::now();
    let mut agents = BTreeMap::new();
    for (agent_id, mut record) in state.agents {
        if let Some(spec_file) = &record.config.spec_file
            && !spec_file.exists()
        {
            tracing::info!(
                agent_id = %agent_id,
                spec_file = %spec_file.display(),
                "dropping agent whose spec file no longer exists"
            );
            report.dropped.push(agent_id);
            continue;
        }

        if record.status.is_live() {
            record.status = AgentStatus::Stopped;
            record.stopped_at.get_or_insert(now);
            report.reclassified.push(agent_id.clone());
        }

        // The map key is authoritative.
        record.agent_id = agent_id.clone();
        agents.insert(agent_id, record);
    }

    report.loaded = agents.len();
    (agents, report)
}
