//! File-backed checkpoint log.
//!
//! The log is one JSON object mapping a group key (`issue_iid` or `global`)
//! to the records filed under it. Every write rewrites the whole file
//! through [`crate::fs::atomic_write`], so a concurrent reader sees either the
//! old or the new file and never a partial one.

use super::types::{
    CheckpointRecord, CheckpointStatus, CheckpointType, Resolution,
};
use crate::context::WorkspaceContext;
use crate::error::{Result, WardenError};
use crate::fs::atomic_write;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Parsed contents of the checkpoint log file.
pub type CheckpointLog = BTreeMap<String, Vec<CheckpointRecord>>;

/// Handle on one workspace's checkpoint log.
///
/// Holds no cached state: every call reads the file afresh, since a
/// controller in another process may have resolved a checkpoint since.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_workspace(ctx: &WorkspaceContext) -> Self {
        Self::new(&ctx.checkpoint_log_path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Raw log access
    // =========================================================================

    /// Read and parse the log. A missing file is an empty log.
    ///
    /// # Returns
    ///
    /// * `Err(WardenError::StateCorrupt)` - The file exists but cannot be read or parsed
    pub fn load_log(&self) -> Result<CheckpointLog> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CheckpointLog::new()),
            Err(e) => {
                return Err(WardenError::StateCorrupt(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        serde_json::from_str(&content)
            .map_err(|e| WardenError::StateCorrupt(format!("{}: {}", self.path.display(), e)))
    }

    /// Like [`Self::load_log`], but a corrupt log reads as empty.
    fn read_log(&self) -> CheckpointLog {
        self.load_log().unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable checkpoint log");
            CheckpointLog::new()
        })
    }

    /// Serialize the log and atomically replace the file.
    pub fn save_log(&self, log: &CheckpointLog) -> Result<()> {
        let json = serde_json::to_vec_pretty(log).map_err(|e| {
            WardenError::UserError(format!("failed to serialize checkpoint log: {}", e))
        })?;
        atomic_write(&self.path, &json)
    }

    /// All records, in no particular order.
    pub fn records(&self) -> Vec<CheckpointRecord> {
        self.read_log().into_values().flatten().collect()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The most recently created record that is not yet completed.
    pub fn load_pending(&self) -> Option<CheckpointRecord> {
        self.records()
            .into_iter()
            .filter(|r| !r.completed)
            .max_by_key(|r| r.created_at)
    }

    pub fn is_pending(&self) -> bool {
        self.load_pending()
            .is_some_and(|r| r.status == CheckpointStatus::Pending)
    }

    pub fn pending_type(&self) -> Option<CheckpointType> {
        self.load_pending()
            .filter(|r| r.status == CheckpointStatus::Pending)
            .map(|r| r.checkpoint_type)
    }

    /// The most recent record of a given type, whatever its status.
    pub fn latest_by_type(&self, checkpoint_type: &CheckpointType) -> Option<CheckpointRecord> {
        self.records()
            .into_iter()
            .filter(|r| &r.checkpoint_type == checkpoint_type)
            .max_by_key(|r| r.created_at)
    }

    /// True only when the latest record of this type was approved.
    pub fn is_type_approved(&self, checkpoint_type: &CheckpointType) -> bool {
        self.latest_by_type(checkpoint_type)
            .is_some_and(|r| r.status == CheckpointStatus::Approved)
    }

    pub fn find(&self, checkpoint_id: &str) -> Option<CheckpointRecord> {
        self.records()
            .into_iter()
            .find(|r| r.checkpoint_id == checkpoint_id)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Append a new pending checkpoint.
    ///
    /// An unresolved checkpoint does not block creation; the new record
    /// becomes the one `load_pending` returns. Refuses to overwrite a log
    /// that exists but cannot be parsed.
    pub fn create(
        &self,
        checkpoint_type: CheckpointType,
        context: Map<String, Value>,
        issue_iid: Option<String>,
    ) -> Result<CheckpointRecord> {
        let mut log = self.load_log()?;

        if let Some(existing) = log.values().flatten().find(|r| !r.completed) {
            tracing::warn!(
                pending_id = %existing.checkpoint_id,
                pending_type = %existing.checkpoint_type,
                new_type = %checkpoint_type,
                "creating checkpoint while another is still pending"
            );
        }

        let record = CheckpointRecord::new(checkpoint_type, context, issue_iid);
        log.entry(record.group_key().to_string())
            .or_default()
            .push(record.clone());
        self.save_log(&log)?;

        tracing::info!(
            checkpoint_id = %record.checkpoint_id,
            checkpoint_type = %record.checkpoint_type,
            "checkpoint created"
        );
        Ok(record)
    }

    /// Resolve the current pending checkpoint.
    ///
    /// Returns `Ok(None)` when nothing is pending; that is a normal no-op.
    /// Otherwise stamps the resolution, marks the record completed and
    /// rewrites the whole log atomically.
    pub fn resolve(&self, resolution: Resolution) -> Result<Option<CheckpointRecord>> {
        if !resolution.status.is_terminal() {
            return Err(WardenError::InvalidRequest(
                "a checkpoint cannot be resolved to pending".to_string(),
            ));
        }

        let mut log = self.read_log();
        let Some(pending_id) = log
            .values()
            .flatten()
            .filter(|r| !r.completed && r.status == CheckpointStatus::Pending)
            .max_by_key(|r| r.created_at)
            .map(|r| r.checkpoint_id.clone())
        else {
            return Ok(None);
        };

        let Some(record) = log
            .values_mut()
            .flatten()
            .find(|r| r.checkpoint_id == pending_id)
        else {
            return Ok(None);
        };

        let now = Utc::now();
        record.status = resolution.status;
        record.resolved_at = Some(now);
        record.human_decision = resolution.decision;
        record.human_notes = resolution.notes;
        record.modifications = resolution.modifications;
        record.completed = true;
        record.completed_at = Some(now);
        let resolved = record.clone();

        self.save_log(&log)?;

        tracing::info!(
            checkpoint_id = %resolved.checkpoint_id,
            status = %resolved.status,
            "checkpoint resolved"
        );
        Ok(Some(resolved))
    }

    pub fn approve(&self, notes: Option<String>) -> Result<Option<CheckpointRecord>> {
        self.resolve(
            Resolution::new(CheckpointStatus::Approved)
                .decision("approved")
                .maybe_notes(notes),
        )
    }

    pub fn reject(&self, reason: impl Into<String>) -> Result<Option<CheckpointRecord>> {
        self.resolve(
            Resolution::new(CheckpointStatus::Rejected)
                .decision("rejected")
                .notes(reason),
        )
    }

    pub fn skip(&self, notes: Option<String>) -> Result<Option<CheckpointRecord>> {
        self.resolve(
            Resolution::new(CheckpointStatus::Skipped)
                .decision("skipped")
                .maybe_notes(notes),
        )
    }

    /// Approve with a human-edited payload; status becomes `modified`.
    pub fn modify(
        &self,
        modifications: Value,
        notes: Option<String>,
    ) -> Result<Option<CheckpointRecord>> {
        self.resolve(
            Resolution::new(CheckpointStatus::Modified)
                .decision("modified")
                .maybe_notes(notes)
                .modifications(modifications),
        )
    }
}
