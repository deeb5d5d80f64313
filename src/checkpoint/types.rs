//! Checkpoint types and their on-disk representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Group key for checkpoints not tied to an issue.
pub const GLOBAL_GROUP: &str = "global";

/// Kind of approval gate.
///
/// Known kinds drive type-specific auto-approval. Any other label is kept
/// verbatim as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CheckpointType {
    ProjectVerification,
    SpecToIssues,
    IssueEnrichment,
    RegressionApproval,
    IssueSelection,
    IssueClosure,
    MrPhaseTransition,
    MrReview,
    Custom(String),
}

impl CheckpointType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ProjectVerification => "project_verification",
            Self::SpecToIssues => "spec_to_issues",
            Self::IssueEnrichment => "issue_enrichment",
            Self::RegressionApproval => "regression_approval",
            Self::IssueSelection => "issue_selection",
            Self::IssueClosure => "issue_closure",
            Self::MrPhaseTransition => "mr_phase_transition",
            Self::MrReview => "mr_review",
            Self::Custom(label) => label,
        }
    }

    /// Human-readable title, e.g. "Issue Enrichment".
    pub fn title(&self) -> String {
        self.as_str()
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }
}

impl From<String> for CheckpointType {
    fn from(label: String) -> Self {
        match label.as_str() {
            "project_verification" => Self::ProjectVerification,
            "spec_to_issues" => Self::SpecToIssues,
            "issue_enrichment" => Self::IssueEnrichment,
            "regression_approval" => Self::RegressionApproval,
            "issue_selection" => Self::IssueSelection,
            "issue_closure" => Self::IssueClosure,
            "mr_phase_transition" => Self::MrPhaseTransition,
            "mr_review" => Self::MrReview,
            _ => Self::Custom(label),
        }
    }
}

impl From<CheckpointType> for String {
    fn from(kind: CheckpointType) -> Self {
        match kind {
            CheckpointType::Custom(label) => label,
            other => other.as_str().to_string(),
        }
    }
}

impl FromStr for CheckpointType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl fmt::Display for CheckpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution state of a checkpoint. Everything but `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Modified,
    Skipped,
}

impl CheckpointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Modified => "modified",
            Self::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for CheckpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One human-approval gate.
///
/// Appended when a worker raises the gate, resolved exactly once, never
/// deleted. Fields written by newer versions survive rewrites via `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub checkpoint_id: String,

    pub checkpoint_type: CheckpointType,

    #[serde(default)]
    pub status: CheckpointStatus,

    /// What is being approved, as supplied by the worker.
    #[serde(default)]
    pub context: Map<String, Value>,

    #[serde(default)]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub human_decision: Option<String>,

    #[serde(default)]
    pub human_notes: Option<String>,

    #[serde(default)]
    pub modifications: Option<Value>,

    /// Mirrors `status != pending`; older readers scan this flag.
    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    /// Issue this gate belongs to; `None` files it under `global`.
    #[serde(default)]
    pub issue_iid: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CheckpointRecord {
    /// A fresh pending record with a new id.
    pub fn new(
        checkpoint_type: CheckpointType,
        context: Map<String, Value>,
        issue_iid: Option<String>,
    ) -> Self {
        Self {
            checkpoint_id: new_checkpoint_id(),
            checkpoint_type,
            status: CheckpointStatus::Pending,
            context,
            created_at: Utc::now(),
            resolved_at: None,
            human_decision: None,
            human_notes: None,
            modifications: None,
            completed: false,
            completed_at: None,
            issue_iid,
            extra: BTreeMap::new(),
        }
    }

    /// Key of the log group this record is filed under.
    pub fn group_key(&self) -> &str {
        self.issue_iid.as_deref().unwrap_or(GLOBAL_GROUP)
    }
}

/// A human (or automatic) decision applied to the pending checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub status: CheckpointStatus,
    pub decision: Option<String>,
    pub notes: Option<String>,
    pub modifications: Option<Value>,
}

impl Resolution {
    pub fn new(status: CheckpointStatus) -> Self {
        Self {
            status,
            decision: None,
            notes: None,
            modifications: None,
        }
    }

    pub fn decision(mut self, decision: impl Into<String>) -> Self {
        self.decision = Some(decision.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn maybe_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn modifications(mut self, modifications: Value) -> Self {
        self.modifications = Some(modifications);
        self
    }
}

/// Outcome of a worker blocking on a checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    /// Approved, modified or skipped. Carries the resolved record when it
    /// was still in the log.
    Proceed(Option<CheckpointRecord>),
    Rejected(CheckpointRecord),
    /// The wait was cancelled before a decision arrived.
    Cancelled,
}

/// Checkpoint ids are the first 13 characters of a UUIDv4 (`xxxxxxxx-xxxx`).
fn new_checkpoint_id() -> String {
    let mut id = uuid::Uuid::new_v4().to_string();
    id.truncate(13);
    id
}
