//! Automatic approval for agents running with `auto_accept`.

use super::store::CheckpointStore;
use super::types::{CheckpointRecord, CheckpointStatus, CheckpointType, Resolution};
use crate::error::Result;
use serde_json::{Value, json};

impl CheckpointStore {
    /// Approve the pending checkpoint without a human.
    ///
    /// Some checkpoint types carry a recommendation in their context, which
    /// is accepted as the decision. Returns `Ok(None)` when nothing is pending.
    pub fn auto_approve(&self) -> Result<Option<CheckpointRecord>> {
        let Some(pending) = self.load_pending() else {
            return Ok(None);
        };
        if pending.status != CheckpointStatus::Pending {
            return Ok(None);
        }

        let resolution = auto_resolution(&pending);
        let resolved = self.resolve(resolution)?;
        if let Some(record) = &resolved {
            tracing::info!(
                checkpoint_id = %record.checkpoint_id,
                checkpoint_type = %record.checkpoint_type.title(),
                "checkpoint auto-approved"
            );
        }
        Ok(resolved)
    }
}

/// The approval an unattended run gives a checkpoint.
pub(super) fn auto_resolution(record: &CheckpointRecord) -> Resolution {
    let approved = Resolution::new(CheckpointStatus::Approved);

    match &record.checkpoint_type {
        CheckpointType::IssueEnrichment => {
            let selected: Vec<Value> = record
                .context
                .get("all_issues_with_judgments")
                .and_then(Value::as_array)
                .map(|issues| {
                    issues
                        .iter()
                        .filter(|issue| {
                            issue.pointer("/llm_judgment/decision")
                                == Some(&Value::from("needs_enrichment"))
                        })
                        .filter_map(|issue| issue.get("issue_iid"))
                        .filter(|iid| !iid.is_null())
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();

            let notes = if selected.is_empty() {
                "Auto-approved - no issues flagged for enrichment".to_string()
            } else {
                format!(
                    "Auto-approved with {} LLM-recommended issues for enrichment",
                    selected.len()
                )
            };
            approved
                .notes(notes)
                .modifications(json!({ "selected_issue_iids": selected }))
        }
        CheckpointType::RegressionApproval => approved
            .decision("fix_now")
            .notes("Auto-approved with fix_now action"),
        CheckpointType::IssueSelection => {
            match record
                .context
                .get("recommended_issue_iid")
                .filter(|iid| is_truthy(iid))
            {
                Some(iid) => approved
                    .notes(format!("Auto-approved recommended issue #{}", display_value(iid)))
                    .modifications(json!({ "selected_issue_iid": iid })),
                None => approved.notes("Auto-approved"),
            }
        }
        _ => approved.notes("Auto-approved"),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Strings without their JSON quotes, everything else as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
