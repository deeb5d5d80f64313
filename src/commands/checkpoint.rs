//! Implementation of the `warden checkpoint` commands.
//!
//! Works directly on a workspace's checkpoint log, so the daemon need not be
//! running. Controllers use `show` and the resolution subcommands; workers
//! use `create` and `wait`. Resolving when nothing is pending is reported,
//! not treated as an error.

use crate::checkpoint::{CheckpointRecord, CheckpointStore, CheckpointType, WaitOutcome};
use crate::cli::{CheckpointAction, CheckpointCommand, CreateArgs, WaitArgs, WorkspaceArgs};
use crate::config::{AUTO_ACCEPT_ENV, SupervisorConfig};
use crate::context::WorkspaceContext;
use crate::error::{Result, WardenError};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Execute a `warden checkpoint` subcommand.
pub async fn cmd_checkpoint(config: &SupervisorConfig, cmd: CheckpointCommand) -> Result<()> {
    let store = open_store(config, &cmd.workspace)?;

    match cmd.action {
        CheckpointAction::Show(args) => {
            if args.all {
                let records = store.records();
                if records.is_empty() {
                    println!("No checkpoints recorded.");
                }
                for record in &records {
                    println!("{}", summary_line(record));
                }
                return Ok(());
            }
            match store.load_pending() {
                Some(record) => print!("{}", render_pending(&record)?),
                None => println!("No pending checkpoint."),
            }
            Ok(())
        }
        CheckpointAction::Approve(args) => report("Approved", store.approve(args.notes)?),
        CheckpointAction::Reject(args) => report("Rejected", store.reject(args.reason)?),
        CheckpointAction::Skip(args) => report("Skipped", store.skip(args.notes)?),
        CheckpointAction::Modify(args) => {
            let modifications = parse_json("--modifications", &args.modifications)?;
            report("Modified", store.modify(modifications, args.notes)?)
        }
        CheckpointAction::AutoApprove => report("Auto-approved", store.auto_approve()?),
        CheckpointAction::Create(args) => {
            let record = create(&store, args)?;
            println!("{}", record.checkpoint_id);
            Ok(())
        }
        CheckpointAction::Wait(args) => {
            let auto_accept = std::env::var(AUTO_ACCEPT_ENV).is_ok_and(|v| v == "1");
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            let interrupt = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });
            let result = wait(&store, &args, auto_accept, &cancel).await;
            interrupt.abort();
            result
        }
    }
}

fn parse_json(flag: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text)
        .map_err(|e| WardenError::UserError(format!("{} is not valid JSON: {}", flag, e)))
}

fn create(store: &CheckpointStore, args: CreateArgs) -> Result<CheckpointRecord> {
    let context = match args.context {
        None => Map::new(),
        Some(text) => match parse_json("--context", &text)? {
            Value::Object(map) => map,
            _ => {
                return Err(WardenError::UserError(
                    "--context must be a JSON object".to_string(),
                ));
            }
        },
    };
    let checkpoint_type = CheckpointType::from(args.checkpoint_type);
    store.create(checkpoint_type, context, args.issue)
}

/// Block until the checkpoint is resolved. A rejection is an error so the
/// worker script sees a non-zero exit.
async fn wait(
    store: &CheckpointStore,
    args: &WaitArgs,
    auto_accept: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    if auto_accept
        && store
            .load_pending()
            .is_some_and(|p| p.checkpoint_id == args.checkpoint_id)
    {
        store.auto_approve()?;
    }

    let interval = Duration::from_millis(args.interval_ms.max(1));
    match store
        .wait_for_decision(&args.checkpoint_id, interval, cancel)
        .await
    {
        WaitOutcome::Proceed(Some(record)) => {
            println!("{}", record.status.as_str());
            Ok(())
        }
        WaitOutcome::Proceed(None) => {
            println!("approved");
            Ok(())
        }
        WaitOutcome::Rejected(record) => Err(WardenError::UserError(format!(
            "checkpoint {} was rejected: {}",
            record.checkpoint_id,
            record.human_notes.as_deref().unwrap_or("no reason given")
        ))),
        WaitOutcome::Cancelled => Err(WardenError::UserError(format!(
            "stopped waiting for checkpoint {}",
            args.checkpoint_id
        ))),
    }
}

fn open_store(config: &SupervisorConfig, workspace: &WorkspaceArgs) -> Result<CheckpointStore> {
    let missing = |flag: &str| {
        WardenError::UserError(format!("--{} is required to locate the checkpoint log", flag))
    };
    let project_dir = workspace
        .project_dir
        .as_deref()
        .ok_or_else(|| missing("project-dir"))?;
    let spec_slug = workspace.spec_slug.as_deref().ok_or_else(|| missing("spec-slug"))?;
    let spec_hash = workspace.spec_hash.as_deref().ok_or_else(|| missing("spec-hash"))?;

    let ctx = WorkspaceContext::new(project_dir, &config.agent_dir_name, spec_slug, spec_hash);
    Ok(CheckpointStore::for_workspace(&ctx))
}

fn report(verb: &str, resolved: Option<CheckpointRecord>) -> Result<()> {
    match resolved {
        Some(record) => println!(
            "{} checkpoint {} ({})",
            verb,
            record.checkpoint_id,
            record.checkpoint_type.title()
        ),
        None => println!("No pending checkpoint; nothing to resolve."),
    }
    Ok(())
}

fn summary_line(record: &CheckpointRecord) -> String {
    format!(
        "{}  {:<22} {:<9} {}  [{}]",
        record.checkpoint_id,
        record.checkpoint_type.as_str(),
        record.status.as_str(),
        record.created_at.format("%Y-%m-%d %H:%M:%S"),
        record.group_key()
    )
}

fn render_pending(record: &CheckpointRecord) -> Result<String> {
    let context = serde_json::to_string_pretty(&record.context)
        .map_err(|e| WardenError::UserError(format!("failed to render context: {}", e)))?;

    let mut out = String::new();
    out.push_str(&format!("Checkpoint: {}\n", record.checkpoint_type.title()));
    out.push_str(&format!("ID:         {}\n", record.checkpoint_id));
    out.push_str(&format!(
        "Created:    {}\n",
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(issue) = &record.issue_iid {
        out.push_str(&format!("Issue:      {}\n", issue));
    }
    out.push_str("\nContext:\n");
    out.push_str(&context);
    out.push('\n');
    Ok(out)
}
