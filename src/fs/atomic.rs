//! Atomic filesystem writes.
//!
//! Every write of persisted state (the supervisor state file, the checkpoint
//! log) goes through this module so readers in other processes only ever see
//! the complete old file or the complete new file.
//!
//! # Implementation Strategy
//!
//! 1. Write content to a uniquely named temporary file in the target's directory
//! 2. Flush and fsync the temporary file
//! 3. `rename()` it over the target (atomic on POSIX within one filesystem)
//! 4. fsync the parent directory so the new entry survives a power loss
//!
//! Steps 1-2 are exposed separately as [`stage`] so callers (and tests) can
//! observe the window between a fully written temp file and the rename.
//! A process killed inside that window leaves a stray `.{name}.{id}.tmp`
//! behind and the target untouched.

use crate::error::{WardenError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A fully written, fsynced temporary file waiting to replace its target.
///
/// Dropping it without calling [`StagedWrite::commit`] removes the temp file.
#[derive(Debug)]
pub struct StagedWrite {
    temp_path: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedWrite {
    /// Path of the temporary file holding the new content.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Atomically move the staged content over the target.
    pub fn commit(mut self) -> Result<()> {
        self.committed = true;
        atomic_replace(&self.temp_path, &self.target)
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

/// Atomically write bytes to a file.
///
/// Creates the parent directory when it is missing.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    stage(path, content)?.commit()
}

/// Write `content` to a temp file next to `path` without touching `path`.
pub fn stage<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<StagedWrite> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            WardenError::UserError(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, content)?;

    Ok(StagedWrite {
        temp_path,
        target: path.to_path_buf(),
        committed: false,
    })
}

/// Temp files get a random suffix: the worker and a controller may both be
/// rewriting the same checkpoint log.
fn generate_temp_path(target: &Path) -> Result<PathBuf> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| WardenError::UserError("invalid file path".to_string()))?;

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    Ok(parent.join(format!(".{}.{}.tmp", filename, &suffix[..8])))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        WardenError::UserError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content)
        .and_then(|()| file.flush())
        .map_err(|e| {
            let _ = fs::remove_file(path);
            WardenError::UserError(format!("failed to write to temporary file: {}", e))
        })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        WardenError::UserError(format!("failed to sync temporary file to disk: {}", e))
    })?;

    Ok(())
}

fn atomic_replace(source: &Path, target: &Path) -> Result<()> {
    fs::rename(source, target).map_err(|e| {
        let _ = fs::remove_file(source);
        WardenError::UserError(format!(
            "failed to atomically replace '{}': {}",
            target.display(),
            e
        ))
    })?;

    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}
