//! RAII PID file guard.

use crate::error::{Result, WardenError};
use std::fs;
use std::path::{Path, PathBuf};

/// RAII guard for the daemon PID file.
///
/// When dropped, the PID file is deleted. If deletion fails, a warning is
/// logged but no panic occurs.
#[derive(Debug)]
pub struct PidFileGuard {
    path: PathBuf,

    /// Whether the file has been released manually.
    released: bool,
}

impl PidFileGuard {
    pub(super) fn new(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the PID file now, reporting failures.
    ///
    /// A file that is already gone counts as released.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WardenError::UserError(format!(
                "failed to remove pid file '{}': {}",
                self.path.display(),
                e
            ))),
        }
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove pid file");
        }
    }
}
