//! PID file acquisition and liveness checks.

use super::guard::PidFileGuard;
use super::metadata::PidMetadata;
use crate::error::{Result, WardenError};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Whether a process with this PID exists.
///
/// A process owned by another user still counts as alive.
pub fn is_process_alive(pid: u32) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    matches!(kill(Pid::from_raw(raw), None), Ok(()) | Err(Errno::EPERM))
}

/// Read the PID recorded in a PID file, if the file exists and parses.
pub fn read_pid(path: &Path) -> Option<u32> {
    PidMetadata::from_file(path).ok().map(|meta| meta.pid)
}

/// Write the PID file for the current process.
///
/// Fails when the file names a live process. A stale file (dead process or
/// unreadable contents) is replaced.
///
/// # Returns
///
/// * `Ok(PidFileGuard)` - The file is ours until the guard drops
/// * `Err(WardenError::UserError)` - Another daemon is running, or I/O failed
pub fn acquire_pid_file(path: &Path) -> Result<PidFileGuard> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            WardenError::UserError(format!(
                "failed to create pid directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    match create_exclusive(path) {
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            if let Some(pid) = read_pid(path)
                && is_process_alive(pid)
            {
                return Err(WardenError::UserError(format!(
                    "daemon already running (pid {}, pid file '{}')",
                    pid,
                    path.display()
                )));
            }
            tracing::warn!(path = %path.display(), "replacing stale pid file");
            fs::remove_file(path).map_err(|e| io_error(path, e))?;
            create_exclusive(path).map_err(|e| io_error(path, e))?;
        }
        Err(e) => return Err(io_error(path, e)),
        Ok(()) => {}
    }

    Ok(PidFileGuard::new(path.to_path_buf()))
}

fn create_exclusive(path: &Path) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;

    let json = PidMetadata::current()
        .to_json()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let written = file.write_all(json.as_bytes()).and_then(|_| file.sync_all());
    if written.is_err() {
        let _ = fs::remove_file(path);
    }
    written
}

fn io_error(path: &Path, e: std::io::Error) -> WardenError {
    WardenError::UserError(format!(
        "failed to write pid file '{}': {}",
        path.display(),
        e
    ))
}
