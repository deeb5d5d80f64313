//! Tests for the PID file guard.

use super::*;
use chrono::Utc;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_metadata_for_current_process() {
    let meta = PidMetadata::current();

    assert!(!meta.owner.is_empty());
    assert!(meta.owner.contains('@'));
    assert_eq!(meta.pid, std::process::id());
    assert!(meta.created_at <= Utc::now());
}

#[test]
fn test_acquire_writes_current_pid() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("warden.pid");

    let guard = acquire_pid_file(&path).unwrap();
    assert_eq!(guard.path(), path.as_path());
    assert_eq!(read_pid(&path), Some(std::process::id()));
}

#[test]
fn test_acquire_creates_parent_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("run").join("warden.pid");

    let _guard = acquire_pid_file(&path).unwrap();
    assert!(path.exists());
}

#[test]
fn test_second_acquire_fails_while_live() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("warden.pid");

    let _guard = acquire_pid_file(&path).unwrap();
    let err = acquire_pid_file(&path).unwrap_err();
    assert!(err.to_string().contains("daemon already running"));
}

#[test]
fn test_stale_pid_file_is_replaced() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("warden.pid");

    // A pid that cannot name a live process.
    let stale = serde_json::json!({
        "owner": "ghost@nowhere",
        "pid": i32::MAX as u32,
        "created_at": "2020-01-01T00:00:00Z"
    });
    fs::write(&path, stale.to_string()).unwrap();

    let _guard = acquire_pid_file(&path).unwrap();
    assert_eq!(read_pid(&path), Some(std::process::id()));
}

#[test]
fn test_garbage_pid_file_is_replaced() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("warden.pid");
    fs::write(&path, "not json").unwrap();

    let _guard = acquire_pid_file(&path).unwrap();
    assert_eq!(read_pid(&path), Some(std::process::id()));
}

#[test]
fn test_guard_removes_file_on_drop() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("warden.pid");

    {
        let _guard = acquire_pid_file(&path).unwrap();
        assert!(path.exists());
    }
    assert!(!path.exists());
}

#[test]
fn test_release_tolerates_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("warden.pid");

    let guard = acquire_pid_file(&path).unwrap();
    fs::remove_file(&path).unwrap();
    guard.release().unwrap();
}

#[test]
fn test_read_pid_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    assert_eq!(read_pid(&temp_dir.path().join("none.pid")), None);
}

#[test]
fn test_is_process_alive() {
    assert!(is_process_alive(std::process::id()));
    assert!(!is_process_alive(0));
    assert!(!is_process_alive(i32::MAX as u32));
    assert!(!is_process_alive(u32::MAX));
}
