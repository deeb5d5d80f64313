//! Tests for config functionality.

use crate::config::{AgentConfig, SupervisorConfig};
use crate::error::WardenError;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = SupervisorConfig::default();

    assert!(config.socket_path.ends_with("warden.sock"));
    assert!(config.pid_path.ends_with("warden.pid"));
    assert!(config.state_file.ends_with("warden/state.json"));
    assert_eq!(config.worker_command, "warden-worker");
    assert!(config.worker_environment.is_empty());
    assert_eq!(config.agent_dir_name, ".warden");
    assert_eq!(config.default_target_branch, "main");
    assert_eq!(config.stop_grace_seconds, 5);
    assert_eq!(config.monitor_poll_ms, 1000);
    assert_eq!(config.stop_grace(), Duration::from_secs(5));
    assert_eq!(config.monitor_poll(), Duration::from_secs(1));
}

#[test]
fn test_parse_minimal_yaml() {
    let config = SupervisorConfig::from_yaml("").unwrap();

    // Should use all defaults
    assert_eq!(config.stop_grace_seconds, 5);
    assert_eq!(config.agent_dir_name, ".warden");
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
stop_grace_seconds: 2
default_target_branch: develop
"#;
    let config = SupervisorConfig::from_yaml(yaml).unwrap();

    assert_eq!(config.stop_grace_seconds, 2);
    assert_eq!(config.default_target_branch, "develop");

    // Unspecified values should use defaults
    assert_eq!(config.monitor_poll_ms, 1000);
    assert_eq!(config.worker_command, "warden-worker");
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
socket_path: /run/warden/ctl.sock
pid_path: /run/warden/warden.pid
state_file: /var/lib/warden/state.json
worker_command: "python -m agent.run"
worker_environment:
  AGENT_MODEL: large
  NO_COLOR: "1"
agent_dir_name: .agents
default_target_branch: trunk
stop_grace_seconds: 10
monitor_poll_ms: 250
"#;
    let config = SupervisorConfig::from_yaml(yaml).unwrap();

    assert_eq!(config.socket_path, PathBuf::from("/run/warden/ctl.sock"));
    assert_eq!(config.pid_path, PathBuf::from("/run/warden/warden.pid"));
    assert_eq!(config.state_file, PathBuf::from("/var/lib/warden/state.json"));
    assert_eq!(
        config.worker_argv().unwrap(),
        vec!["python", "-m", "agent.run"]
    );
    assert_eq!(config.worker_environment.get("AGENT_MODEL").unwrap(), "large");
    assert_eq!(config.worker_environment.get("NO_COLOR").unwrap(), "1");
    assert_eq!(config.agent_dir_name, ".agents");
    assert_eq!(config.default_target_branch, "trunk");
    assert_eq!(config.stop_grace_seconds, 10);
    assert_eq!(config.monitor_poll_ms, 250);
}

#[test]
fn test_parse_yaml_with_unknown_fields() {
    let yaml = r#"
stop_grace_seconds: 3
future_feature: true
nested_future:
  key: value
"#;
    let config = SupervisorConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.stop_grace_seconds, 3);
}

#[test]
fn test_validate_zero_grace_period() {
    let err = SupervisorConfig::from_yaml("stop_grace_seconds: 0").unwrap_err();
    assert!(matches!(err, WardenError::UserError(_)));
    assert!(err.to_string().contains("stop_grace_seconds"));
}

#[test]
fn test_validate_zero_poll_interval() {
    let err = SupervisorConfig::from_yaml("monitor_poll_ms: 0").unwrap_err();
    assert!(err.to_string().contains("monitor_poll_ms"));
}

#[test]
fn test_validate_empty_worker_command() {
    let err = SupervisorConfig::from_yaml("worker_command: \"   \"").unwrap_err();
    assert!(err.to_string().contains("worker_command must not be empty"));
}

#[test]
fn test_validate_unparseable_worker_command() {
    let err = SupervisorConfig::from_yaml("worker_command: \"run 'oops\"").unwrap_err();
    assert!(err.to_string().contains("could not be parsed"));
}

#[test]
fn test_validate_agent_dir_name_must_be_single_component() {
    let err = SupervisorConfig::from_yaml("agent_dir_name: a/b").unwrap_err();
    assert!(err.to_string().contains("agent_dir_name"));
}

#[test]
fn test_to_yaml_round_trips_values() {
    let mut config = SupervisorConfig::default();
    config.stop_grace_seconds = 9;
    config
        .worker_environment
        .insert("KEY".to_string(), "value".to_string());

    let parsed = SupervisorConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
    assert_eq!(parsed.stop_grace_seconds, 9);
    assert_eq!(parsed.worker_environment.get("KEY").unwrap(), "value");
}

#[test]
fn test_config_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("warden.yaml");
    std::fs::write(&path, "monitor_poll_ms: 50\n").unwrap();

    let config = SupervisorConfig::load(&path).unwrap();
    assert_eq!(config.monitor_poll_ms, 50);
}

#[test]
fn test_config_load_missing_file() {
    let result = SupervisorConfig::load("/nonexistent/path/warden.yaml");
    assert!(matches!(result, Err(WardenError::UserError(_))));
}

#[test]
fn test_load_or_default_falls_back_when_absent() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.yaml");

    let config = SupervisorConfig::load_or_default(Some(&missing)).unwrap();
    assert_eq!(config.stop_grace_seconds, 5);

    let config = SupervisorConfig::load_or_default(None).unwrap();
    assert_eq!(config.monitor_poll_ms, 1000);
}

// =========================================================================
// AgentConfig
// =========================================================================

#[test]
fn test_agent_config_parses_known_fields() {
    let value = serde_json::json!({
        "spec_file": "/work/spec.md",
        "project_dir": "/work",
        "target_branch": "feature",
        "max_iterations": 7,
        "auto_accept": true,
        "spec_slug": "todo-app",
        "spec_hash": "ab12c"
    });
    let config = AgentConfig::from_value(value).unwrap();

    assert_eq!(config.spec_file, Some(PathBuf::from("/work/spec.md")));
    assert_eq!(config.project_dir, Some(PathBuf::from("/work")));
    assert_eq!(config.target_branch.as_deref(), Some("feature"));
    assert_eq!(config.max_iterations, Some(7));
    assert!(config.auto_accept);
    assert_eq!(config.spec_slug.as_deref(), Some("todo-app"));
    assert_eq!(config.spec_hash.as_deref(), Some("ab12c"));
}

#[test]
fn test_agent_config_rejects_unknown_fields() {
    let value = serde_json::json!({ "spec_file": "/x", "spec_flie": "/typo" });
    let err = AgentConfig::from_value(value).unwrap_err();
    assert!(matches!(err, WardenError::InvalidRequest(_)));
    assert!(err.to_string().contains("spec_flie"));
}

#[test]
fn test_agent_config_rejects_wrong_types() {
    let value = serde_json::json!({ "max_iterations": "ten" });
    assert!(AgentConfig::from_value(value).is_err());
}

#[test]
fn test_agent_config_empty_object_is_valid() {
    let config = AgentConfig::from_value(serde_json::json!({})).unwrap();
    assert_eq!(config, AgentConfig::default());
}

#[test]
fn test_require_launch_paths() {
    let mut config = AgentConfig::default();
    let err = config.require_launch_paths().unwrap_err();
    assert!(err.to_string().contains("spec_file"));

    config.spec_file = Some(PathBuf::from("/spec.md"));
    let err = config.require_launch_paths().unwrap_err();
    assert!(err.to_string().contains("project_dir"));

    config.project_dir = Some(PathBuf::from("/proj"));
    let (spec, project) = config.require_launch_paths().unwrap();
    assert_eq!(spec, &PathBuf::from("/spec.md"));
    assert_eq!(project, &PathBuf::from("/proj"));
}

#[test]
fn test_agent_config_serialization_omits_unset_fields() {
    let config = AgentConfig {
        spec_file: Some(PathBuf::from("/spec.md")),
        ..Default::default()
    };
    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "spec_file": "/spec.md", "auto_accept": false })
    );
}
