//! Tests for the command security validator.

use super::*;
use crate::error::WardenError;
use crate::test_support::DirGuard;
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

fn check(command: &str) -> ValidationDecision {
    let dir = TempDir::new().unwrap();
    CommandPolicy::default().validate(command, dir.path())
}

fn assert_allowed(command: &str) {
    let decision = check(command);
    assert!(decision.is_allowed(), "expected allow for {:?}, got {}", command, decision);
}

fn assert_denied(command: &str, reason_fragment: &str) {
    let decision = check(command);
    let reason = decision
        .reason()
        .unwrap_or_else(|| panic!("expected deny for {:?}", command));
    assert!(
        reason.contains(reason_fragment),
        "reason for {:?} was {:?}, expected it to contain {:?}",
        command,
        reason,
        reason_fragment
    );
}

// =========================================================================
// Reference decisions
// =========================================================================

#[test]
fn test_plain_listing_is_allowed() {
    assert_allowed("ls -la");
}

#[test]
fn test_command_substitution_is_denied() {
    assert_denied("echo $(whoami)", "substitutions");
    assert_denied("echo `whoami`", "substitutions");
    assert_denied("cat <(ls)", "substitutions");
}

#[test]
fn test_command_outside_allow_list_is_denied() {
    assert_denied("rm -rf /", "'rm' is not in the allowed commands list");
}

#[test]
fn test_chmod_execute_is_allowed() {
    assert_allowed("chmod +x start.sh");
    assert_allowed("chmod u+x init.sh start.sh");
}

#[test]
fn test_chmod_recursive_is_denied() {
    assert_denied("chmod -R +x .", "chmod flags are not allowed");
}

#[test]
fn test_chmod_non_execute_modes_are_denied() {
    assert_denied("chmod 777 start.sh", "only allowed with +x");
    assert_denied("chmod +w start.sh", "only allowed with +x");
    assert_denied("chmod +x", "requires at least one file");
}

#[test]
fn test_pkill_full_command_line_resolves_to_process_name() {
    assert_allowed("pkill -f 'node server.js'");
    assert_allowed("pkill vite");
}

#[test]
fn test_pkill_unknown_process_is_denied() {
    assert_denied("pkill -9 evil", "pkill only allowed for dev processes");
    assert_denied("pkill -f", "requires a process name");
}

#[test]
fn test_start_script_with_known_subcommand_is_allowed() {
    assert_allowed("./start.sh dev");
    assert_allowed("./start.sh");
    assert_allowed("./init.sh");
}

#[test]
fn test_start_script_path_escape_is_denied() {
    assert_denied("./../start.sh", "Script must be start.sh");
    assert_denied("/tmp/start.sh dev", "Script must be start.sh");
    assert_denied("start.sh dev", "Only ./start.sh is allowed");
}

#[test]
fn test_start_script_unknown_subcommand_is_denied() {
    assert_denied("./start.sh deploy", "subcommand 'deploy' not allowed");
}

// =========================================================================
// Script argument screening
// =========================================================================

#[test]
fn test_script_arguments_with_traversal_are_denied() {
    assert_denied("./init.sh ../../etc/passwd", "path traversal");
}

#[test]
fn test_script_arguments_with_metacharacters_are_denied() {
    assert_denied("./init.sh 'a>b'", "dangerous character");
    assert_denied(r#"./init.sh "a\\b""#, "dangerous character");
}

#[test]
fn test_script_arguments_with_odd_quote_count_are_denied() {
    assert_denied(r#"./init.sh "it's""#, "unbalanced quotes");
}

#[test]
fn test_script_argument_limits() {
    let many = vec!["x"; 51].join(" ");
    assert_denied(&format!("./init.sh {}", many), "too many arguments");

    let long = "a".repeat(1001);
    assert_denied(&format!("./init.sh {}", long), "exceeds maximum length");

    let at_limit = "a".repeat(1000);
    assert_allowed(&format!("./init.sh {}", at_limit));
}

#[cfg(unix)]
#[test]
fn test_symlinked_script_escaping_cwd_is_denied() {
    let outside = TempDir::new().unwrap();
    let target = outside.path().join("evil.sh");
    fs::write(&target, "#!/bin/sh\n").unwrap();

    let cwd = TempDir::new().unwrap();
    std::os::unix::fs::symlink(&target, cwd.path().join("start.sh")).unwrap();

    let decision = CommandPolicy::default().validate("./start.sh dev", cwd.path());
    assert!(
        decision
            .reason()
            .unwrap()
            .contains("resolves outside current directory")
    );
}

#[test]
fn test_real_script_inside_cwd_is_allowed() {
    let cwd = TempDir::new().unwrap();
    fs::write(cwd.path().join("start.sh"), "#!/bin/sh\n").unwrap();

    let decision = CommandPolicy::default().validate("./start.sh build", cwd.path());
    assert!(decision.is_allowed());
}

// =========================================================================
// Compound commands and parsing
// =========================================================================

#[test]
fn test_every_segment_is_checked() {
    assert_allowed("ls && cat a.txt; pwd");
    assert_denied("ls && curl http://x", "'curl' is not in the allowed commands list");
    assert_denied("ls || rm x", "'rm'");
}

#[test]
fn test_pipeline_stages_are_checked() {
    assert_allowed("ps aux | grep node");
    assert_denied("cat a | sh", "'sh'");
}

#[test]
fn test_unspaced_pipe_and_background_do_not_hide_a_command() {
    assert_denied("ls |rm -rf /", "'rm'");
    assert_denied("ls &rm x", "'rm'");
    assert_denied("ls|rm x", "'rm'");
    assert_denied("echo hi |bash", "'bash'");
}

#[test]
fn test_redirections_keep_the_pipeline_allowed() {
    assert_allowed("npm run dev 2>&1 | tail -n 20");
    assert_allowed("grep 'a|b' notes.txt");
}

#[test]
fn test_pkill_target_is_read_from_its_own_command() {
    assert_denied("pkill bash | echo node", "pkill only allowed for dev processes");
    assert_denied("pkill evil | pkill node", "pkill only allowed for dev processes");
    assert_allowed("pkill node | echo done");
}

#[test]
fn test_chmod_is_checked_within_its_own_command() {
    assert_denied("echo x | chmod -R +x .", "chmod flags are not allowed");
    assert_allowed("echo x | chmod +x a.sh");
}

#[test]
fn test_newline_separated_command_is_checked() {
    assert_denied("ls\nrm -rf /", "'rm'");
}

#[test]
fn test_every_occurrence_of_sensitive_command_is_checked() {
    assert_denied("pkill node; pkill evil", "pkill only allowed for dev processes");
    assert_denied("chmod +x a.sh && chmod 777 b.sh", "only allowed with +x");
}

#[test]
fn test_quoted_delimiter_does_not_hide_a_command() {
    assert_allowed("echo 'rm -rf /; ls'");
}

#[test]
fn test_unbalanced_quotes_fail_closed() {
    assert_denied("echo 'oops", "Could not parse command");
}

#[test]
fn test_null_byte_and_length_limit() {
    assert_denied("ls\0", "invalid characters");
    let long = format!("echo {}", "a".repeat(MAX_COMMAND_LENGTH));
    assert_denied(&long, "exceeds length limit");
}

#[test]
fn test_empty_command_is_denied() {
    assert_denied("", "Empty command");
    assert_denied("   ;  ", "Empty command");
}

#[test]
fn test_absolute_path_to_allowed_binary_is_allowed() {
    assert_allowed("/usr/bin/node server.js");
}

#[test]
fn test_validation_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let policy = CommandPolicy::default();
    for command in ["ls -la", "rm -rf /", "./start.sh dev", "pkill -9 evil"] {
        assert_eq!(
            policy.validate(command, dir.path()),
            policy.validate(command, dir.path())
        );
    }
}

#[test]
fn test_custom_policy_extends_allow_list() {
    let dir = TempDir::new().unwrap();
    let mut policy = CommandPolicy::default();
    assert!(!policy.validate("cargo test", dir.path()).is_allowed());

    policy.allowed_commands.insert("cargo".to_string());
    assert!(policy.validate("cargo test", dir.path()).is_allowed());
}

#[test]
fn test_denial_maps_to_validation_error() {
    let err = check("rm -rf /").into_result().unwrap_err();
    assert!(matches!(err, WardenError::ValidationDenied(_)));
    assert!(check("ls").into_result().is_ok());
}

// =========================================================================
// Process working directory
// =========================================================================

#[cfg(unix)]
#[test]
#[serial]
fn test_validate_command_resolves_scripts_against_current_dir() {
    let outside = TempDir::new().unwrap();
    let target = outside.path().join("evil.sh");
    fs::write(&target, "#!/bin/sh\n").unwrap();

    let cwd = TempDir::new().unwrap();
    fs::write(cwd.path().join("init.sh"), "#!/bin/sh\n").unwrap();
    std::os::unix::fs::symlink(&target, cwd.path().join("start.sh")).unwrap();
    let _guard = DirGuard::new(cwd.path());

    assert!(validate_command("./init.sh").is_allowed());
    let reason = validate_command("./start.sh dev");
    assert!(
        reason
            .reason()
            .unwrap()
            .contains("resolves outside current directory")
    );
}
