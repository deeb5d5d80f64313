//! Implementation of the `warden check-command` command.

use crate::cli::CheckCommandArgs;
use crate::error::Result;
use crate::security::{CommandPolicy, validate_command};

/// Run one command line through the allow-list.
///
/// Prints `allowed` on success. A denial surfaces as `ValidationDenied`,
/// which exits with code 2.
pub fn cmd_check_command(args: CheckCommandArgs) -> Result<()> {
    let decision = match &args.cwd {
        Some(cwd) => CommandPolicy::default().validate(&args.command, cwd),
        None => validate_command(&args.command),
    };

    decision.into_result()?;
    println!("allowed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WardenError;
    use crate::exit_codes;
    use crate::test_support::DirGuard;
    use serial_test::serial;
    use tempfile::TempDir;

    fn check(command: &str, cwd: &TempDir) -> Result<()> {
        cmd_check_command(CheckCommandArgs {
            command: command.to_string(),
            cwd: Some(cwd.path().to_path_buf()),
        })
    }

    #[test]
    fn test_allowed_command_succeeds() {
        let temp_dir = TempDir::new().unwrap();
        check("ls -la && git status", &temp_dir).unwrap();
    }

    #[test]
    fn test_denied_command_exits_with_validation_code() {
        let temp_dir = TempDir::new().unwrap();
        let err = check("rm -rf /", &temp_dir).unwrap_err();
        assert!(matches!(err, WardenError::ValidationDenied(_)));
        assert_eq!(err.exit_code(), exit_codes::VALIDATION_DENIED);
        assert!(err.to_string().contains("'rm' is not in the allowed commands list"));
    }

    #[test]
    #[serial]
    fn test_defaults_to_the_current_directory() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("start.sh"), "#!/bin/sh\n").unwrap();
        let _guard = DirGuard::new(temp_dir.path());

        cmd_check_command(CheckCommandArgs {
            command: "./start.sh test".to_string(),
            cwd: None,
        })
        .unwrap();
    }
}
