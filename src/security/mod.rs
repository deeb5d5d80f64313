//! Shell command security validator.
//!
//! Decides whether a worker may execute a shell command string using a strict
//! allow-list. Anything the tokenizer cannot reason about is denied:
//!
//! 1. NUL bytes, oversized input and command substitution (`$(`, backticks,
//!    `<(`, `>(`) are refused before parsing
//! 2. The string is split into `;` / `&&` / `||` / newline segments, and each
//!    segment into its `|` / `&` commands (both quote-aware)
//! 3. Every invoked command name must be on the allow-list
//! 4. `pkill`, `chmod`, `./init.sh` and `./start.sh` get a command-specific
//!    validator run against exactly the command that invokes them
//!
//! The validator has no side effects beyond resolving script paths against
//! the working directory it is given.

mod policy;
mod tokenizer;
mod types;
mod validators;

#[cfg(test)]
mod tests;

pub use policy::{CommandPolicy, MAX_COMMAND_LENGTH, SensitiveCommand};
pub use tokenizer::{extract_commands, split_commands, split_segments};
pub use types::ValidationDecision;

use std::path::Path;

const SUBSTITUTION_MARKERS: &[&str] = &["$(", "`", "<(", ">("];

impl CommandPolicy {
    /// Validate `command` as if executed from `cwd`.
    pub fn validate(&self, command: &str, cwd: &Path) -> ValidationDecision {
        if command.contains('\0') || command.len() > MAX_COMMAND_LENGTH {
            return ValidationDecision::deny(
                "Command contains invalid characters or exceeds length limit",
            );
        }
        if SUBSTITUTION_MARKERS.iter().any(|m| command.contains(m)) {
            return ValidationDecision::deny("Command substitutions and subshells are not allowed");
        }

        let segments = split_segments(command);
        if segments.is_empty() {
            return ValidationDecision::deny("Empty command");
        }

        for segment in &segments {
            let invocations = split_commands(segment);
            if invocations.is_empty() {
                return ValidationDecision::deny(format!(
                    "No command found in segment: {}",
                    segment
                ));
            }
            for invocation in &invocations {
                if let Err(reason) = self.check_invocation(invocation, cwd) {
                    return ValidationDecision::deny(reason);
                }
            }
        }

        ValidationDecision::Allow
    }

    /// Check one command of a pipeline against the allow-list and, when it
    /// is sensitive, its deep validator.
    fn check_invocation(&self, invocation: &str, cwd: &Path) -> Result<(), String> {
        let Some(names) = extract_commands(invocation) else {
            return Err(format!(
                "Could not parse command for security validation: {}",
                invocation
            ));
        };
        let [name] = names.as_slice() else {
            return Err(format!("No command found in segment: {}", invocation));
        };

        if !self.is_allowed(name) {
            return Err(format!("Command '{}' is not in the allowed commands list", name));
        }
        match SensitiveCommand::from_name(name) {
            Some(sensitive) => self.check_sensitive(sensitive, invocation, cwd),
            None => Ok(()),
        }
    }

    fn check_sensitive(
        &self,
        command: SensitiveCommand,
        invocation: &str,
        cwd: &Path,
    ) -> Result<(), String> {
        match command {
            SensitiveCommand::Pkill => validators::validate_pkill(invocation, self),
            SensitiveCommand::Chmod => validators::validate_chmod(invocation),
            SensitiveCommand::InitScript => validators::validate_init_script(invocation, cwd),
            SensitiveCommand::StartScript => {
                validators::validate_start_script(invocation, cwd, self)
            }
        }
    }
}

/// Validate `command` with the default policy against the process's
/// current working directory.
pub fn validate_command(command: &str) -> ValidationDecision {
    match std::env::current_dir() {
        Ok(cwd) => CommandPolicy::default().validate(command, &cwd),
        Err(e) => ValidationDecision::deny(format!(
            "Failed to resolve current directory for validation: {}",
            e
        )),
    }
}
