//! Command-specific deep validators.
//!
//! Each validator receives the single pipeline command that invokes the
//! sensitive program and re-tokenizes it; any parse failure denies.

use super::policy::{CommandPolicy, MAX_SCRIPT_ARG_LENGTH, MAX_SCRIPT_ARGS};
use super::types::CheckResult;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

/// Additive execute modes only: `+x`, `u+x`, `ug+x`, `a+x`, ...
static CHMOD_EXECUTE_MODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ugoa]*\+x$").expect("Invalid chmod mode regex"));

/// Characters that could smuggle extra shell syntax through a script argument.
const DANGEROUS_CHARS: &[char] = &[';', '&', '|', '`', '$', '(', ')', '<', '>', '\n', '\r', '\\'];

fn tokenize(command: &str, what: &str) -> Result<Vec<String>, String> {
    let tokens = shell_words::split(command)
        .map_err(|e| format!("Could not parse {} command: {}", what, e))?;
    if tokens.is_empty() {
        return Err(format!("Empty {} command", what));
    }
    Ok(tokens)
}

/// `pkill` may only target known development-tool processes.
///
/// The target is the last non-flag argument; with `-f` the pattern is a
/// whole command line, so its first word is the process name.
pub fn validate_pkill(command: &str, policy: &CommandPolicy) -> CheckResult {
    let tokens = tokenize(command, "pkill")?;

    let args: Vec<&String> = tokens[1..].iter().filter(|t| !t.starts_with('-')).collect();
    let Some(target) = args.last() else {
        return Err("pkill requires a process name".to_string());
    };

    let process = target.split_whitespace().next().unwrap_or("");
    if policy.killable_processes.contains(process) {
        Ok(())
    } else {
        Err(format!(
            "pkill only allowed for dev processes: {}",
            join(&policy.killable_processes)
        ))
    }
}

/// `chmod` may only add execute permission, without any flags.
pub fn validate_chmod(command: &str) -> CheckResult {
    let tokens = tokenize(command, "chmod")?;
    if tokens[0] != "chmod" {
        return Err("Not a chmod command".to_string());
    }

    let mut mode: Option<&str> = None;
    let mut files = Vec::new();
    for token in &tokens[1..] {
        if token.starts_with('-') {
            return Err("chmod flags are not allowed".to_string());
        }
        if mode.is_none() {
            mode = Some(token.as_str());
        } else {
            files.push(token);
        }
    }

    let Some(mode) = mode else {
        return Err("chmod requires a mode".to_string());
    };
    if files.is_empty() {
        return Err("chmod requires at least one file".to_string());
    }
    if !CHMOD_EXECUTE_MODE.is_match(mode) {
        return Err(format!("chmod only allowed with +x mode, got: {}", mode));
    }

    Ok(())
}

/// `./init.sh` with screened arguments.
pub fn validate_init_script(command: &str, cwd: &Path) -> CheckResult {
    validate_script(command, "init.sh", cwd).map(|_| ())
}

/// `./start.sh [subcommand] ...` with screened arguments.
pub fn validate_start_script(command: &str, cwd: &Path, policy: &CommandPolicy) -> CheckResult {
    let tokens = validate_script(command, "start.sh", cwd)?;

    if let Some(subcommand) = tokens.get(1)
        && !policy.start_subcommands.contains(subcommand)
    {
        return Err(format!(
            "start.sh subcommand '{}' not allowed. Allowed: {}",
            subcommand,
            join(&policy.start_subcommands)
        ));
    }

    Ok(())
}

/// Shared checks for project lifecycle scripts. Returns the tokens on success.
fn validate_script(command: &str, script_name: &str, cwd: &Path) -> Result<Vec<String>, String> {
    let tokens = tokenize(command, script_name)?;
    let script_token = &tokens[0];

    let script_base = script_token.strip_prefix("./").unwrap_or(script_token);
    if script_base != script_name {
        return Err(format!("Script must be {}", script_name));
    }

    let expected = format!("./{}", script_name);
    if *script_token != expected {
        return Err(format!("Only {} is allowed, got: {}", expected, script_token));
    }

    if !is_path_within(cwd, Path::new(script_token)) {
        return Err(format!(
            "Script path resolves outside current directory: {}",
            script_token
        ));
    }

    validate_script_arguments(&tokens[1..])?;
    Ok(tokens)
}

fn validate_script_arguments(args: &[String]) -> CheckResult {
    if args.len() > MAX_SCRIPT_ARGS {
        return Err(format!(
            "Script has too many arguments (max {}, got {})",
            MAX_SCRIPT_ARGS,
            args.len()
        ));
    }

    for arg in args {
        if arg.chars().count() > MAX_SCRIPT_ARG_LENGTH {
            let preview: String = arg.chars().take(50).collect();
            return Err(format!(
                "Script argument exceeds maximum length ({} chars): {}...",
                MAX_SCRIPT_ARG_LENGTH, preview
            ));
        }
        if let Some(c) = arg.chars().find(|c| DANGEROUS_CHARS.contains(c)) {
            return Err(format!(
                "Script argument contains dangerous character {:?}: {}",
                c, arg
            ));
        }
        if arg.contains("../") || arg.contains("/..") {
            return Err(format!("Script argument contains path traversal: {}", arg));
        }
        if arg.matches('\'').count() % 2 != 0 || arg.matches('"').count() % 2 != 0 {
            return Err(format!("Script argument contains unbalanced quotes: {}", arg));
        }
    }

    Ok(())
}

/// Whether `target` (relative to `base`) resolves inside `base`, following
/// symlinks for whatever part of the path exists.
pub fn is_path_within(base: &Path, target: &Path) -> bool {
    let Ok(base) = base.canonicalize() else {
        return false;
    };
    let joined = base.join(target);
    let resolved = match joined.canonicalize() {
        Ok(p) => p,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            // A dangling symlink must not fall through to lexical resolution.
            if joined.symlink_metadata().is_ok() {
                return false;
            }
            normalize_lexically(&joined)
        }
        Err(_) => return false,
    };
    resolved.starts_with(&base)
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn join(items: &std::collections::BTreeSet<String>) -> String {
    items.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
