//! Allow-list policy for worker shell commands.

use std::collections::BTreeSet;

/// Maximum accepted command length, in bytes.
pub const MAX_COMMAND_LENGTH: usize = 10_000;

/// Maximum number of arguments passed to a lifecycle script.
pub const MAX_SCRIPT_ARGS: usize = 50;

/// Maximum length of a single lifecycle script argument, in characters.
pub const MAX_SCRIPT_ARG_LENGTH: usize = 1000;

/// Commands a sandboxed worker may invoke.
const DEFAULT_ALLOWED_COMMANDS: &[&str] = &[
    // File inspection
    "ls", "cat", "head", "tail", "wc", "grep",
    // File operations
    "cp", "mkdir", "chmod",
    // Directory
    "pwd", "cd",
    // Node.js development
    "npm", "node",
    // Version control
    "git", "gh",
    // Process management
    "ps", "lsof", "sleep", "pkill",
    // Project lifecycle scripts
    "init.sh", "start.sh",
    "echo",
];

/// Process names `pkill` may target.
const DEFAULT_KILLABLE_PROCESSES: &[&str] = &["node", "npm", "npx", "vite", "next"];

/// Subcommands accepted by `./start.sh`.
const DEFAULT_START_SUBCOMMANDS: &[&str] = &[
    "dev",
    "prod",
    "restart-dev",
    "stop",
    "check",
    "typecheck",
    "lint",
    "lint-fix",
    "build",
    "clean",
    "install",
    "setup",
    "test",
];

/// Commands that get a command-specific validator on top of the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitiveCommand {
    Pkill,
    Chmod,
    InitScript,
    StartScript,
}

impl SensitiveCommand {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pkill" => Some(Self::Pkill),
            "chmod" => Some(Self::Chmod),
            "init.sh" => Some(Self::InitScript),
            "start.sh" => Some(Self::StartScript),
            _ => None,
        }
    }
}

/// The allow-list configuration a validator runs against.
///
/// Validation is a pure function of the command string, this policy and the
/// working directory used to resolve script paths.
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    pub allowed_commands: BTreeSet<String>,
    pub killable_processes: BTreeSet<String>,
    pub start_subcommands: BTreeSet<String>,
}

impl Default for CommandPolicy {
    fn default() -> Self {
        fn set(items: &[&str]) -> BTreeSet<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        Self {
            allowed_commands: set(DEFAULT_ALLOWED_COMMANDS),
            killable_processes: set(DEFAULT_KILLABLE_PROCESSES),
            start_subcommands: set(DEFAULT_START_SUBCOMMANDS),
        }
    }
}

impl CommandPolicy {
    pub fn is_allowed(&self, command: &str) -> bool {
        self.allowed_commands.contains(command)
    }
}
