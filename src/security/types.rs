//! Validation decision type.

use crate::error::{WardenError, Result};

/// Outcome of validating one candidate command string. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationDecision {
    /// The command may run.
    Allow,
    /// The command must not run; `reason` is shown to the caller.
    Deny { reason: String },
}

impl ValidationDecision {
    /// Create a denial with the given reason.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// The denial reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Deny { reason } => Some(reason),
        }
    }

    /// Convert into a `Result`, mapping a denial to `ValidationDenied`.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny { reason } => Err(WardenError::ValidationDenied(reason)),
        }
    }
}

impl std::fmt::Display for ValidationDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Deny { reason } => write!(f, "deny: {}", reason),
        }
    }
}

/// Result of a single deep validator: `Err(reason)` denies.
pub(super) type CheckResult = std::result::Result<(), String>;
