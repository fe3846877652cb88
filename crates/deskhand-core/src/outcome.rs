//! Execution outcomes for single actions and whole plans.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an action failed to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionError {
    /// The action did not finish within its time budget.
    #[error("timed out")]
    Timeout,
    /// The operating system refused the operation.
    #[error("permission denied")]
    PermissionDenied,
    /// The target (file, application, window) does not exist.
    #[error("target not found")]
    TargetNotFound,
    /// Any other fault, including unsupported primitives and panics.
    #[error("execution error")]
    Unknown,
}

/// The result of executing one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The action completed.
    Succeeded {
        /// What the primitive reported (e.g. file content for reads).
        detail: String,
    },
    /// The action failed; the plan may continue.
    Failed {
        /// Failure category.
        error: ExecutionError,
        /// Underlying message.
        detail: String,
    },
    /// The action was never started.
    Skipped {
        /// Why it was skipped (fatal predecessor, cancellation).
        reason: String,
    },
}

impl ActionOutcome {
    /// Shorthand for a success.
    #[must_use]
    pub fn succeeded(detail: impl Into<String>) -> Self {
        Self::Succeeded {
            detail: detail.into(),
        }
    }

    /// Shorthand for a failure.
    #[must_use]
    pub fn failed(error: ExecutionError, detail: impl Into<String>) -> Self {
        Self::Failed {
            error,
            detail: detail.into(),
        }
    }

    /// Shorthand for a skip.
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// Whether the action completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Whether the action failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Whether the action was skipped.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// The failure category, if this is a failure.
    #[must_use]
    pub fn error(&self) -> Option<ExecutionError> {
        match self {
            Self::Failed { error, .. } => Some(*error),
            _ => None,
        }
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded { detail } if detail.is_empty() => f.write_str("succeeded"),
            Self::Succeeded { detail } => write!(f, "succeeded: {detail}"),
            Self::Failed { error, detail } => write!(f, "failed ({error}): {detail}"),
            Self::Skipped { reason } => write!(f, "skipped: {reason}"),
        }
    }
}

/// Per-action outcomes of a plan, in plan order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOutcome {
    outcomes: Vec<ActionOutcome>,
}

impl PlanOutcome {
    /// Wrap per-action outcomes (in plan order).
    #[must_use]
    pub fn new(outcomes: Vec<ActionOutcome>) -> Self {
        Self { outcomes }
    }

    /// The per-action outcomes.
    #[must_use]
    pub fn outcomes(&self) -> &[ActionOutcome] {
        &self.outcomes
    }

    /// Number of actions that completed.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of actions that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    /// Number of actions that were skipped.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    /// Whether every action completed (vacuously true for an empty plan).
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(ActionOutcome::is_success)
    }

    /// Summary line, e.g. `"2 succeeded, 1 failed, 0 skipped"`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed, {} skipped",
            self.succeeded(),
            self.failed(),
            self.skipped()
        )
    }
}
