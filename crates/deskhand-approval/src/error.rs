//! Errors from building a policy, confining paths, and the confirmation gate.

/// Errors that can occur while building a [`SafetyPolicy`](crate::SafetyPolicy).
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// A dangerous-payload pattern is not a valid regular expression.
    #[error("invalid dangerous pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as configured.
        pattern: String,
        /// Why it failed to compile.
        reason: String,
    },

    /// A policy setting is out of range.
    #[error("invalid policy setting {field}: {reason}")]
    InvalidSetting {
        /// Setting name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A file path may not be touched at execution time.
    #[error("refusing path '{path}': {reason}")]
    PathRefused {
        /// The path as the action named it.
        path: String,
        /// Why it was refused.
        reason: String,
    },
}

/// Result type for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;

/// Why the confirmation gate did not approve a plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The safety policy denied at least one action.
    #[error("denied by policy: {}", .0.join("; "))]
    PolicyDenied(Vec<String>),

    /// The user rejected the plan.
    #[error("rejected by user")]
    UserRejected,

    /// No answer arrived in time, or nobody was there to ask.
    #[error("confirmation timed out")]
    Timeout,

    /// The command was cancelled while waiting for confirmation.
    #[error("cancelled while awaiting confirmation")]
    Cancelled,
}

impl GateError {
    /// Whether the plan was turned down by a person, or by the absence of one.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::UserRejected | Self::Timeout)
    }
}
