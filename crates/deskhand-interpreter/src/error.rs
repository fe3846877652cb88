//! Interpretation error types.

use thiserror::Error;

/// Why a command could not be turned into a plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpretError {
    /// The model answered, but not with a valid plan.
    #[error("Model response violates the plan schema: {0}")]
    SchemaViolation(String),

    /// The model could not be reached, or kept failing.
    #[error("Language model unavailable after {attempts} attempt(s): {reason}")]
    ServiceUnavailable {
        /// Attempts made.
        attempts: u32,
        /// The last failure.
        reason: String,
    },

    /// The model declined to produce a plan.
    #[error("Command refused: {reason}")]
    Refused {
        /// The model's explanation.
        reason: String,
    },

    /// The command was cancelled while waiting on the model.
    #[error("Interpretation cancelled")]
    Cancelled,
}

impl InterpretError {
    /// Short machine-readable label, used in audit summaries.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::SchemaViolation(_) => "schema_violation",
            Self::ServiceUnavailable { .. } => "service_unavailable",
            Self::Refused { .. } => "refused",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Result type for interpretation.
pub type InterpretResult<T> = Result<T, InterpretError>;
