//! Pipeline error types.

use deskhand_approval::{ApprovalError, GateError};
use deskhand_audit::AuditError;
use deskhand_interpreter::InterpretError;
use thiserror::Error;

/// Why a command did not reach execution.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The command could not be turned into a plan.
    #[error(transparent)]
    Interpret(#[from] InterpretError),

    /// The plan was denied, rejected, or not confirmed in time.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// The audit trail could not record a stage, so the command was stopped.
    #[error("Audit trail unavailable: {0}")]
    Audit(#[from] AuditError),

    /// The pipeline could not be assembled from its configuration.
    #[error("Pipeline setup failed: {0}")]
    Setup(String),
}

impl From<ApprovalError> for PipelineError {
    fn from(err: ApprovalError) -> Self {
        Self::Setup(err.to_string())
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
