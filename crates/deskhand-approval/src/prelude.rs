//! Prelude module - commonly used types for convenient import.
//!
//! Use `use deskhand_approval::prelude::*;` to import all essential types.

pub use crate::{ApprovalError, ApprovalResult, GateError};

pub use crate::{ConfirmationPolicy, PathGuard, SafetyPolicy};

pub use crate::{
    ApprovedPlan, ConfirmationGate, ConfirmationHandler, ConfirmationRequest, ConfirmationSignal,
};
