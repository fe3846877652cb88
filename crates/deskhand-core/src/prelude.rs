//! Prelude module - commonly used types for convenient import.
//!
//! Use `use deskhand_core::prelude::*;` to import all essential types.

// Action model
pub use crate::{Action, ActionKind, MouseButton, ScrollDirection, ShapeError, WriteMode};

// Plans
pub use crate::{ActionPlan, PlanStep};

// Verdicts and outcomes
pub use crate::{ActionOutcome, ActionVerdict, ExecutionError, PlanOutcome, PlanVerdict, Severity};

// Identifiers and time
pub use crate::{CommandId, Timestamp};

// Retry
pub use crate::{Backoff, RetryOutcome, RetryPolicy};
