//! Deskhand Core - Foundation types for the Deskhand automation pipeline.
//!
//! This crate provides:
//! - The [`Action`] model: a closed set of ten desktop automation operations
//! - [`ActionPlan`]: the ordered steps derived from one user command
//! - Safety verdicts ([`ActionVerdict`], [`PlanVerdict`])
//! - Execution outcomes ([`ActionOutcome`], [`PlanOutcome`], [`ExecutionError`])
//! - Retry utilities with exponential or fixed backoff
//!
//! # Example
//!
//! ```
//! use deskhand_core::{Action, ActionPlan, PlanStep};
//!
//! let plan = ActionPlan::new(vec![
//!     PlanStep::fatal(Action::OpenApp { app_name: "gedit".to_string() }),
//!     PlanStep::new(Action::TypeText { text: "hello".to_string() }),
//! ]);
//!
//! assert_eq!(plan.len(), 2);
//! assert!(plan.steps()[0].is_fatal());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod action;
pub mod outcome;
pub mod plan;
pub mod retry;
pub mod types;
pub mod utils;
pub mod verdict;

pub use action::{Action, ActionKind, MouseButton, ScrollDirection, ShapeError, WriteMode};
pub use outcome::{ActionOutcome, ExecutionError, PlanOutcome};
pub use plan::{ActionPlan, PlanStep};
pub use retry::{Backoff, RetryOutcome, RetryPolicy, retry};
pub use types::{CommandId, Timestamp};
pub use utils::summarize;
pub use verdict::{ActionVerdict, PlanVerdict, Severity};
