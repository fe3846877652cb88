//! Deskhand Approval - Safety validation and the confirmation gate.
//!
//! A plan passes two stages here before anything runs:
//!
//! - [`SafetyPolicy::validate`] checks every action against the loaded
//!   policy and yields a [`PlanVerdict`](deskhand_core::PlanVerdict)
//! - [`ConfirmationGate::gate`] turns that verdict into an [`ApprovedPlan`],
//!   asking a [`ConfirmationHandler`] when the policy wants a human yes
//!
//! The executor only accepts an [`ApprovedPlan`], and only the gate can make
//! one. At execution time a [`PathGuard`] from the same policy re-resolves
//! each file path, following symlinks, before the driver opens it.
//!
//! # Example
//!
//! ```
//! use deskhand_approval::{ConfirmationGate, SafetyPolicy};
//! use deskhand_core::{Action, ActionPlan};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let policy = SafetyPolicy::builder().whitelist(["gedit"]).build().unwrap();
//! let plan = ActionPlan::from(vec![Action::OpenApp { app_name: "gedit".into() }]);
//!
//! let verdict = policy.validate(&plan);
//! assert!(verdict.is_allowed());
//!
//! let approved = ConfirmationGate::new()
//!     .gate(plan, &verdict, &CancellationToken::new())
//!     .await
//!     .unwrap();
//! assert!(!approved.was_confirmed());
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod gate;
mod path;
mod policy;
mod validator;

pub use error::{ApprovalError, ApprovalResult, GateError};
pub use gate::{
    ApprovedPlan, ConfirmationGate, ConfirmationHandler, ConfirmationRequest, ConfirmationSignal,
};
pub use path::{LexicalPath, PathGuard};
pub use policy::{ConfirmationPolicy, SafetyPolicy, SafetyPolicyBuilder};
