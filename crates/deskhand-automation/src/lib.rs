//! Deskhand Automation - Platform drivers and the action executor.
//!
//! [`DesktopDriver`] is the seam to the operating system: one synchronous
//! method per action kind. [`SystemDriver`] implements it for the local
//! machine. [`ActionExecutor`] runs an
//! [`ApprovedPlan`](deskhand_approval::ApprovedPlan) one step at a time,
//! each step bounded by a timeout and the command's cancellation token,
//! with file paths confined by the policy's
//! [`PathGuard`](deskhand_approval::PathGuard).

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod driver;
mod executor;
mod system;

pub use driver::{DesktopDriver, DriverError, DriverResult, dispatch};
pub use executor::{ActionExecutor, CANCELLED_REASON};
pub use system::SystemDriver;
