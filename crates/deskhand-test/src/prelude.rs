//! Prelude module - commonly used test utilities.
//!
//! Use `use deskhand_test::prelude::*;` to import all essential types.

pub use crate::{MockDriver, MockLlmProvider, MockLlmTurn, ScriptedConfirmation};

pub use crate::{plan_response, refusal_response, test_policy, test_policy_builder};
