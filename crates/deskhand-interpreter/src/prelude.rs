//! Prelude module - commonly used types for convenient import.
//!
//! Use `use deskhand_interpreter::prelude::*;` to import all essential types.

pub use crate::{InterpretError, InterpretResult, PlanInterpreter, PromptContext};
