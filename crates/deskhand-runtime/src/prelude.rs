//! Prelude module - commonly used types for convenient import.
//!
//! Use `use deskhand_runtime::prelude::*;` to import all essential types.

pub use crate::{CommandReport, Pipeline, PipelineBuilder, PipelineError, PipelineResult};
