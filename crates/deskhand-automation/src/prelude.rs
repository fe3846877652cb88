//! Prelude module - commonly used types for convenient import.
//!
//! Use `use deskhand_automation::prelude::*;` to import all essential types.

pub use crate::{ActionExecutor, DesktopDriver, DriverError, DriverResult, SystemDriver};
