//! Deskhand Test - Shared test utilities.
//!
//! Mock implementations of every pipeline collaborator plus fixtures, for
//! use as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! deskhand-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use deskhand_test::{MockLlmProvider, MockLlmTurn, plan_response};
//! use serde_json::json;
//!
//! let llm = MockLlmProvider::new(vec![MockLlmTurn::text(plan_response(&[
//!     json!({"action": "open_app", "app_name": "gedit"}),
//! ]))]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod mock_driver;
pub mod mock_llm;
pub mod mocks;

pub use fixtures::*;
pub use mock_driver::*;
pub use mock_llm::*;
pub use mocks::*;
