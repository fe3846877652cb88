//! Deskhand Runtime - The command pipeline.
//!
//! This crate provides:
//! - [`Pipeline`]: interpret, validate, confirm, execute, and audit one
//!   command at a time
//! - [`CommandReport`]: what a command produced
//! - [`config_bridge`]: conversion from `deskhand_config::Config` to the
//!   policy, provider, driver and logging types
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use deskhand_automation::ActionExecutor;
//! use deskhand_config::Config;
//! use deskhand_interpreter::PlanInterpreter;
//! use deskhand_runtime::{Pipeline, config_bridge};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = Config::default();
//! let provider = config_bridge::to_llm_provider(&cfg)?;
//! let cwd = std::env::current_dir()?;
//! let policy = config_bridge::to_safety_policy(&cfg, &cwd)?;
//! let driver = config_bridge::to_system_driver(&cfg);
//!
//! let pipeline = Pipeline::builder()
//!     .interpreter(PlanInterpreter::new(provider))
//!     .policy(policy)
//!     .executor(ActionExecutor::new(Arc::new(driver)))
//!     .build()?;
//!
//! let report = pipeline.run("open gedit", &CancellationToken::new()).await?;
//! println!("{}", report.outcome.summary());
//! pipeline.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config_bridge;
pub mod prelude;

mod error;
mod pipeline;
mod report;

pub use error::{PipelineError, PipelineResult};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineContext};
pub use report::CommandReport;
