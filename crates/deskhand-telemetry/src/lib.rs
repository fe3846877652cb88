//! Deskhand Telemetry - Logging setup for the Deskhand pipeline.
//!
//! Library crates only emit `tracing` events; the binary calls
//! [`setup_logging`] once at startup and keeps the returned [`LogGuard`]
//! alive until exit so buffered file output is flushed.
//!
//! # Example
//!
//! ```rust,no_run
//! use deskhand_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), deskhand_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("deskhand_llm=trace");
//!
//! let _guard = setup_logging(&config)?;
//! tracing::info!("ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LOG_FILE_PREFIX, LogConfig, LogFormat, LogGuard, LogTarget, setup_logging};
