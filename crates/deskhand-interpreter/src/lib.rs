//! Deskhand Interpreter - Natural-language commands to action plans.
//!
//! [`PlanInterpreter::interpret`] sends a command, with a fixed instruction
//! schema and a short context block, to an
//! [`LlmProvider`](deskhand_llm::LlmProvider), and parses the answer
//! strictly into an [`ActionPlan`](deskhand_core::ActionPlan). Transient
//! service failures are retried with backoff; everything else fails the
//! command with an [`InterpretError`].
//!
//! The interpreter also keeps a [`CommandHistory`]: the last few commands
//! and the latest plan go out with each request, so follow-ups can refer
//! back to them.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod history;
mod interpreter;
mod parse;
mod prompt;

pub use error::{InterpretError, InterpretResult};
pub use history::{CommandHistory, DEFAULT_HISTORY_CAPACITY, HistoryEntry, PROMPT_HISTORY_LEN};
pub use interpreter::{FALLBACK_CLARIFICATION, PlanInterpreter};
pub use parse::{parse_plan, strip_code_fences};
pub use prompt::{PromptContext, SYSTEM_PROMPT};
