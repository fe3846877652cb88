//! Deskhand LLM - Language-model provider abstraction.
//!
//! The interpreter talks to a model through the [`LlmProvider`] trait. The
//! only shipped implementation is [`OpenAiCompatProvider`], which speaks the
//! chat-completions protocol used by `OpenRouter`, `OpenAI` and local
//! servers such as vLLM or Ollama.
//!
//! Errors carry enough HTTP detail for callers to decide whether a retry is
//! worthwhile; see [`LlmError::is_transient`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod openai_compat;
mod provider;
mod types;

pub use error::{LlmError, LlmResult};
pub use openai_compat::{OPENAI_BASE_URL, OPENROUTER_BASE_URL, OpenAiCompatProvider};
pub use provider::{DEFAULT_MODEL, LlmProvider, ProviderConfig};
pub use types::{LlmResponse, Message, MessageRole, StopReason, Usage};
