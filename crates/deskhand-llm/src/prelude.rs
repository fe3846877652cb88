//! Prelude module - commonly used types for convenient import.
//!
//! Use `use deskhand_llm::prelude::*;` to import all essential types.
//!
//! ```rust,no_run
//! use deskhand_llm::prelude::*;
//!
//! # async fn example() -> LlmResult<()> {
//! let config = ProviderConfig::new("sk-or-...", "openai/gpt-4-turbo-preview");
//! let provider = OpenAiCompatProvider::openrouter(config)?;
//!
//! let reply = provider.complete_simple("Answer briefly.", "What is 2+2?").await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

pub use crate::{LlmError, LlmResult};

pub use crate::{LlmProvider, OpenAiCompatProvider, ProviderConfig};

pub use crate::{LlmResponse, Message, MessageRole, StopReason, Usage};
