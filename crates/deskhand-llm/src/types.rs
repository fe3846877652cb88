//! Chat messages and completions.

use serde::{Deserialize, Serialize};

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions; sent once, ahead of the conversation.
    System,
    /// The person issuing commands.
    User,
    /// The model.
    Assistant,
}

impl MessageRole {
    /// Name used on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author.
    pub role: MessageRole,
    /// Plain text body.
    pub content: String,
}

impl Message {
    fn with_role(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// A message from the user.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content)
    }

    /// A reply from the model.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content)
    }

    /// Body text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.content
    }
}

/// A finished completion.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// The model's reply.
    pub message: Message,
    /// Why generation ended.
    pub stop_reason: StopReason,
    /// Tokens billed for the request.
    pub usage: Usage,
}

impl LlmResponse {
    /// A complete reply with no usage figures, as mocks produce.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            message: Message::assistant(content),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        }
    }

    /// Whether the reply was cut off by the token limit.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.stop_reason == StopReason::MaxTokens
    }
}

/// Why the model stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// It finished its answer.
    EndTurn,
    /// It ran into `max_tokens`.
    MaxTokens,
    /// A stop sequence or content filter ended it.
    StopSequence,
}

/// Prompt and completion token counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    /// Prompt tokens.
    pub input_tokens: usize,
    /// Completion tokens.
    pub output_tokens: usize,
}

impl Usage {
    /// Prompt plus completion tokens.
    #[must_use]
    pub fn total(&self) -> usize {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}
