//! Mock LLM provider for testing.
//!
//! Provides [`MockLlmProvider`], a deterministic, queue-based implementation of
//! [`LlmProvider`] that replays pre-configured turns. Interpreter and pipeline
//! tests use it to script the model's answers without hitting a real API.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use deskhand_llm::{LlmError, LlmProvider, LlmResponse, LlmResult, Message};

/// A failure the mock provider can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// The request timed out.
    Timeout,
    /// HTTP 429.
    RateLimited,
    /// HTTP 503.
    ServiceUnavailable,
    /// HTTP 401.
    AuthenticationFailed,
    /// HTTP 400.
    BadRequest,
    /// No API key.
    MissingKey,
}

impl MockFailure {
    fn into_error(self) -> LlmError {
        match self {
            Self::Timeout => LlmError::Timeout(Duration::from_secs(30)),
            Self::RateLimited => LlmError::RateLimitExceeded {
                retry_after_secs: None,
            },
            Self::ServiceUnavailable => LlmError::ServiceError {
                status: 503,
                body: "upstream unavailable".to_string(),
            },
            Self::AuthenticationFailed => LlmError::AuthenticationFailed("invalid key".to_string()),
            Self::BadRequest => LlmError::BadRequest {
                status: 400,
                body: "bad request".to_string(),
            },
            Self::MissingKey => LlmError::ApiKeyNotConfigured {
                provider: "mock".to_string(),
            },
        }
    }
}

/// A single scripted turn that the mock provider will replay.
#[derive(Debug, Clone)]
pub enum MockLlmTurn {
    /// A text response.
    Text(String),
    /// Produce an error.
    Fail(MockFailure),
    /// Sleep, then play the inner turn.
    Delayed(Duration, Box<MockLlmTurn>),
}

impl MockLlmTurn {
    /// Create a text turn.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create an error turn.
    #[must_use]
    pub fn fail(failure: MockFailure) -> Self {
        Self::Fail(failure)
    }

    /// Delay this turn by `delay`.
    #[must_use]
    pub fn after(self, delay: Duration) -> Self {
        Self::Delayed(delay, Box::new(self))
    }
}

/// One captured request.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    /// System prompt.
    pub system: String,
    /// Conversation messages.
    pub messages: Vec<Message>,
}

/// A deterministic, queue-based [`LlmProvider`] for tests.
///
/// Turns are popped from the front of the queue on each call to
/// [`complete`](LlmProvider::complete). If the queue is exhausted, an
/// `InvalidResponse` error is returned.
pub struct MockLlmProvider {
    turns: Mutex<VecDeque<MockLlmTurn>>,
    captured: Mutex<Vec<CapturedRequest>>,
}

impl MockLlmProvider {
    /// Create a new mock provider preloaded with the given turns.
    #[must_use]
    pub fn new(turns: Vec<MockLlmTurn>) -> Self {
        Self {
            turns: Mutex::new(VecDeque::from(turns)),
            captured: Mutex::new(Vec::new()),
        }
    }

    /// Queue another turn.
    pub fn push(&self, turn: MockLlmTurn) {
        if let Ok(mut turns) = self.turns.lock() {
            turns.push_back(turn);
        }
    }

    /// Number of times `complete` has been called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.captured.lock().map(|c| c.len()).unwrap_or_default()
    }

    /// Every request received, in order.
    #[must_use]
    pub fn captured(&self) -> Vec<CapturedRequest> {
        self.captured
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Record a call and pop the next turn.
    fn next_turn(&self, system: &str, messages: &[Message]) -> Option<MockLlmTurn> {
        if let Ok(mut captured) = self.captured.lock() {
            captured.push(CapturedRequest {
                system: system.to_string(),
                messages: messages.to_vec(),
            });
        }
        self.turns.lock().ok().and_then(|mut t| t.pop_front())
    }
}

impl std::fmt::Debug for MockLlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLlmProvider")
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
#[allow(clippy::unnecessary_literal_bound)]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, messages: &[Message], system: &str) -> LlmResult<LlmResponse> {
        let mut turn = self.next_turn(system, messages).ok_or_else(|| {
            LlmError::InvalidResponse("MockLlmProvider: no more turns queued".to_string())
        })?;
        loop {
            match turn {
                MockLlmTurn::Text(text) => return Ok(LlmResponse::text(text)),
                MockLlmTurn::Fail(failure) => return Err(failure.into_error()),
                MockLlmTurn::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    turn = *inner;
                },
            }
        }
    }
}
