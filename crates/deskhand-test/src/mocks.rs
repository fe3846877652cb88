//! Mock confirmation front end.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use deskhand_approval::{ConfirmationHandler, ConfirmationRequest, ConfirmationSignal};

/// A [`ConfirmationHandler`] that replays queued answers.
///
/// Uses `std::sync::Mutex` internally so builder methods work without a
/// tokio runtime. When the queue is empty the default answer is used, which
/// starts out as `Reject`.
#[derive(Debug, Clone)]
pub struct ScriptedConfirmation {
    answers: Arc<Mutex<VecDeque<Option<ConfirmationSignal>>>>,
    requests: Arc<Mutex<Vec<ConfirmationRequest>>>,
    default_answer: Option<ConfirmationSignal>,
    delay: Duration,
}

impl ScriptedConfirmation {
    /// Create a handler that rejects everything.
    #[must_use]
    pub fn new() -> Self {
        Self {
            answers: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            default_answer: Some(ConfirmationSignal::Reject),
            delay: Duration::ZERO,
        }
    }

    /// A handler that accepts everything.
    #[must_use]
    pub fn accepting() -> Self {
        Self::new().with_default(Some(ConfirmationSignal::Accept))
    }

    /// A handler that rejects everything.
    #[must_use]
    pub fn rejecting() -> Self {
        Self::new()
    }

    /// Set the answer used when the queue is empty. `None` means "no answer".
    #[must_use]
    pub fn with_default(mut self, answer: Option<ConfirmationSignal>) -> Self {
        self.default_answer = answer;
        self
    }

    /// Queue an answer.
    #[must_use]
    pub fn with_answer(self, answer: Option<ConfirmationSignal>) -> Self {
        if let Ok(mut answers) = self.answers.lock() {
            answers.push_back(answer);
        }
        self
    }

    /// Wait this long before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every request received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<ConfirmationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of requests received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

impl Default for ScriptedConfirmation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfirmationHandler for ScriptedConfirmation {
    async fn confirm(&self, request: ConfirmationRequest) -> Option<ConfirmationSignal> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut a| a.pop_front())
            .unwrap_or(self.default_answer)
    }
}
