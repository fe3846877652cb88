//! The plan interpreter: command text in, action plan out.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use deskhand_core::{ActionPlan, RetryOutcome, RetryPolicy, retry, summarize};
use deskhand_llm::{LlmError, LlmProvider, LlmResponse, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{InterpretError, InterpretResult};
use crate::history::{CommandHistory, HistoryEntry};
use crate::parse::parse_plan;
use crate::prompt::{CLARIFY_SYSTEM_PROMPT, PromptContext, SYSTEM_PROMPT, clarify_message};

/// Default bound on a single model request.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Reply from [`PlanInterpreter::clarify`] when the model cannot be asked.
pub const FALLBACK_CLARIFICATION: &str = "Sorry, I couldn't process that command safely.";

/// Characters of a model response kept in logs.
const LOGGED_RESPONSE_CHARS: usize = 200;

/// Turns natural-language commands into [`ActionPlan`]s via a language model.
pub struct PlanInterpreter {
    provider: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
    request_timeout: Duration,
    context: PromptContext,
    history: Mutex<CommandHistory>,
}

impl PlanInterpreter {
    /// Create an interpreter with default retry and timeout settings.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            context: PromptContext::detect(),
            history: Mutex::new(CommandHistory::default()),
        }
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the per-attempt request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the context block sent with each command.
    #[must_use]
    pub fn with_context(mut self, context: PromptContext) -> Self {
        self.context = context;
        self
    }

    /// Keep at most `capacity` commands of history.
    #[must_use]
    pub fn with_history_capacity(self, capacity: usize) -> Self {
        Self {
            history: Mutex::new(CommandHistory::new(capacity)),
            ..self
        }
    }

    /// Record a finished command so later requests can refer to it.
    pub fn remember(&self, entry: HistoryEntry) {
        debug!(command = %summarize(&entry.command, LOGGED_RESPONSE_CHARS), "Remembering command");
        self.lock_history().push(entry);
    }

    /// Remembered commands, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.lock_history().entries()
    }

    fn lock_history(&self) -> MutexGuard<'_, CommandHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The provider in use.
    #[must_use]
    pub fn provider(&self) -> &dyn LlmProvider {
        self.provider.as_ref()
    }

    /// Interpret `command`.
    ///
    /// A blank command yields an empty plan without contacting the model.
    ///
    /// # Errors
    ///
    /// - [`InterpretError::SchemaViolation`] if the answer is not a valid plan
    /// - [`InterpretError::Refused`] if the model declined
    /// - [`InterpretError::ServiceUnavailable`] if the model could not be
    ///   reached within the retry budget, or failed permanently
    /// - [`InterpretError::Cancelled`] if `cancel` fired first
    pub async fn interpret(
        &self,
        command: &str,
        cancel: &CancellationToken,
    ) -> InterpretResult<ActionPlan> {
        let command = command.trim();
        if command.is_empty() {
            debug!("Blank command, nothing to interpret");
            return Ok(ActionPlan::empty());
        }

        let message = self.context.user_message(command, &self.lock_history());
        let messages = [Message::user(message)];
        let messages = &messages;
        let attempt_call = move |attempt: u32| async move {
            if attempt > 0 {
                info!(attempt = attempt.saturating_add(1), "Retrying model request");
            }
            self.request(messages, SYSTEM_PROMPT).await
        };
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(InterpretError::Cancelled),
            outcome = retry(&self.retry, attempt_call, LlmError::is_transient) => outcome,
        };

        let response = match outcome {
            RetryOutcome::Success(response) => response,
            RetryOutcome::Exhausted { error, attempts } | RetryOutcome::Aborted { error, attempts } => {
                return Err(classify_failure(error, attempts));
            },
        };

        let text = response.message.text();
        debug!(
            response = %summarize(text, LOGGED_RESPONSE_CHARS),
            tokens = response.usage.total(),
            "Model response received"
        );
        let plan = parse_plan(text).map_err(|err| match err {
            InterpretError::SchemaViolation(reason) if response.is_truncated() => {
                InterpretError::SchemaViolation(format!("{reason} (response was cut off)"))
            },
            err => err,
        })?;

        info!(steps = plan.len(), summary = %plan.summary(), "Command interpreted");
        Ok(plan)
    }

    /// Ask the model to explain to the user why `command` failed.
    ///
    /// A single attempt; falls back to [`FALLBACK_CLARIFICATION`] on any
    /// failure or cancellation.
    pub async fn clarify(&self, command: &str, reason: &str, cancel: &CancellationToken) -> String {
        let messages = [Message::user(clarify_message(command, reason))];
        let answer = tokio::select! {
            biased;
            () = cancel.cancelled() => return FALLBACK_CLARIFICATION.to_string(),
            answer = self.request(&messages, CLARIFY_SYSTEM_PROMPT) => answer,
        };
        match answer {
            Ok(response) if !response.message.text().trim().is_empty() => {
                response.message.text().trim().to_string()
            },
            Ok(_) => FALLBACK_CLARIFICATION.to_string(),
            Err(e) => {
                warn!(error = %e, "Clarification request failed");
                FALLBACK_CLARIFICATION.to_string()
            },
        }
    }

    /// One model call, bounded by the request timeout.
    async fn request(
        &self,
        messages: &[Message],
        system: &str,
    ) -> Result<LlmResponse, LlmError> {
        let result = tokio::time::timeout(
            self.request_timeout,
            self.provider.complete(messages, system),
        )
        .await
        .unwrap_or(Err(LlmError::Timeout(self.request_timeout)));
        if let Err(e) = &result {
            warn!(provider = self.provider.name(), error = %e, "Model request failed");
        }
        result
    }
}

/// Map the final model error to an interpretation error.
fn classify_failure(error: LlmError, attempts: u32) -> InterpretError {
    match error {
        LlmError::InvalidResponse(reason) => InterpretError::SchemaViolation(reason),
        other => InterpretError::ServiceUnavailable {
            attempts,
            reason: other.to_string(),
        },
    }
}

impl std::fmt::Debug for PlanInterpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanInterpreter")
            .field("provider", &self.provider.name())
            .field("model", &self.provider.model())
            .field("retry", &self.retry)
            .field("request_timeout", &self.request_timeout)
            .field("history", &self.lock_history().len())
            .finish_non_exhaustive()
    }
}
