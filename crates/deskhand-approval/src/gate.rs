//! Confirmation gate: the last stop before execution.
//!
//! # Gate Flow
//!
//! 1. Plan verdict `Denied`, or not one verdict per step ->
//!    [`GateError::PolicyDenied`]
//! 2. Plan verdict `Allowed` -> approved, nobody asked
//! 3. Otherwise send a [`ConfirmationRequest`] to the registered
//!    [`ConfirmationHandler`] and wait, bounded by the gate timeout and the
//!    command's cancellation token
//! 4. Accept -> approved; Reject -> [`GateError::UserRejected`]; no answer,
//!    timeout or no handler -> [`GateError::Timeout`]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deskhand_core::{ActionPlan, PlanStep, PlanVerdict};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::GateError;

/// Default confirmation timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// What the user answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationSignal {
    /// Run the plan.
    Accept,
    /// Do not run the plan.
    Reject,
}

/// A plan waiting for a human decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    /// Request identifier.
    pub id: Uuid,
    /// One-line plan summary.
    pub summary: String,
    /// Description of every step, in order.
    pub steps: Vec<String>,
    /// Why confirmation is needed.
    pub reasons: Vec<String>,
}

impl ConfirmationRequest {
    fn for_plan(plan: &ActionPlan, reasons: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            summary: plan.summary(),
            steps: plan.actions().map(ToString::to_string).collect(),
            reasons,
        }
    }
}

/// Trait for front ends that ask a person to confirm a plan.
///
/// Returns `None` if nobody answered (window closed, input ended, etc.).
#[async_trait]
pub trait ConfirmationHandler: Send + Sync {
    /// Present the request and wait for an answer.
    async fn confirm(&self, request: ConfirmationRequest) -> Option<ConfirmationSignal>;
}

/// A plan the gate let through. Only the gate can construct one.
#[derive(Debug, Clone)]
pub struct ApprovedPlan {
    plan: ActionPlan,
    confirmed: bool,
}

impl ApprovedPlan {
    /// The plan.
    #[must_use]
    pub fn plan(&self) -> &ActionPlan {
        &self.plan
    }

    /// Steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[PlanStep] {
        self.plan.steps()
    }

    /// Whether a person explicitly accepted the plan.
    #[must_use]
    pub fn was_confirmed(&self) -> bool {
        self.confirmed
    }

    /// Take the plan back.
    #[must_use]
    pub fn into_plan(self) -> ActionPlan {
        self.plan
    }
}

/// The confirmation gate.
pub struct ConfirmationGate {
    handler: Option<Arc<dyn ConfirmationHandler>>,
    timeout: Duration,
}

impl ConfirmationGate {
    /// A gate without a handler: plans needing confirmation are refused.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handler: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Register the handler that asks the user.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn ConfirmationHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// How long to wait for an answer.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether a handler is registered.
    #[must_use]
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Decide whether `plan` may run.
    ///
    /// # Errors
    ///
    /// See the module docs for which [`GateError`] each path yields.
    pub async fn gate(
        &self,
        plan: ActionPlan,
        verdict: &PlanVerdict,
        cancel: &CancellationToken,
    ) -> Result<ApprovedPlan, GateError> {
        if verdict.actions().len() != plan.len() {
            return Err(GateError::PolicyDenied(vec![format!(
                "verdict covers {} of {} steps",
                verdict.actions().len(),
                plan.len()
            )]));
        }
        if verdict.is_denied() {
            return Err(GateError::PolicyDenied(verdict.reasons()));
        }
        if !verdict.requires_confirmation() {
            return Ok(ApprovedPlan {
                plan,
                confirmed: false,
            });
        }

        let Some(handler) = &self.handler else {
            warn!("Plan requires confirmation but no handler is registered");
            return Err(GateError::Timeout);
        };

        let request = ConfirmationRequest::for_plan(&plan, verdict.reasons());
        let request_id = request.id;
        info!(request_id = %request_id, summary = %request.summary, "Awaiting confirmation");

        let answer = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(GateError::Cancelled),
            answer = tokio::time::timeout(self.timeout, handler.confirm(request)) => answer,
        };

        match answer {
            Ok(Some(ConfirmationSignal::Accept)) => {
                info!(request_id = %request_id, "Plan confirmed");
                Ok(ApprovedPlan {
                    plan,
                    confirmed: true,
                })
            },
            Ok(Some(ConfirmationSignal::Reject)) => {
                info!(request_id = %request_id, "Plan rejected");
                Err(GateError::UserRejected)
            },
            Ok(None) => {
                warn!(request_id = %request_id, "No answer to confirmation request");
                Err(GateError::Timeout)
            },
            Err(_) => {
                warn!(
                    request_id = %request_id,
                    timeout_secs = self.timeout.as_secs(),
                    "Confirmation timed out"
                );
                Err(GateError::Timeout)
            },
        }
    }
}

impl Default for ConfirmationGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfirmationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationGate")
            .field("has_handler", &self.handler.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}
