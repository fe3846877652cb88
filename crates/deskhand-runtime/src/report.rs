//! What a command produced, handed back to the caller.

use deskhand_core::{ActionPlan, CommandId, PlanOutcome, PlanVerdict};

/// The plan, verdict and outcome of one command that reached the executor
/// (or ended early with an empty plan).
#[derive(Debug, Clone)]
pub struct CommandReport {
    /// Command identifier, shared by its audit entries.
    pub command_id: CommandId,
    /// The command text as received.
    pub command: String,
    /// The interpreted plan.
    pub plan: ActionPlan,
    /// The validator's verdict on the plan.
    pub verdict: PlanVerdict,
    /// Whether a person explicitly accepted the plan.
    pub confirmed: bool,
    /// Per-step outcomes, same length and order as the plan.
    pub outcome: PlanOutcome,
}

impl CommandReport {
    /// Report for a command whose plan had nothing to do.
    pub(crate) fn empty(command_id: CommandId, command: &str) -> Self {
        Self {
            command_id,
            command: command.to_string(),
            plan: ActionPlan::empty(),
            verdict: PlanVerdict::new(Vec::new()),
            confirmed: false,
            outcome: PlanOutcome::new(Vec::new()),
        }
    }

    /// Whether every step succeeded. True for an empty plan.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.all_succeeded()
    }

    /// Whether the plan had no steps.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.plan.is_empty()
    }

    /// `(step description, outcome description)` pairs in execution order.
    #[must_use]
    pub fn lines(&self) -> Vec<(String, String)> {
        self.plan
            .actions()
            .zip(self.outcome.outcomes())
            .map(|(action, outcome)| (action.to_string(), outcome.to_string()))
            .collect()
    }
}
