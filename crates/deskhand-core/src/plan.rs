//! Action plans: the ordered steps derived from one command.

use serde::{Deserialize, Serialize};

use crate::action::Action;

/// One step of a plan: an action and whether its failure ends the plan.
///
/// The `fatal` flag is declared by the plan interpreter (e.g. an `open_app`
/// that later keystrokes depend on). The executor never infers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    action: Action,
    #[serde(default)]
    fatal: bool,
}

impl PlanStep {
    /// A step whose failure does not affect later steps.
    #[must_use]
    pub fn new(action: Action) -> Self {
        Self {
            action,
            fatal: false,
        }
    }

    /// A step whose failure skips every later step.
    #[must_use]
    pub fn fatal(action: Action) -> Self {
        Self {
            action,
            fatal: true,
        }
    }

    /// The action to perform.
    #[must_use]
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Whether a failure of this step aborts the rest of the plan.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }
}

/// An ordered sequence of steps. Sequence order is execution order.
///
/// Plans are immutable once built: the validator and executor only borrow
/// them. An empty plan is valid and means "nothing to do".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    steps: Vec<PlanStep>,
}

impl ActionPlan {
    /// Build a plan from its steps.
    #[must_use]
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self { steps }
    }

    /// A plan with no steps.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The steps, in execution order.
    #[must_use]
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Iterate over the actions, in execution order.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.steps.iter().map(PlanStep::action)
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// One-line summary for logs and audit entries, e.g.
    /// `"2 actions: open_app, type_text"`.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.steps.is_empty() {
            return "empty plan".to_string();
        }
        let kinds: Vec<&str> = self.actions().map(|a| a.kind().as_str()).collect();
        let noun = if kinds.len() == 1 { "action" } else { "actions" };
        format!("{} {noun}: {}", kinds.len(), kinds.join(", "))
    }
}

impl From<Vec<Action>> for ActionPlan {
    fn from(actions: Vec<Action>) -> Self {
        Self::new(actions.into_iter().map(PlanStep::new).collect())
    }
}
