//! Safety verdicts for single actions and whole plans.
//!
//! Severity order is `Denied > RequiresConfirmation > Allowed`. A plan is
//! denied outright if any of its actions is denied.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a verdict, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// No objection.
    Allowed,
    /// Needs explicit human approval.
    RequiresConfirmation,
    /// Must not run.
    Denied,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Allowed => "allowed",
            Self::RequiresConfirmation => "requires_confirmation",
            Self::Denied => "denied",
        })
    }
}

/// The policy decision for one action.
///
/// Reasons from every failing layer are kept, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ActionVerdict {
    /// The action passed every layer.
    Allowed,
    /// The action failed at least one layer.
    Denied {
        /// Why, one entry per failing layer.
        reasons: Vec<String>,
    },
    /// The action passed every layer but needs human approval.
    RequiresConfirmation {
        /// Why approval is needed.
        reasons: Vec<String>,
    },
}

impl ActionVerdict {
    /// Build a verdict from layer findings; the most severe finding wins.
    #[must_use]
    pub fn from_findings(denials: Vec<String>, confirmations: Vec<String>) -> Self {
        if !denials.is_empty() {
            Self::Denied { reasons: denials }
        } else if !confirmations.is_empty() {
            Self::RequiresConfirmation {
                reasons: confirmations,
            }
        } else {
            Self::Allowed
        }
    }

    /// Severity of this verdict.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::Allowed => Severity::Allowed,
            Self::Denied { .. } => Severity::Denied,
            Self::RequiresConfirmation { .. } => Severity::RequiresConfirmation,
        }
    }

    /// Reasons attached to this verdict (empty when allowed).
    #[must_use]
    pub fn reasons(&self) -> &[String] {
        match self {
            Self::Allowed => &[],
            Self::Denied { reasons } | Self::RequiresConfirmation { reasons } => reasons,
        }
    }

    /// Whether the action was denied.
    #[must_use]
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }
}

/// Aggregated verdict for a plan, with one verdict per action in plan order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanVerdict {
    actions: Vec<ActionVerdict>,
}

impl PlanVerdict {
    /// Aggregate per-action verdicts (in plan order).
    #[must_use]
    pub fn new(actions: Vec<ActionVerdict>) -> Self {
        Self { actions }
    }

    /// Per-action verdicts, in plan order.
    #[must_use]
    pub fn actions(&self) -> &[ActionVerdict] {
        &self.actions
    }

    /// The plan-level severity: the maximum over all actions.
    ///
    /// An empty plan is allowed.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.actions
            .iter()
            .map(ActionVerdict::severity)
            .max()
            .unwrap_or(Severity::Allowed)
    }

    /// Whether the plan must not run.
    #[must_use]
    pub fn is_denied(&self) -> bool {
        self.severity() == Severity::Denied
    }

    /// Whether the plan needs human approval before it runs.
    #[must_use]
    pub fn requires_confirmation(&self) -> bool {
        self.severity() == Severity::RequiresConfirmation
    }

    /// Whether the plan may run without approval.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.severity() == Severity::Allowed
    }

    /// Human-readable reasons behind the plan-level severity, each prefixed
    /// with its 1-based step number.
    #[must_use]
    pub fn reasons(&self) -> Vec<String> {
        let severity = self.severity();
        self.actions
            .iter()
            .enumerate()
            .filter(|(_, v)| v.severity() == severity)
            .flat_map(|(i, v)| {
                let step = i.saturating_add(1);
                v.reasons()
                    .iter()
                    .map(move |reason| format!("step {step}: {reason}"))
            })
            .collect()
    }
}
