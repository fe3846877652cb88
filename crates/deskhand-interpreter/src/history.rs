//! Recent commands, sent with each request so follow-ups such as "now save
//! it" can refer to what just happened.

use std::collections::VecDeque;

use deskhand_core::{Action, ActionPlan, Timestamp};
use serde::Serialize;

/// Commands included in each prompt.
pub const PROMPT_HISTORY_LEN: usize = 3;

/// Commands kept for `:history`.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// A command that was interpreted and run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    /// The command as typed.
    pub command: String,
    /// Plan summary, e.g. `2 actions: open_app, type_text`.
    pub plan: String,
    /// Outcome summary, e.g. `2 succeeded`.
    pub outcome: String,
    /// The actions that were planned.
    #[serde(skip)]
    pub actions: Vec<Action>,
    /// When the command finished.
    #[serde(skip)]
    pub at: Timestamp,
}

impl HistoryEntry {
    /// Record `command`, its plan, and how it went.
    #[must_use]
    pub fn new(command: impl Into<String>, plan: &ActionPlan, outcome: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            plan: plan.summary(),
            outcome: outcome.into(),
            actions: plan.actions().cloned().collect(),
            at: Timestamp::now(),
        }
    }
}

/// Bounded list of recent commands, oldest first.
#[derive(Debug, Clone)]
pub struct CommandHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl CommandHistory {
    /// Keep at most `capacity` commands. Zero keeps none.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add `entry`, dropping the oldest once full.
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// The last `n` commands, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }

    /// The most recent command.
    #[must_use]
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Every retained command, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Number of retained commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
