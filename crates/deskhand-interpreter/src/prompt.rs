//! The instruction schema sent with every command.

use std::path::PathBuf;

use deskhand_core::Action;
use directories::BaseDirs;
use serde::Serialize;

use crate::history::{CommandHistory, HistoryEntry, PROMPT_HISTORY_LEN};

/// System prompt: the ten action kinds, their fields, the `fatal` flag and
/// the refusal form.
pub const SYSTEM_PROMPT: &str = r#"You convert natural-language commands into desktop automation plans.

Respond with exactly one JSON object and nothing else.

PLAN FORMAT:
{
  "reasoning": "one sentence on what the user wants",
  "actions": [ <action>, ... ]
}

Actions run in order. Add "fatal": true to an action when later actions make
no sense if it fails (for example opening the application you then type into).

ACTIONS (use only these, with exactly these fields):
- {"action": "click", "x": 100, "y": 200, "button": "left", "clicks": 1}     button: left|right|middle, optional; clicks optional
- {"action": "type_text", "text": "hello world"}
- {"action": "key_press", "key": "ctrl+s"}                                 combinations joined with +
- {"action": "open_app", "app_name": "notepad.exe"}
- {"action": "close_app", "app_name": "notepad.exe"}
- {"action": "file_read", "file_path": "notes/todo.txt"}
- {"action": "file_write", "file_path": "notes/todo.txt", "content": "text", "mode": "overwrite"}   mode: overwrite|append, optional
- {"action": "mouse_move", "x": 100, "y": 200, "duration_ms": 250}        duration_ms optional
- {"action": "scroll", "direction": "down", "clicks": 3}                   direction: up|down; clicks optional
- {"action": "wait", "seconds": 2}

RULES:
- Never produce shell commands or scripts.
- Only use the action kinds above.
- If the command is ambiguous, dangerous, or cannot be expressed with these
  actions, respond instead with:
  {"refusal": "why the command cannot be carried out"}
- If the command needs no action at all, respond with {"actions": []}."#;

/// Facts about the machine sent along with the command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptContext {
    /// Operating system family.
    pub platform: String,
    /// Directory relative paths resolve against.
    pub working_directory: Option<PathBuf>,
    /// The user's home directory.
    pub home_directory: Option<PathBuf>,
}

impl PromptContext {
    /// Context of the running process.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            platform: std::env::consts::OS.to_string(),
            working_directory: std::env::current_dir().ok(),
            home_directory: BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf()),
        }
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// The user message for `command`, with the last few commands from
    /// `history` and the actions of the latest one.
    #[must_use]
    pub fn user_message(&self, command: &str, history: &CommandHistory) -> String {
        let context = MessageContext {
            machine: self,
            recent_commands: history.recent(PROMPT_HISTORY_LEN).collect(),
            last_action: history.last().map(|entry| entry.actions.as_slice()),
        };
        let context = serde_json::to_string_pretty(&context).unwrap_or_default();
        format!("User command: {command}\nContext: {context}\n\nRespond with the plan JSON.")
    }
}

#[derive(Serialize)]
struct MessageContext<'a> {
    #[serde(flatten)]
    machine: &'a PromptContext,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    recent_commands: Vec<&'a HistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_action: Option<&'a [Action]>,
}

impl Default for PromptContext {
    fn default() -> Self {
        Self::detect()
    }
}

/// System prompt for [`clarify`](crate::PlanInterpreter::clarify).
pub(crate) const CLARIFY_SYSTEM_PROMPT: &str =
    "You are a helpful assistant explaining why commands cannot be executed.";

/// User message asking why `command` failed.
pub(crate) fn clarify_message(command: &str, reason: &str) -> String {
    format!(
        "The user's command \"{command}\" could not be executed because: {reason}\n\n\
         In a few sentences, explain why, suggest what they might try instead, \
         and mention any safety considerations. Reply in plain text, not JSON."
    )
}
