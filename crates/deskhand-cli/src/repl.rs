//! Rustyline-based REPL editor with history and completion.

use std::path::PathBuf;

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::history::DefaultHistory;
use rustyline::{
    CompletionType, Config, Context, EditMode, Editor, Helper, Highlighter, Validator,
};

/// Colon commands available in the REPL.
pub(crate) const REPL_COMMANDS: &[&str] =
    &[":help", ":check", ":history", ":reload", ":audit", ":quit"];

/// Events returned by the REPL editor.
pub(crate) enum ReadlineEvent {
    /// A line of input.
    Line(String),
    /// Ctrl+C at the prompt.
    Interrupted,
    /// Ctrl+D, or the terminal went away.
    Eof,
}

/// Helper that provides colon-command completion and history hints.
#[derive(Helper, Validator, Highlighter)]
struct ReplHelper {
    hinter: HistoryHinter,
}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Colon commands only make sense as the first word.
        let prefix = line.get(..pos).unwrap_or(line);
        if !prefix.starts_with(':') || prefix.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }

        let matches = matching_commands(prefix)
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

fn matching_commands(prefix: &str) -> impl Iterator<Item = &'static str> {
    REPL_COMMANDS.iter().copied().filter(move |cmd| cmd.starts_with(prefix))
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.hinter.hint(line, pos, ctx)
    }
}

/// REPL editor with command history and tab completion.
pub(crate) struct ReplEditor {
    editor: Editor<ReplHelper, DefaultHistory>,
    history_path: Option<PathBuf>,
}

impl ReplEditor {
    /// Create a new REPL editor.
    ///
    /// History is kept in `~/.deskhand/history` when the home directory is
    /// known, and only in memory otherwise.
    pub(crate) fn new() -> anyhow::Result<Self> {
        let history_path = deskhand_config::loader::deskhand_home_dir()
            .ok()
            .and_then(|home| {
                std::fs::create_dir_all(&home).ok()?;
                Some(home.join("history"))
            });

        let config = Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .auto_add_history(true)
            .build();

        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(ReplHelper {
            hinter: HistoryHinter::new(),
        }));
        if let Some(path) = &history_path
            && path.exists()
        {
            let _ = editor.load_history(path);
        }

        Ok(Self {
            editor,
            history_path,
        })
    }

    /// Read one line.
    pub(crate) fn readline(&mut self) -> ReadlineEvent {
        let prompt = "\x1b[1;32mdeskhand> \x1b[0m";

        match self.editor.readline(prompt) {
            Ok(line) => {
                if let Some(path) = &self.history_path {
                    let _ = self.editor.save_history(path);
                }
                ReadlineEvent::Line(line)
            },
            Err(ReadlineError::Interrupted) => ReadlineEvent::Interrupted,
            Err(_) => ReadlineEvent::Eof,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colon_commands_complete() {
        assert_eq!(matching_commands(":hi").collect::<Vec<_>>(), [":history"]);
        assert_eq!(matching_commands(":h").collect::<Vec<_>>(), [":help", ":history"]);
        assert_eq!(matching_commands(":x").count(), 0);
    }
}
