//! `deskhand repl`: read commands until `:quit`.

use anyhow::Result;

use crate::commands::{check, run};
use crate::repl::{REPL_COMMANDS, ReadlineEvent, ReplEditor};
use crate::setup::Session;
use crate::theme::{Theme, print_banner};

/// Audit entries shown by `:audit`.
const RECENT_AUDIT_ENTRIES: usize = 12;

/// What the loop should do after a line.
enum Flow {
    Continue,
    Quit,
}

/// Run the interactive loop, then flush the audit trail.
pub(crate) async fn run_repl(session: &Session) -> Result<()> {
    print_banner();
    let mut editor = ReplEditor::new()?;

    loop {
        match editor.readline() {
            ReadlineEvent::Line(line) => {
                if let Flow::Quit = handle_line(session, line.trim()).await {
                    break;
                }
            },
            ReadlineEvent::Interrupted => {
                println!("{}", Theme::dimmed("(type :quit to leave)"));
            },
            ReadlineEvent::Eof => break,
        }
    }

    session.pipeline.shutdown().await?;
    Ok(())
}

async fn handle_line(session: &Session, line: &str) -> Flow {
    if line.is_empty() {
        return Flow::Continue;
    }
    if !line.starts_with(':') {
        run::run_command(session, line).await;
        return Flow::Continue;
    }

    let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    match name {
        ":quit" | ":q" | ":exit" => return Flow::Quit,
        ":help" => print_help(),
        ":check" if !rest.trim().is_empty() => {
            check::check_command(session, rest.trim()).await;
        },
        ":check" => println!("{}", Theme::warning("usage: :check <command>")),
        ":reload" => match session.reload_policy() {
            Ok(()) => println!("{}", Theme::success("Safety policy reloaded")),
            Err(e) => println!("{}", Theme::error(&format!("{e:#}"))),
        },
        ":audit" => print_recent_audit(session),
        ":history" => print_history(session),
        _ => println!(
            "{}",
            Theme::warning(&format!("unknown command {name}; try :help"))
        ),
    }
    Flow::Continue
}

fn print_help() {
    println!("\n{}", Theme::header("REPL commands"));
    for cmd in REPL_COMMANDS {
        println!("  {cmd:<10} {}", Theme::dimmed(command_help(cmd)));
    }
    println!(
        "\n{}\n",
        Theme::dimmed("Anything else is run as a command. Ctrl-C cancels a running command.")
    );
}

fn command_help(cmd: &str) -> &'static str {
    match cmd {
        ":help" => "show this list",
        ":check" => "interpret and validate a command without running it",
        ":history" => "show the commands run in this session",
        ":reload" => "re-read the configuration and apply its safety policy",
        ":audit" => "show the most recent audit entries",
        ":quit" => "leave (Ctrl-D works too)",
        _ => "",
    }
}

fn print_history(session: &Session) {
    let history = session.pipeline.history();
    if history.is_empty() {
        println!("{}", Theme::info("No commands yet"));
        return;
    }
    for (number, entry) in history.iter().enumerate() {
        println!(
            "  {:>2}. {} {} {}",
            number.saturating_add(1),
            entry.command,
            Theme::dimmed(&format!("-> {}", entry.plan)),
            Theme::dimmed(&format!("({})", entry.outcome))
        );
    }
}

fn print_recent_audit(session: &Session) {
    let entries = match session.pipeline.audit().entries() {
        Ok(entries) => entries,
        Err(e) => {
            println!("{}", Theme::error(&e.to_string()));
            return;
        },
    };
    let skip = entries.len().saturating_sub(RECENT_AUDIT_ENTRIES);
    for entry in entries.iter().skip(skip) {
        println!(
            "  {} {:<9} {} {}",
            Theme::command_id(&entry.command_id.0.to_string()),
            entry.stage.as_str(),
            Theme::audit_status(entry.status),
            Theme::dimmed(&entry.output_summary)
        );
    }
    if entries.is_empty() {
        println!("{}", Theme::info("No audit entries"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_repl_command_has_help() {
        for cmd in REPL_COMMANDS {
            assert!(!command_help(cmd).is_empty(), "{cmd} has no help line");
        }
        assert!(REPL_COMMANDS.contains(&":history"));
    }
}
