//! CLI theme and styling.

use colored::Colorize;
use deskhand_audit::AuditStatus;
use deskhand_core::{ActionOutcome, Severity};

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(50).dimmed().to_string()
    }

    /// Format a verdict severity.
    pub(crate) fn severity(severity: Severity) -> String {
        match severity {
            Severity::Allowed => "allowed".green().to_string(),
            Severity::RequiresConfirmation => "needs confirmation".yellow().to_string(),
            Severity::Denied => "denied".red().bold().to_string(),
        }
    }

    /// Format an action outcome as a one-word tag.
    pub(crate) fn outcome_tag(outcome: &ActionOutcome) -> String {
        match outcome {
            ActionOutcome::Succeeded { .. } => "OK".green().to_string(),
            ActionOutcome::Failed { .. } => "FAIL".red().to_string(),
            ActionOutcome::Skipped { .. } => "SKIP".dimmed().to_string(),
        }
    }

    /// Format an audit status.
    pub(crate) fn audit_status(status: AuditStatus) -> String {
        let text = status.as_str();
        match status {
            AuditStatus::Succeeded | AuditStatus::Allowed => text.green().to_string(),
            AuditStatus::RequiresConfirmation | AuditStatus::Skipped => text.yellow().to_string(),
            AuditStatus::Failed | AuditStatus::Denied | AuditStatus::Rejected => {
                text.red().to_string()
            },
            AuditStatus::Cancelled => text.dimmed().to_string(),
        }
    }

    /// Format a command ID (shortened).
    pub(crate) fn command_id(id: &str) -> String {
        let short = id.get(..8).unwrap_or(id);
        format!("{}", short.cyan())
    }
}

/// Print a banner for the CLI.
pub(crate) fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "{} {}",
        "deskhand".bold().cyan(),
        format!("v{version}").dimmed()
    );
    println!(
        "{}",
        Theme::dimmed("Type a command in plain language. :help for REPL commands, :quit to leave.")
    );
    println!();
}
