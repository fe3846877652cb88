//! Deskhand CLI - natural-language desktop automation.
//!
//! Commands are turned into action plans by a language model, checked
//! against the local safety policy, confirmed where the policy says so,
//! executed, and recorded in the audit trail.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod confirm;
mod render;
mod repl;
mod setup;
mod theme;

use commands::{audit, check, config, interactive, run};
use deskhand_runtime::config_bridge;
use setup::Session;

/// Deskhand - natural-language desktop automation
#[derive(Parser)]
#[command(name = "deskhand")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file layered over the system and user files
    #[arg(short, long, global = true, env = "DESKHAND_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one command
    Run {
        /// The command, in plain language
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        command: Vec<String>,

        /// Accept plans that need confirmation without asking
        #[arg(short, long)]
        yes: bool,

        /// Show the plan and its verdict without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Read commands interactively
    Repl {
        /// Accept plans that need confirmation without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Interpret and validate a command without running it
    Check {
        /// The command, in plain language
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// View and verify the audit trail
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum AuditCommands {
    /// Show audit entries
    Show {
        /// Audit file (defaults to the configured trail)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Only entries whose command ID starts with this
        #[arg(long)]
        command: Option<String>,
        /// Show at most this many of the latest entries
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        /// Print raw JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Verify audit chain integrity
    Verify {
        /// Audit file (defaults to the configured trail)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show resolved configuration with source annotations
    Show {
        /// Output format (toml or json)
        #[arg(short, long, default_value = "toml")]
        format: String,
        /// Show only a specific section (e.g. policy, confirmation)
        #[arg(short, long)]
        section: Option<String>,
    },
    /// Validate the current configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let resolved = setup::load_config(cli.config.as_deref())?;
    let cfg = &resolved.config;

    let mut log_config = config_bridge::to_log_config(&cfg.logging);
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    let _log_guard = match deskhand_telemetry::setup_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        },
    };

    let ok = match cli.command {
        Some(Commands::Run {
            command,
            yes,
            dry_run,
        }) => {
            let command = command.join(" ");
            let session = Session::start(cfg, cli.config.as_deref(), yes)?;
            let ok = if dry_run {
                check::check_command(&session, &command).await
            } else {
                run::run_command(&session, &command).await
            };
            session.pipeline.shutdown().await?;
            ok
        },
        Some(Commands::Check { command }) => {
            let session = Session::start(cfg, cli.config.as_deref(), false)?;
            let ok = check::check_command(&session, &command.join(" ")).await;
            session.pipeline.shutdown().await?;
            ok
        },
        Some(Commands::Audit { command }) => match command {
            AuditCommands::Show {
                path,
                command,
                limit,
                json,
            } => {
                let path = audit::resolve_path(cfg, path)?;
                audit::show_audit_entries(&path, command.as_deref(), limit, json)?;
                true
            },
            AuditCommands::Verify { path } => {
                let path = audit::resolve_path(cfg, path)?;
                audit::verify_audit_chain(&path)?
            },
        },
        Some(Commands::Config { command }) => {
            match command {
                ConfigCommands::Show { format, section } => {
                    config::show_config(&resolved, &format, section.as_deref())?;
                },
                ConfigCommands::Validate => config::validate_config(&resolved),
            }
            true
        },
        Some(Commands::Repl { yes }) => {
            let session = Session::start(cfg, cli.config.as_deref(), yes)?;
            interactive::run_repl(&session).await?;
            true
        },
        None => {
            // Default to the REPL.
            let session = Session::start(cfg, cli.config.as_deref(), false)?;
            interactive::run_repl(&session).await?;
            true
        },
    };

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_joins_words() {
        let cli = Cli::parse_from(["deskhand", "run", "--yes", "open", "chrome.exe"]);
        let Some(Commands::Run {
            command,
            yes,
            dry_run,
        }) = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(command.join(" "), "open chrome.exe");
        assert!(yes);
        assert!(!dry_run);
    }

    #[test]
    fn test_run_requires_a_command() {
        assert!(Cli::try_parse_from(["deskhand", "run"]).is_err());
    }
}
