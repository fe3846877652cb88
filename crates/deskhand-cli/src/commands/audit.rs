//! Audit command - view and verify the audit trail.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use colored::Colorize;
use deskhand_audit::{AuditEntry, read_jsonl, verify_chain};
use deskhand_config::Config;
use deskhand_runtime::config_bridge;

use crate::theme::Theme;

/// The audit file to read: `--path`, else the configured trail.
pub(crate) fn resolve_path(cfg: &Config, explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    match config_bridge::audit_path(cfg)? {
        Some(path) => Ok(path),
        None => bail!("audit persistence is disabled; pass --path to read a trail file"),
    }
}

fn load(path: &Path) -> Result<Vec<AuditEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    Ok(read_jsonl(path)?)
}

/// Show audit entries, newest last.
///
/// `command` filters by command ID prefix. `limit` keeps the last N entries.
pub(crate) fn show_audit_entries(
    path: &Path,
    command: Option<&str>,
    limit: usize,
    json: bool,
) -> Result<()> {
    let entries = load(path)?;
    let command = command.map(|c| c.trim_start_matches("cmd:"));
    let selected: Vec<&AuditEntry> = entries
        .iter()
        .filter(|e| command.is_none_or(|prefix| e.command_id.0.to_string().starts_with(prefix)))
        .collect();
    let skip = selected.len().saturating_sub(limit);
    let selected = selected.get(skip..).unwrap_or_default();

    if json {
        for entry in selected {
            println!("{}", serde_json::to_string(entry)?);
        }
        return Ok(());
    }

    if selected.is_empty() {
        println!("{}", Theme::info("No audit entries"));
        return Ok(());
    }

    println!("\n{}", Theme::header("Audit Entries"));
    println!(
        "{:>6} {:>20} {:>8} {:>9} {:>21} {}",
        "SEQ".dimmed(),
        "TIMESTAMP".dimmed(),
        "COMMAND".dimmed(),
        "STAGE".dimmed(),
        "STATUS".dimmed(),
        "DETAIL".dimmed()
    );
    println!("{}", Theme::separator());

    for entry in selected {
        let timestamp = entry.timestamp.0.format("%Y-%m-%d %H:%M:%S").to_string();
        println!(
            "{:>6} {:>20} {:>8} {:>9} {:>21} {}",
            entry.sequence,
            timestamp.dimmed(),
            Theme::command_id(&entry.command_id.0.to_string()),
            entry.stage.as_str(),
            Theme::audit_status(entry.status),
            entry.output_summary.lines().next().unwrap_or_default()
        );
    }

    println!();
    Ok(())
}

/// Verify the hash chain of the whole trail.
pub(crate) fn verify_audit_chain(path: &Path) -> Result<bool> {
    let entries = load(path)?;
    if entries.is_empty() {
        println!("{}", Theme::info("No audit entries"));
        return Ok(true);
    }

    let result = verify_chain(&entries);
    if result.valid {
        println!(
            "{}",
            Theme::success(&format!(
                "{} verified: {} entries, no issues",
                path.display(),
                result.entries_verified
            ))
        );
    } else {
        println!(
            "{}",
            Theme::error(&format!(
                "{} has {} issues:",
                path.display(),
                result.issues.len()
            ))
        );
        for issue in &result.issues {
            println!("  - {issue}");
        }
    }
    Ok(result.valid)
}
