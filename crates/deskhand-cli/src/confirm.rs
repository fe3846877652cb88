//! Terminal confirmation handlers.
//!
//! [`TerminalConfirmation`] shows the plan and asks with `dialoguer`. The
//! prompt blocks, so it runs on the blocking thread pool; the gate's
//! timeout and cancellation still apply while it waits. [`AutoConfirm`]
//! accepts everything and backs `--yes`.

use async_trait::async_trait;
use deskhand_approval::{ConfirmationHandler, ConfirmationRequest, ConfirmationSignal};
use dialoguer::Confirm;
use dialoguer::theme::ColorfulTheme;

use crate::theme::Theme;

/// Asks the person at the terminal.
pub(crate) struct TerminalConfirmation;

#[async_trait]
impl ConfirmationHandler for TerminalConfirmation {
    async fn confirm(&self, request: ConfirmationRequest) -> Option<ConfirmationSignal> {
        println!();
        println!("{}", Theme::header("Confirmation required"));
        for (i, step) in request.steps.iter().enumerate() {
            println!("  {}. {step}", i.saturating_add(1));
        }
        println!("{}", Theme::dimmed("Because:"));
        for reason in &request.reasons {
            println!("  {}", Theme::warning(reason));
        }

        let answer = tokio::task::spawn_blocking(|| {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt("Run this plan?")
                .default(false)
                .interact_opt()
        })
        .await
        .ok()?
        .ok()??;

        Some(if answer {
            ConfirmationSignal::Accept
        } else {
            ConfirmationSignal::Reject
        })
    }
}

/// Accepts every plan that reaches the gate.
///
/// Denied plans never reach a handler, so `--yes` cannot override the
/// policy.
pub(crate) struct AutoConfirm;

#[async_trait]
impl ConfirmationHandler for AutoConfirm {
    async fn confirm(&self, request: ConfirmationRequest) -> Option<ConfirmationSignal> {
        tracing::info!(plan = %request.summary, "Auto-confirming plan");
        Some(ConfirmationSignal::Accept)
    }
}
