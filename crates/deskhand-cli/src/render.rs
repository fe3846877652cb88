//! Terminal rendering of plans, verdicts, reports and failures.

use colored::Colorize;
use deskhand_approval::GateError;
use deskhand_core::{ActionPlan, PlanVerdict};
use deskhand_interpreter::InterpretError;
use deskhand_runtime::{CommandReport, Pipeline, PipelineError};
use tokio_util::sync::CancellationToken;

use crate::theme::Theme;

/// Print the plan with each step's verdict.
pub(crate) fn print_plan(plan: &ActionPlan, verdict: &PlanVerdict) {
    if plan.is_empty() {
        println!("{}", Theme::info("Nothing to do"));
        return;
    }

    println!("\n{}", Theme::header("Plan"));
    for (i, (step, action_verdict)) in plan.steps().iter().zip(verdict.actions()).enumerate() {
        let fatal = if step.is_fatal() { " (fatal)" } else { "" };
        println!(
            "  {}. {}{} [{}]",
            i.saturating_add(1),
            step.action(),
            fatal.dimmed(),
            Theme::severity(action_verdict.severity())
        );
        for reason in action_verdict.reasons() {
            println!("       {}", Theme::dimmed(reason));
        }
    }
    println!("{}", Theme::separator());
    println!("  Verdict: {}", Theme::severity(verdict.severity()));
    println!();
}

/// Print what a command did.
pub(crate) fn print_report(report: &CommandReport) {
    if report.is_noop() {
        println!("{}", Theme::info("Nothing to do"));
        return;
    }

    println!();
    for ((step, detail), outcome) in report.lines().iter().zip(report.outcome.outcomes()) {
        println!("  [{}] {step}", Theme::outcome_tag(outcome));
        for line in detail.lines() {
            println!("         {}", Theme::dimmed(line));
        }
    }
    println!("{}", Theme::separator());

    let summary = report.outcome.summary();
    if report.is_success() {
        println!("{}", Theme::success(&summary));
    } else {
        println!("{}", Theme::warning(&summary));
    }
    println!();
}

/// Print why a command did not run, asking the model to explain refusals
/// and policy denials in plain words.
pub(crate) async fn print_failure(
    pipeline: &Pipeline,
    command: &str,
    err: &PipelineError,
    cancel: &CancellationToken,
) {
    println!("{}", Theme::error(&err.to_string()));

    let reason = match err {
        PipelineError::Interpret(InterpretError::Refused { reason }) => Some(reason.clone()),
        PipelineError::Gate(GateError::PolicyDenied(reasons)) => {
            for reason in reasons {
                println!("  - {reason}");
            }
            Some(reasons.join("; "))
        },
        PipelineError::Gate(GateError::UserRejected) => {
            println!("{}", Theme::info("Nothing was executed."));
            None
        },
        _ => None,
    };

    if let Some(reason) = reason
        && !cancel.is_cancelled()
    {
        let explanation = pipeline.clarify(command, &reason, cancel).await;
        println!("\n{}", explanation.italic());
    }
    println!();
}
