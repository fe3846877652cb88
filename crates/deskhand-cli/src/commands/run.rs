//! `deskhand run`: one command through the whole pipeline.

use crate::commands::CtrlCGuard;
use crate::render::{print_failure, print_report};
use crate::setup::Session;

/// Run `command`. Returns whether every action succeeded.
pub(crate) async fn run_command(session: &Session, command: &str) -> bool {
    let guard = CtrlCGuard::install();
    let cancel = guard.token();

    match session.pipeline.run(command, cancel).await {
        Ok(report) => {
            print_report(&report);
            report.is_success()
        },
        Err(err) => {
            print_failure(&session.pipeline, command, &err, cancel).await;
            false
        },
    }
}
