//! `deskhand check` and `run --dry-run`: interpret and validate only.

use crate::commands::CtrlCGuard;
use crate::render::{print_failure, print_plan};
use crate::setup::Session;

/// Show the plan for `command` and its verdict. Returns `false` if the plan
/// could not be produced or would be denied.
pub(crate) async fn check_command(session: &Session, command: &str) -> bool {
    let guard = CtrlCGuard::install();
    let cancel = guard.token();

    match session.pipeline.check(command, cancel).await {
        Ok((plan, verdict)) => {
            print_plan(&plan, &verdict);
            !verdict.is_denied()
        },
        Err(err) => {
            print_failure(&session.pipeline, command, &err, cancel).await;
            false
        },
    }
}
