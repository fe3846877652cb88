//! Action executor: runs an approved plan, one action at a time.
//!
//! Actions share one desktop input focus, so they never run in parallel and
//! never reorder. Each driver call runs on the blocking pool under a time
//! budget; a call that overruns is reported as `Failed(Timeout)` right away,
//! but the next step does not start until the overrunning call has
//! returned. Drivers bound their own subprocesses, so that wait is short.
//!
//! With a [`PathGuard`] set, file paths are resolved, symlinks included,
//! on the blocking thread just before the driver sees them. The driver only
//! ever receives the confined absolute path.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use deskhand_approval::{ApprovedPlan, PathGuard};
use deskhand_core::{Action, ActionOutcome, ExecutionError, PlanOutcome, PlanStep};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::driver::{DesktopDriver, DriverError, DriverResult, dispatch, seconds_to_duration};

/// Default per-action time budget.
const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Skip reason once the command has been cancelled.
pub const CANCELLED_REASON: &str = "cancelled";

/// A driver call that outlived its budget and is still running.
type Overrun = JoinHandle<DriverResult>;

/// Sequential executor over a [`DesktopDriver`].
pub struct ActionExecutor {
    driver: Arc<dyn DesktopDriver>,
    action_timeout: Duration,
    path_guard: Option<Arc<PathGuard>>,
}

impl ActionExecutor {
    /// Create an executor with the default time budget and no path guard.
    #[must_use]
    pub fn new(driver: Arc<dyn DesktopDriver>) -> Self {
        Self {
            driver,
            action_timeout: DEFAULT_ACTION_TIMEOUT,
            path_guard: None,
        }
    }

    /// Set the per-action time budget.
    #[must_use]
    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    /// Confine file actions with `guard`.
    #[must_use]
    pub fn with_path_guard(mut self, guard: PathGuard) -> Self {
        self.set_path_guard(guard);
        self
    }

    /// Replace the path guard, e.g. after the policy is reloaded.
    pub fn set_path_guard(&mut self, guard: PathGuard) {
        self.path_guard = Some(Arc::new(guard));
    }

    /// The per-action time budget.
    #[must_use]
    pub fn action_timeout(&self) -> Duration {
        self.action_timeout
    }

    /// Time allowed for `action`. A `wait` gets its own length on top.
    #[must_use]
    pub fn budget_for(&self, action: &Action) -> Duration {
        match action {
            Action::Wait { seconds } => seconds_to_duration(*seconds).saturating_add(self.action_timeout),
            _ => self.action_timeout,
        }
    }

    /// Run every step in order.
    ///
    /// `on_outcome` is called with the step index after each step, including
    /// skipped ones, before the next step starts. Cancellation is checked
    /// between steps only; once it fires, every remaining step is skipped.
    pub async fn execute<F>(
        &self,
        approved: &ApprovedPlan,
        cancel: &CancellationToken,
        mut on_outcome: F,
    ) -> PlanOutcome
    where
        F: FnMut(usize, &PlanStep, &ActionOutcome),
    {
        let steps = approved.steps();
        let mut outcomes = Vec::with_capacity(steps.len());
        let mut halted: Option<String> = None;
        let mut overrun: Option<Overrun> = None;

        for (index, step) in steps.iter().enumerate() {
            let number = index.saturating_add(1);

            if let Some(task) = overrun.take() {
                settle(task, cancel).await;
            }
            if halted.is_none() && cancel.is_cancelled() {
                info!(step = number, "Command cancelled; skipping remaining actions");
                halted = Some(CANCELLED_REASON.to_string());
            }

            let outcome = if let Some(reason) = &halted {
                ActionOutcome::skipped(reason.clone())
            } else {
                let (outcome, still_running) = self.run_step(step.action()).await;
                overrun = still_running;
                if outcome.is_failure() && step.is_fatal() {
                    warn!(step = number, "Fatal step failed; skipping the rest of the plan");
                    halted = Some(format!("step {number} failed and was marked fatal"));
                }
                outcome
            };

            info!(
                step = number,
                action = %step.action().kind(),
                outcome = %outcome,
                "Action finished"
            );
            on_outcome(index, step, &outcome);
            outcomes.push(outcome);
        }

        if let Some(task) = overrun {
            settle(task, cancel).await;
        }
        PlanOutcome::new(outcomes)
    }

    /// Run one action under its time budget, capturing every failure.
    ///
    /// Returns only after the driver call has returned, even when the
    /// outcome is a timeout.
    pub async fn run_action(&self, action: &Action) -> ActionOutcome {
        let (outcome, overrun) = self.run_step(action).await;
        if let Some(task) = overrun {
            let _ = task.await;
        }
        outcome
    }

    async fn run_step(&self, action: &Action) -> (ActionOutcome, Option<Overrun>) {
        let budget = self.budget_for(action);
        let driver = Arc::clone(&self.driver);
        let guard = self.path_guard.clone();
        let owned = action.clone();
        let mut task = tokio::task::spawn_blocking(move || {
            let action = match guard {
                Some(guard) => confine(&guard, owned)?,
                None => owned,
            };
            dispatch(driver.as_ref(), &action)
        });

        let outcome = match tokio::time::timeout(budget, &mut task).await {
            Ok(Ok(Ok(detail))) => ActionOutcome::succeeded(detail),
            Ok(Ok(Err(e))) => ActionOutcome::failed(e.execution_error(), e.to_string()),
            Ok(Err(join_error)) => {
                let detail = if join_error.is_panic() {
                    format!("driver panicked: {}", panic_message(&*join_error.into_panic()))
                } else {
                    format!("driver task failed: {join_error}")
                };
                warn!(action = %action.kind(), %detail, "Driver call aborted");
                ActionOutcome::failed(ExecutionError::Unknown, detail)
            },
            Err(_) => {
                let outcome = ActionOutcome::failed(
                    ExecutionError::Timeout,
                    format!("{} did not finish within {budget:?}", action.kind()),
                );
                return (outcome, Some(task));
            },
        };
        (outcome, None)
    }
}

/// Rewrite file paths to what `guard` allows the driver to open.
fn confine(guard: &PathGuard, action: Action) -> DriverResult<Action> {
    let confined =
        |path: &Path| guard.confine(path).map_err(|e| DriverError::PermissionDenied(e.to_string()));
    Ok(match action {
        Action::FileRead { file_path } => Action::FileRead {
            file_path: confined(&file_path)?,
        },
        Action::FileWrite {
            file_path,
            content,
            mode,
        } => Action::FileWrite {
            file_path: confined(&file_path)?,
            content,
            mode,
        },
        other => other,
    })
}

/// Wait for an overrunning call so it cannot interleave with the next one.
async fn settle(task: Overrun, cancel: &CancellationToken) {
    info!("Waiting for an overrunning driver call to return");
    tokio::select! {
        _ = task => debug!("Overrunning driver call returned"),
        () = cancel.cancelled() => {
            warn!("Cancelled while an overrunning driver call is still running");
        },
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl std::fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("action_timeout", &self.action_timeout)
            .field("path_guard", &self.path_guard)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskhand_approval::{ConfirmationGate, LexicalPath};
    use deskhand_core::{ActionPlan, ActionVerdict, MouseButton, PlanVerdict, ScrollDirection, WriteMode};
    use std::path::Path;
    use std::sync::Mutex;

    /// Records calls; `open_app` fails for "missing", `type_text` sleeps on
    /// "slow", `key_press` panics.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn log(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl DesktopDriver for Recorder {
        fn click(&self, x: i32, y: i32, _button: MouseButton, _clicks: u32) -> DriverResult {
            self.log(format!("click {x},{y}"));
            Ok("clicked".into())
        }

        fn type_text(&self, text: &str) -> DriverResult {
            self.log(format!("type {text}"));
            if text == "slow" {
                std::thread::sleep(Duration::from_millis(300));
                self.log(format!("end type {text}"));
            }
            Ok(format!("typed {}", text.len()))
        }

        fn key_press(&self, key: &str) -> DriverResult {
            panic!("keyboard exploded on {key}");
        }

        fn open_app(&self, app_name: &str) -> DriverResult {
            self.log(format!("open {app_name}"));
            if app_name == "missing" {
                return Err(DriverError::NotFound(app_name.to_string()));
            }
            Ok(format!("launched {app_name}"))
        }

        fn close_app(&self, app_name: &str) -> DriverResult {
            self.log(format!("close {app_name}"));
            Ok("closed".into())
        }

        fn read_file(&self, path: &Path) -> DriverResult {
            Err(DriverError::PermissionDenied(path.display().to_string()))
        }

        fn write_file(&self, path: &Path, _content: &str, _mode: WriteMode) -> DriverResult {
            self.log(format!("write {}", path.display()));
            Ok("written".into())
        }

        fn mouse_move(&self, x: i32, y: i32, _duration: Duration) -> DriverResult {
            self.log(format!("move {x},{y}"));
            Ok("moved".into())
        }

        fn scroll(&self, direction: ScrollDirection, clicks: u32) -> DriverResult {
            self.log(format!("scroll {direction} {clicks}"));
            Ok("scrolled".into())
        }
    }

    async fn approve(plan: ActionPlan) -> ApprovedPlan {
        let verdict = PlanVerdict::new(vec![ActionVerdict::Allowed; plan.len()]);
        ConfirmationGate::new()
            .gate(plan, &verdict, &CancellationToken::new())
            .await
            .unwrap()
    }

    fn open(app: &str) -> Action {
        Action::OpenApp {
            app_name: app.to_string(),
        }
    }

    fn typed(text: &str) -> Action {
        Action::TypeText {
            text: text.to_string(),
        }
    }

    fn write(path: &str) -> Action {
        Action::FileWrite {
            file_path: path.into(),
            content: "hi".to_string(),
            mode: WriteMode::Overwrite,
        }
    }

    fn executor(driver: &Arc<Recorder>) -> ActionExecutor {
        ActionExecutor::new(driver.clone()).with_action_timeout(Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_runs_in_order() {
        let driver = Arc::new(Recorder::default());
        let plan = approve(ActionPlan::from(vec![
            open("gedit"),
            Action::Wait { seconds: 0.0 },
            typed("hello"),
        ]))
        .await;

        let outcome = executor(&driver)
            .execute(&plan, &CancellationToken::new(), |_, _, _| {})
            .await;

        assert!(outcome.all_succeeded());
        assert_eq!(driver.calls(), vec!["open gedit", "type hello"]);
    }

    #[tokio::test]
    async fn test_overrunning_call_returns_before_next_action() {
        let driver = Arc::new(Recorder::default());
        let plan = approve(ActionPlan::from(vec![typed("slow"), open("gedit")])).await;

        let outcome = executor(&driver)
            .execute(&plan, &CancellationToken::new(), |_, _, _| {})
            .await;

        let outcomes = outcome.outcomes();
        assert_eq!(outcomes[0].error(), Some(ExecutionError::Timeout));
        assert!(outcomes[1].is_success());
        assert_eq!(driver.calls(), vec!["type slow", "end type slow", "open gedit"]);
    }

    #[tokio::test]
    async fn test_plan_ends_after_overrunning_last_action() {
        let driver = Arc::new(Recorder::default());
        let plan = approve(ActionPlan::from(vec![typed("slow")])).await;

        let outcome = executor(&driver)
            .execute(&plan, &CancellationToken::new(), |_, _, _| {})
            .await;

        assert_eq!(outcome.outcomes()[0].error(), Some(ExecutionError::Timeout));
        assert_eq!(driver.calls(), vec!["type slow", "end type slow"]);
    }

    #[tokio::test]
    async fn test_path_guard_confines_file_actions() {
        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        let guard = PathGuard::new(
            dir.path(),
            vec![LexicalPath::prefix(&locked.to_string_lossy())],
        );
        let driver = Arc::new(Recorder::default());
        let plan = approve(ActionPlan::from(vec![
            write("notes.txt"),
            write("locked/x.txt"),
            write("elsewhere/../locked/y.txt"),
        ]))
        .await;

        let outcome = executor(&driver)
            .with_path_guard(guard)
            .execute(&plan, &CancellationToken::new(), |_, _, _| {})
            .await;

        let outcomes = outcome.outcomes();
        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[1].error(), Some(ExecutionError::PermissionDenied));
        assert_eq!(outcomes[2].error(), Some(ExecutionError::PermissionDenied));
        let expected = std::fs::canonicalize(dir.path()).unwrap().join("notes.txt");
        assert_eq!(driver.calls(), vec![format!("write {}", expected.display())]);
    }

    #[tokio::test]
    async fn test_driver_errors_are_classified() {
        let driver = Arc::new(Recorder::default());
        let plan = approve(ActionPlan::from(vec![
            open("missing"),
            Action::FileRead {
                file_path: "secret.txt".into(),
            },
        ]))
        .await;

        let outcome = executor(&driver)
            .execute(&plan, &CancellationToken::new(), |_, _, _| {})
            .await;

        assert_eq!(outcome.outcomes()[0].error(), Some(ExecutionError::TargetNotFound));
        assert_eq!(outcome.outcomes()[1].error(), Some(ExecutionError::PermissionDenied));
    }

    #[tokio::test]
    async fn test_panic_is_captured() {
        let driver = Arc::new(Recorder::default());
        let plan = approve(ActionPlan::from(vec![
            Action::KeyPress {
                key: "ctrl+s".to_string(),
            },
            typed("after"),
        ]))
        .await;

        let outcome = executor(&driver)
            .execute(&plan, &CancellationToken::new(), |_, _, _| {})
            .await;

        let ActionOutcome::Failed { error, detail } = &outcome.outcomes()[0] else {
            panic!("expected failure");
        };
        assert_eq!(*error, ExecutionError::Unknown);
        assert!(detail.contains("keyboard exploded"));
        assert!(outcome.outcomes()[1].is_success());
    }

    #[tokio::test]
    async fn test_fatal_failure_skips_rest() {
        let driver = Arc::new(Recorder::default());
        let plan = approve(ActionPlan::new(vec![
            PlanStep::fatal(open("missing")),
            PlanStep::new(typed("hello")),
            PlanStep::new(open("gedit")),
        ]))
        .await;

        let outcome = executor(&driver)
            .execute(&plan, &CancellationToken::new(), |_, _, _| {})
            .await;

        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.skipped(), 2);
        assert_eq!(driver.calls(), vec!["open missing"]);
    }

    #[tokio::test]
    async fn test_non_fatal_failure_continues() {
        let driver = Arc::new(Recorder::default());
        let plan = approve(ActionPlan::from(vec![open("missing"), typed("hello")])).await;

        let outcome = executor(&driver)
            .execute(&plan, &CancellationToken::new(), |_, _, _| {})
            .await;

        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.succeeded(), 1);
    }

    #[tokio::test]
    async fn test_cancel_between_actions() {
        let driver = Arc::new(Recorder::default());
        let plan = approve(ActionPlan::from(vec![open("gedit"), typed("a"), typed("b")])).await;
        let cancel = CancellationToken::new();

        let outcome = executor(&driver)
            .execute(&plan, &cancel, |index, _, _| {
                if index == 0 {
                    cancel.cancel();
                }
            })
            .await;

        let outcomes = outcome.outcomes();
        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[1], ActionOutcome::skipped(CANCELLED_REASON));
        assert_eq!(outcomes[2], ActionOutcome::skipped(CANCELLED_REASON));
        assert_eq!(driver.calls(), vec!["open gedit"]);
    }

    #[tokio::test]
    async fn test_on_outcome_sees_every_step() {
        let driver = Arc::new(Recorder::default());
        let plan = approve(ActionPlan::new(vec![
            PlanStep::fatal(open("missing")),
            PlanStep::new(typed("x")),
        ]))
        .await;
        let mut seen = Vec::new();

        executor(&driver)
            .execute(&plan, &CancellationToken::new(), |index, step, outcome| {
                seen.push((index, step.action().kind(), outcome.is_skipped()));
            })
            .await;

        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, 0);
        assert!(seen[1].2);
    }

    #[test]
    fn test_wait_budget_includes_wait() {
        let driver: Arc<dyn DesktopDriver> = Arc::new(Recorder::default());
        let executor = ActionExecutor::new(driver).with_action_timeout(Duration::from_secs(10));
        assert_eq!(
            executor.budget_for(&Action::Wait { seconds: 5.0 }),
            Duration::from_secs(15)
        );
        assert_eq!(executor.budget_for(&open("gedit")), Duration::from_secs(10));
    }
}
