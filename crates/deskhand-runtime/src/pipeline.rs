//! The command pipeline.
//!
//! # Flow
//!
//! ```text
//! command -> interpret -> validate -> gate -> execute -> report
//!               |            |          |         |
//!               +------------+----------+---------+--> audit trail
//! ```
//!
//! Commands are serialized: [`Pipeline::run`] holds a single-slot lock for
//! the whole command. Each stage records one audit entry (one per action
//! for `execute`) before the next stage starts. If that record fails before
//! execution, the command stops; once execution has started, failures to
//! record are logged and the outcome is still returned.

use std::sync::{Arc, PoisonError, RwLock};

use deskhand_approval::{ApprovedPlan, ConfirmationGate, GateError, SafetyPolicy};
use deskhand_audit::{AuditStage, AuditStatus, AuditTrail};
use deskhand_automation::ActionExecutor;
use deskhand_core::{
    ActionOutcome, ActionPlan, CommandId, PlanStep, PlanVerdict, Severity, summarize,
};
use deskhand_interpreter::{HistoryEntry, InterpretError, PlanInterpreter};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::report::CommandReport;

/// Characters of command text kept in audit summaries.
const COMMAND_SUMMARY_CHARS: usize = 200;

/// Characters of an outcome detail kept in audit summaries.
const OUTCOME_SUMMARY_CHARS: usize = 300;

/// Process-wide pipeline state.
pub struct PipelineContext {
    interpreter: PlanInterpreter,
    policy: RwLock<Arc<SafetyPolicy>>,
    gate: ConfirmationGate,
    /// The desktop: one executor, one plan at a time.
    desktop: Mutex<ActionExecutor>,
    audit: Arc<AuditTrail>,
    command_slot: Mutex<()>,
}

/// Handle to a running pipeline. Cheap to clone.
#[derive(Clone)]
pub struct Pipeline {
    context: Arc<PipelineContext>,
}

impl Pipeline {
    /// Start building a pipeline.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The audit trail.
    #[must_use]
    pub fn audit(&self) -> &Arc<AuditTrail> {
        &self.context.audit
    }

    /// The policy the next command will be validated against.
    #[must_use]
    pub fn policy(&self) -> Arc<SafetyPolicy> {
        let policy = self
            .context
            .policy
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&policy)
    }

    /// Replace the policy. Takes effect for commands started afterwards;
    /// a command already running keeps the policy it started with.
    pub fn reload_policy(&self, policy: SafetyPolicy) {
        let mut current = self
            .context
            .policy
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(policy);
        info!("Safety policy reloaded");
    }

    /// Run one command through every stage.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Interpret`] if no plan could be produced
    /// - [`PipelineError::Gate`] if the plan was denied, rejected, not
    ///   confirmed in time, or the command was cancelled while waiting
    /// - [`PipelineError::Audit`] if a stage could not be recorded before
    ///   execution started
    pub async fn run(
        &self,
        command: &str,
        cancel: &CancellationToken,
    ) -> PipelineResult<CommandReport> {
        let _slot = self.context.command_slot.lock().await;
        let command_id = CommandId::new();
        let policy = self.policy();
        info!(command_id = %command_id, "Running command");

        let Some(plan) = self.interpret(command_id, command, cancel).await? else {
            return Ok(CommandReport::empty(command_id, command));
        };
        let verdict = self.validate(command_id, &policy, &plan)?;
        let approved = self.gate(command_id, plan.clone(), &verdict, cancel).await?;
        let confirmed = approved.was_confirmed();

        let outcome = {
            let mut executor = self.context.desktop.lock().await;
            // File paths are confined by the same policy snapshot that validated them.
            executor.set_path_guard(policy.path_guard());
            executor
                .execute(&approved, cancel, |_, step, outcome| {
                    self.record_outcome(command_id, step, outcome);
                })
                .await
        };
        info!(
            command_id = %command_id,
            summary = %outcome.summary(),
            "Command finished"
        );
        self.context
            .interpreter
            .remember(HistoryEntry::new(command, &plan, outcome.summary()));

        Ok(CommandReport {
            command_id,
            command: command.to_string(),
            plan,
            verdict,
            confirmed,
            outcome,
        })
    }

    /// Interpret and validate only. Nothing is gated or executed.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Interpret`] or [`PipelineError::Audit`], as for
    /// [`run`](Self::run).
    pub async fn check(
        &self,
        command: &str,
        cancel: &CancellationToken,
    ) -> PipelineResult<(ActionPlan, PlanVerdict)> {
        let _slot = self.context.command_slot.lock().await;
        let command_id = CommandId::new();
        let policy = self.policy();

        let Some(plan) = self.interpret(command_id, command, cancel).await? else {
            return Ok((ActionPlan::empty(), PlanVerdict::new(Vec::new())));
        };
        let verdict = self.validate(command_id, &policy, &plan)?;
        Ok((plan, verdict))
    }

    /// Commands run so far in this session, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.context.interpreter.history()
    }

    /// Ask the model to explain a failed command to the user.
    pub async fn clarify(&self, command: &str, reason: &str, cancel: &CancellationToken) -> String {
        self.context.interpreter.clarify(command, reason, cancel).await
    }

    /// Wait for the running command, if any, then flush the audit trail.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Audit`] if the flush fails.
    pub async fn shutdown(&self) -> PipelineResult<()> {
        let _slot = self.context.command_slot.lock().await;
        self.context.audit.flush()?;
        info!("Pipeline shut down");
        Ok(())
    }

    /// Interpret stage. `None` means an empty plan; the command ends there.
    async fn interpret(
        &self,
        command_id: CommandId,
        command: &str,
        cancel: &CancellationToken,
    ) -> PipelineResult<Option<ActionPlan>> {
        let input = summarize(command, COMMAND_SUMMARY_CHARS);
        match self.context.interpreter.interpret(command, cancel).await {
            Ok(plan) => {
                self.context.audit.record(
                    command_id,
                    AuditStage::Interpret,
                    input,
                    plan.summary(),
                    AuditStatus::Succeeded,
                )?;
                Ok((!plan.is_empty()).then_some(plan))
            },
            Err(err) => {
                warn!(command_id = %command_id, error = %err, "Interpretation failed");
                let status = match err {
                    InterpretError::Refused { .. } => AuditStatus::Rejected,
                    InterpretError::Cancelled => AuditStatus::Cancelled,
                    InterpretError::SchemaViolation(_) | InterpretError::ServiceUnavailable { .. } => {
                        AuditStatus::Failed
                    },
                };
                self.context.audit.record(
                    command_id,
                    AuditStage::Interpret,
                    input,
                    err.to_string(),
                    status,
                )?;
                Err(err.into())
            },
        }
    }

    /// Validate stage.
    fn validate(
        &self,
        command_id: CommandId,
        policy: &SafetyPolicy,
        plan: &ActionPlan,
    ) -> PipelineResult<PlanVerdict> {
        let verdict = policy.validate(plan);
        let (status, output) = match verdict.severity() {
            Severity::Allowed => (AuditStatus::Allowed, "allowed".to_string()),
            Severity::RequiresConfirmation => (
                AuditStatus::RequiresConfirmation,
                verdict.reasons().join("; "),
            ),
            Severity::Denied => (AuditStatus::Denied, verdict.reasons().join("; ")),
        };
        info!(command_id = %command_id, verdict = %verdict.severity(), "Plan validated");
        self.context.audit.record(
            command_id,
            AuditStage::Validate,
            plan.summary(),
            output,
            status,
        )?;
        Ok(verdict)
    }

    /// Gate stage.
    async fn gate(
        &self,
        command_id: CommandId,
        plan: ActionPlan,
        verdict: &PlanVerdict,
        cancel: &CancellationToken,
    ) -> PipelineResult<ApprovedPlan> {
        let summary = plan.summary();
        match self.context.gate.gate(plan, verdict, cancel).await {
            Ok(approved) => {
                let output = if approved.was_confirmed() {
                    "confirmed by user"
                } else {
                    "approved by policy"
                };
                self.context.audit.record(
                    command_id,
                    AuditStage::Gate,
                    summary,
                    output,
                    AuditStatus::Allowed,
                )?;
                Ok(approved)
            },
            Err(err) => {
                warn!(command_id = %command_id, error = %err, "Plan not approved");
                let status = match err {
                    GateError::PolicyDenied(_) => AuditStatus::Denied,
                    GateError::UserRejected | GateError::Timeout => AuditStatus::Rejected,
                    GateError::Cancelled => AuditStatus::Cancelled,
                };
                self.context.audit.record(
                    command_id,
                    AuditStage::Gate,
                    summary,
                    err.to_string(),
                    status,
                )?;
                Err(err.into())
            },
        }
    }

    /// Execute-stage entry for one step. Never fails the command.
    fn record_outcome(&self, command_id: CommandId, step: &PlanStep, outcome: &ActionOutcome) {
        let status = match outcome {
            ActionOutcome::Succeeded { .. } => AuditStatus::Succeeded,
            ActionOutcome::Failed { .. } => AuditStatus::Failed,
            ActionOutcome::Skipped { .. } => AuditStatus::Skipped,
        };
        if let Err(e) = self.context.audit.record(
            command_id,
            AuditStage::Execute,
            step.action().to_string(),
            summarize(&outcome.to_string(), OUTCOME_SUMMARY_CHARS),
            status,
        ) {
            error!(
                command_id = %command_id,
                error = %e,
                "Failed to record action outcome in the audit trail"
            );
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("interpreter", &self.context.interpreter)
            .field("gate", &self.context.gate)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    interpreter: Option<PlanInterpreter>,
    policy: Option<SafetyPolicy>,
    gate: Option<ConfirmationGate>,
    executor: Option<ActionExecutor>,
    audit: Option<Arc<AuditTrail>>,
}

impl PipelineBuilder {
    /// The interpreter. Required.
    #[must_use]
    pub fn interpreter(mut self, interpreter: PlanInterpreter) -> Self {
        self.interpreter = Some(interpreter);
        self
    }

    /// The initial safety policy. Required.
    #[must_use]
    pub fn policy(mut self, policy: SafetyPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// The confirmation gate. Defaults to a gate without a handler, which
    /// refuses every plan that needs confirmation.
    #[must_use]
    pub fn gate(mut self, gate: ConfirmationGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// The executor. Required.
    #[must_use]
    pub fn executor(mut self, executor: ActionExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    /// The audit trail. Defaults to an in-memory trail.
    #[must_use]
    pub fn audit(mut self, audit: Arc<AuditTrail>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Assemble the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Setup`] if a required part is missing.
    pub fn build(self) -> PipelineResult<Pipeline> {
        let interpreter = self
            .interpreter
            .ok_or_else(|| PipelineError::Setup("no interpreter configured".to_string()))?;
        let policy = self
            .policy
            .ok_or_else(|| PipelineError::Setup("no safety policy configured".to_string()))?;
        let executor = self
            .executor
            .ok_or_else(|| PipelineError::Setup("no executor configured".to_string()))?;

        Ok(Pipeline {
            context: Arc::new(PipelineContext {
                interpreter,
                policy: RwLock::new(Arc::new(policy)),
                gate: self.gate.unwrap_or_default(),
                desktop: Mutex::new(executor),
                audit: self
                    .audit
                    .unwrap_or_else(|| Arc::new(AuditTrail::in_memory())),
                command_slot: Mutex::new(()),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskhand_audit::{AuditEntry, AuditError, AuditResult, AuditSink, MemoryAuditSink};
    use deskhand_core::RetryPolicy;
    use deskhand_llm::LlmProvider;
    use deskhand_approval::ConfirmationPolicy;
    use deskhand_core::ExecutionError;
    use deskhand_test::{
        MockDriver, MockLlmProvider, MockLlmTurn, plan_response, scratch_dir, test_policy,
        test_policy_builder,
    };
    use serde_json::json;

    /// Delegates to memory, but refuses entries of one stage.
    struct RefusingSink {
        inner: MemoryAuditSink,
        refuse: Option<AuditStage>,
    }

    impl AuditSink for RefusingSink {
        fn name(&self) -> &str {
            "refusing"
        }

        fn append(&self, entry: &AuditEntry) -> AuditResult<()> {
            match self.refuse {
                Some(stage) if stage == entry.stage => {
                    Err(AuditError::StorageError("disk full".to_string()))
                },
                _ => self.inner.append(entry),
            }
        }

        fn entries(&self) -> AuditResult<Vec<AuditEntry>> {
            self.inner.entries()
        }

        fn flush(&self) -> AuditResult<()> {
            Ok(())
        }
    }

    fn pipeline(
        turns: Vec<MockLlmTurn>,
        driver: &MockDriver,
        policy: SafetyPolicy,
        audit: Arc<AuditTrail>,
    ) -> Pipeline {
        let llm: Arc<dyn LlmProvider> = Arc::new(MockLlmProvider::new(turns));
        Pipeline::builder()
            .interpreter(PlanInterpreter::new(llm).with_retry(RetryPolicy::no_retry()))
            .policy(policy)
            .executor(ActionExecutor::new(Arc::new(driver.clone())))
            .audit(audit)
            .build()
            .unwrap()
    }

    fn open_chrome() -> MockLlmTurn {
        MockLlmTurn::text(plan_response(&[
            json!({"action": "open_app", "app_name": "chrome.exe"}),
        ]))
    }

    #[tokio::test]
    async fn test_reload_applies_to_next_command() {
        let dir = scratch_dir();
        let driver = MockDriver::new();
        let pipeline = pipeline(
            vec![open_chrome(), open_chrome()],
            &driver,
            SafetyPolicy::default(),
            Arc::new(AuditTrail::in_memory()),
        );
        let cancel = CancellationToken::new();

        let err = pipeline.run("open chrome", &cancel).await.unwrap_err();
        assert!(matches!(err, PipelineError::Gate(GateError::PolicyDenied(_))));
        assert_eq!(driver.call_count(), 0);

        pipeline.reload_policy(test_policy(dir.path()));
        let report = pipeline.run("open chrome", &cancel).await.unwrap();
        assert!(report.is_success());
        assert_eq!(driver.calls(), vec!["open_app chrome.exe"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_write_into_restricted_dir_is_refused() {
        let dir = scratch_dir();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::os::unix::fs::symlink(&locked, dir.path().join("inbox")).unwrap();
        let policy = test_policy_builder(dir.path())
            .restricted_dirs([locked.to_string_lossy()])
            .confirmation(ConfirmationPolicy::disabled())
            .build()
            .unwrap();
        let driver = MockDriver::new();
        let write = MockLlmTurn::text(plan_response(&[
            json!({"action": "file_write", "file_path": "inbox/x.txt", "content": "hi"}),
        ]));
        let pipeline = pipeline(vec![write], &driver, policy, Arc::new(AuditTrail::in_memory()));

        let report = pipeline
            .run("save a note", &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.verdict.is_allowed());
        assert_eq!(
            report.outcome.outcomes()[0].error(),
            Some(ExecutionError::PermissionDenied)
        );
        assert_eq!(driver.call_count(), 0);
    }

    #[tokio::test]
    async fn test_finished_commands_feed_the_next_prompt() {
        let dir = scratch_dir();
        let driver = MockDriver::new();
        let llm = Arc::new(MockLlmProvider::new(vec![open_chrome(), open_chrome()]));
        let provider: Arc<dyn LlmProvider> = llm.clone();
        let pipeline = Pipeline::builder()
            .interpreter(PlanInterpreter::new(provider).with_retry(RetryPolicy::no_retry()))
            .policy(test_policy(dir.path()))
            .executor(ActionExecutor::new(Arc::new(driver.clone())))
            .build()
            .unwrap();
        let cancel = CancellationToken::new();

        pipeline.run("open chrome", &cancel).await.unwrap();
        pipeline.run("open it again", &cancel).await.unwrap();

        let history = pipeline.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].command, "open chrome");
        assert_eq!(history[0].outcome, "1 succeeded, 0 failed, 0 skipped");
        let second_prompt = llm.captured()[1].messages[0].text().to_string();
        assert!(second_prompt.contains("\"recent_commands\""));
        assert!(second_prompt.contains("open chrome"));
    }

    #[tokio::test]
    async fn test_audit_failure_before_execution_stops_command() {
        let dir = scratch_dir();
        let driver = MockDriver::new();
        let sink = Arc::new(RefusingSink {
            inner: MemoryAuditSink::new(),
            refuse: Some(AuditStage::Gate),
        });
        let pipeline = pipeline(
            vec![open_chrome()],
            &driver,
            test_policy(dir.path()),
            Arc::new(AuditTrail::with_sink(sink)),
        );

        let err = pipeline
            .run("open chrome", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Audit(_)));
        assert_eq!(driver.call_count(), 0);
    }

    #[tokio::test]
    async fn test_audit_failure_during_execution_keeps_outcome() {
        let dir = scratch_dir();
        let driver = MockDriver::new();
        let sink = Arc::new(RefusingSink {
            inner: MemoryAuditSink::new(),
            refuse: Some(AuditStage::Execute),
        });
        let audit = Arc::new(AuditTrail::with_sink(sink));
        let pipeline = pipeline(
            vec![open_chrome()],
            &driver,
            test_policy(dir.path()),
            Arc::clone(&audit),
        );

        let report = pipeline
            .run("open chrome", &CancellationToken::new())
            .await
            .unwrap();
        assert!(report.is_success());
        assert_eq!(driver.call_count(), 1);
        assert_eq!(audit.entries().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_plan_ends_after_interpret() {
        let dir = scratch_dir();
        let driver = MockDriver::new();
        let audit = Arc::new(AuditTrail::in_memory());
        let pipeline = pipeline(
            vec![MockLlmTurn::text(plan_response(&[]))],
            &driver,
            test_policy(dir.path()),
            Arc::clone(&audit),
        );

        let report = pipeline
            .run("do nothing", &CancellationToken::new())
            .await
            .unwrap();
        assert!(report.is_noop());
        let entries = audit.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].stage, AuditStage::Interpret);
        assert_eq!(entries[0].output_summary, "empty plan");
    }

    #[tokio::test]
    async fn test_check_never_executes() {
        let dir = scratch_dir();
        let driver = MockDriver::new();
        let audit = Arc::new(AuditTrail::in_memory());
        let pipeline = pipeline(
            vec![open_chrome()],
            &driver,
            test_policy(dir.path()),
            Arc::clone(&audit),
        );

        let (plan, verdict) = pipeline
            .check("open chrome", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(plan.len(), 1);
        assert!(verdict.is_allowed());
        assert_eq!(driver.call_count(), 0);
        assert_eq!(audit.entries().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_interpret_failure_is_audited() {
        let dir = scratch_dir();
        let driver = MockDriver::new();
        let audit = Arc::new(AuditTrail::in_memory());
        let pipeline = pipeline(
            vec![MockLlmTurn::text("not json")],
            &driver,
            test_policy(dir.path()),
            Arc::clone(&audit),
        );

        let err = pipeline
            .run("open chrome", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Interpret(InterpretError::SchemaViolation(_))
        ));
        let entries = audit.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, AuditStatus::Failed);
    }

    #[test]
    fn test_builder_requires_parts() {
        let err = Pipeline::builder().build().unwrap_err();
        assert!(matches!(err, PipelineError::Setup(_)));
    }
}
