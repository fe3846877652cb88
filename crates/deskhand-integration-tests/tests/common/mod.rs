//! Shared test harness for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use deskhand_approval::{ConfirmationGate, ConfirmationHandler, SafetyPolicy};
use deskhand_audit::AuditTrail;
use deskhand_automation::ActionExecutor;
use deskhand_core::RetryPolicy;
use deskhand_interpreter::{PlanInterpreter, PromptContext};
use deskhand_llm::LlmProvider;
use deskhand_runtime::Pipeline;
use deskhand_test::{MockDriver, MockLlmProvider, MockLlmTurn, test_policy};
use serde_json::Value;
use tempfile::TempDir;

/// Every pipeline collaborator, mocked, wired together.
///
/// Owns a `TempDir` that acts as the policy's base directory. The tempdir
/// is cleaned up when the harness is dropped.
pub struct PipelineHarness {
    /// The pipeline under test.
    pub pipeline: Pipeline,
    /// The scripted model.
    pub llm: Arc<MockLlmProvider>,
    /// The recording driver.
    pub driver: MockDriver,
    /// The audit trail.
    pub audit: Arc<AuditTrail>,
    /// Base directory (held to prevent cleanup).
    pub dir: TempDir,
}

impl PipelineHarness {
    /// Start building a harness that replays `turns`.
    pub fn builder(turns: Vec<MockLlmTurn>) -> HarnessBuilder {
        HarnessBuilder {
            turns,
            driver: MockDriver::new(),
            handler: None,
            gate_timeout: Duration::from_secs(5),
            action_timeout: Duration::from_secs(5),
            audit: None,
            policy: None,
        }
    }

    /// A harness with defaults and no confirmation handler.
    pub fn new(turns: Vec<MockLlmTurn>) -> Self {
        Self::builder(turns).build()
    }

    /// The base directory.
    pub fn base_dir(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }
}

/// Builder for [`PipelineHarness`].
pub struct HarnessBuilder {
    turns: Vec<MockLlmTurn>,
    driver: MockDriver,
    handler: Option<Arc<dyn ConfirmationHandler>>,
    gate_timeout: Duration,
    action_timeout: Duration,
    audit: Option<Arc<AuditTrail>>,
    policy: Option<Box<dyn FnOnce(&Path) -> SafetyPolicy>>,
}

impl HarnessBuilder {
    /// Use this driver.
    pub fn driver(mut self, driver: MockDriver) -> Self {
        self.driver = driver;
        self
    }

    /// Register a confirmation handler.
    pub fn confirm_with(mut self, handler: Arc<dyn ConfirmationHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Gate timeout.
    pub fn gate_timeout(mut self, timeout: Duration) -> Self {
        self.gate_timeout = timeout;
        self
    }

    /// Per-action time budget.
    pub fn action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    /// Use this audit trail.
    pub fn audit(mut self, audit: Arc<AuditTrail>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Build the policy from the base directory.
    pub fn policy(mut self, policy: impl FnOnce(&Path) -> SafetyPolicy + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    /// Build the harness.
    pub fn build(self) -> PipelineHarness {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let llm = Arc::new(MockLlmProvider::new(self.turns));
        let provider: Arc<dyn LlmProvider> = llm.clone();
        let interpreter = PlanInterpreter::new(provider)
            .with_retry(RetryPolicy::no_retry())
            .with_context(PromptContext::detect().with_working_directory(dir.path()));

        let mut gate = ConfirmationGate::new().with_timeout(self.gate_timeout);
        if let Some(handler) = self.handler {
            gate = gate.with_handler(handler);
        }

        let policy = match self.policy {
            Some(build) => build(dir.path()),
            None => test_policy(dir.path()),
        };
        let audit = self
            .audit
            .unwrap_or_else(|| Arc::new(AuditTrail::in_memory()));

        let pipeline = Pipeline::builder()
            .interpreter(interpreter)
            .policy(policy)
            .gate(gate)
            .executor(
                ActionExecutor::new(Arc::new(self.driver.clone()))
                    .with_action_timeout(self.action_timeout),
            )
            .audit(Arc::clone(&audit))
            .build()
            .expect("pipeline builds");

        PipelineHarness {
            pipeline,
            llm,
            driver: self.driver,
            audit,
            dir,
        }
    }
}

/// A model turn answering with `actions`.
pub fn plan(actions: &[Value]) -> MockLlmTurn {
    MockLlmTurn::text(deskhand_test::plan_response(actions))
}
