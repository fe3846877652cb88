//! Pipeline assembly from the resolved configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use deskhand_approval::{ConfirmationGate, ConfirmationHandler};
use deskhand_automation::ActionExecutor;
use deskhand_config::{Config, ResolvedConfig};
use deskhand_interpreter::{PlanInterpreter, PromptContext};
use deskhand_runtime::{Pipeline, config_bridge};
use tracing::{info, warn};

use crate::confirm::{AutoConfirm, TerminalConfirmation};

/// Load the layered configuration, with `explicit` as the top file layer.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<ResolvedConfig> {
    Config::load(explicit).context("failed to load configuration")
}

/// A pipeline plus what is needed to rebuild its policy.
pub(crate) struct Session {
    pub(crate) pipeline: Pipeline,
    config_path: Option<PathBuf>,
    working_dir: PathBuf,
}

impl Session {
    /// Build the pipeline described by `cfg`.
    ///
    /// With `auto_confirm`, plans that need confirmation are accepted without
    /// asking; denied plans are still refused.
    pub(crate) fn start(
        cfg: &Config,
        config_path: Option<&Path>,
        auto_confirm: bool,
    ) -> Result<Self> {
        let working_dir =
            std::env::current_dir().context("failed to read the current directory")?;

        let provider =
            config_bridge::to_llm_provider(cfg).context("failed to set up the language model")?;
        let interpreter = PlanInterpreter::new(provider)
            .with_retry(config_bridge::to_retry_policy(&cfg.retry))
            .with_request_timeout(Duration::from_secs(cfg.timeouts.request_secs))
            .with_context(PromptContext::detect().with_working_directory(&working_dir));

        let policy = config_bridge::to_safety_policy(cfg, &working_dir)
            .context("invalid safety policy")?;

        let handler: Arc<dyn ConfirmationHandler> = if auto_confirm {
            Arc::new(AutoConfirm)
        } else {
            Arc::new(TerminalConfirmation)
        };
        let gate = ConfirmationGate::new()
            .with_handler(handler)
            .with_timeout(Duration::from_secs(cfg.confirmation.timeout_secs));

        let driver = config_bridge::to_system_driver(cfg);
        if !driver.has_input_backend() {
            warn!("xdotool not found; click, typing, key and mouse actions will fail");
        }
        let executor = ActionExecutor::new(Arc::new(driver))
            .with_action_timeout(Duration::from_secs(cfg.timeouts.action_secs))
            .with_path_guard(policy.path_guard());

        let audit_path = config_bridge::audit_path(cfg)?;
        let audit = config_bridge::to_audit_trail(audit_path.as_deref())
            .context("failed to open the audit trail")?;

        let pipeline = Pipeline::builder()
            .interpreter(interpreter)
            .policy(policy)
            .gate(gate)
            .executor(executor)
            .audit(Arc::new(audit))
            .build()?;

        info!(
            audit = ?audit_path,
            confirmation = cfg.confirmation.enabled,
            "Pipeline ready"
        );

        Ok(Self {
            pipeline,
            config_path: config_path.map(Path::to_path_buf),
            working_dir,
        })
    }

    /// Re-read the configuration and swap in its safety policy.
    ///
    /// Only the policy changes; the model, driver and audit settings stay
    /// as they were at startup.
    pub(crate) fn reload_policy(&self) -> Result<()> {
        let resolved = load_config(self.config_path.as_deref())?;
        let policy = config_bridge::to_safety_policy(&resolved.config, &self.working_dir)
            .context("invalid safety policy")?;
        self.pipeline.reload_policy(policy);
        Ok(())
    }
}
