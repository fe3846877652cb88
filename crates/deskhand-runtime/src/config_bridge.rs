//! Bridge from `deskhand_config::Config` to domain types.
//!
//! The config crate has no dependencies on other internal crates. This
//! module translates its sections into the policy, provider, retry, driver
//! and logging types the pipeline uses, so that conversion happens once, in
//! one place.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use deskhand_approval::{ApprovalError, ApprovalResult, ConfirmationPolicy, SafetyPolicy};
use deskhand_audit::{AuditResult, AuditTrail};
use deskhand_automation::SystemDriver;
use deskhand_config::loader::deskhand_home_dir;
use deskhand_config::{Config, ConfigResult, ConfirmationSection, LoggingSection, RetrySection};
use deskhand_core::{ActionKind, Backoff, RetryPolicy};
use deskhand_llm::{LlmProvider, LlmResult, OpenAiCompatProvider, ProviderConfig};
use deskhand_telemetry::{LogConfig, LogFormat};
use tracing::warn;

/// File name of the persistent audit trail inside `~/.deskhand`.
const AUDIT_FILE_NAME: &str = "audit.jsonl";

/// Convert the `[confirmation]` section to a [`ConfirmationPolicy`].
///
/// # Errors
///
/// Returns [`ApprovalError::InvalidSetting`] for an unknown action kind.
pub fn to_confirmation_policy(section: &ConfirmationSection) -> ApprovalResult<ConfirmationPolicy> {
    let critical_actions = section
        .critical_actions
        .iter()
        .map(|name| {
            ActionKind::from_str(name).map_err(|reason| ApprovalError::InvalidSetting {
                field: "confirmation.critical_actions",
                reason,
            })
        })
        .collect::<ApprovalResult<HashSet<_>>>()?;

    Ok(ConfirmationPolicy {
        enabled: section.enabled,
        critical_actions,
        path_keywords: section.confirm_path_keywords.clone(),
    })
}

/// Build the [`SafetyPolicy`] from `[policy]` and `[confirmation]`.
///
/// Relative paths in actions resolve against `policy.base_dir`, or
/// `working_dir` when that is unset.
///
/// # Errors
///
/// Returns an error if a pattern does not compile or a bound is invalid.
pub fn to_safety_policy(cfg: &Config, working_dir: &Path) -> ApprovalResult<SafetyPolicy> {
    let p = &cfg.policy;
    SafetyPolicy::builder()
        .whitelist(&p.whitelisted_apps)
        .dangerous_keywords(&p.dangerous_keywords)
        .dangerous_patterns(&p.dangerous_patterns)
        .safe_extensions(&p.safe_extensions)
        .restricted_dirs(&p.restricted_dirs)
        .base_dir(base_dir(cfg, working_dir))
        .max_write_bytes(p.max_write_bytes)
        .max_text_chars(p.max_text_chars)
        .screen_bounds(p.max_screen_x, p.max_screen_y)
        .blocked_keys(&p.blocked_keys)
        .max_wait_secs(p.max_wait_secs)
        .confirmation(to_confirmation_policy(&cfg.confirmation)?)
        .build()
}

fn base_dir(cfg: &Config, working_dir: &Path) -> PathBuf {
    cfg.policy
        .base_dir
        .as_deref()
        .map_or_else(|| working_dir.to_path_buf(), PathBuf::from)
}

/// Convert the `[retry]` section to a [`RetryPolicy`].
#[must_use]
pub fn to_retry_policy(section: &RetrySection) -> RetryPolicy {
    let backoff = match section.backoff.as_str() {
        "fixed" => Backoff::Fixed,
        _ => Backoff::Exponential {
            base: section.exponential_base,
        },
    };
    RetryPolicy::new(
        section.max_attempts,
        backoff,
        Duration::from_millis(section.initial_delay_ms),
        Duration::from_millis(section.max_delay_ms),
    )
}

/// Convert config to [`ProviderConfig`].
///
/// The API key comes from `cfg.model.api_key`, which already includes env
/// var fallbacks applied by `Config::load`. Without a key the provider is
/// created anyway and reports `ApiKeyNotConfigured` on the first call.
#[must_use]
pub fn to_provider_config(cfg: &Config) -> ProviderConfig {
    let api_key = cfg.model.api_key.clone().unwrap_or_default();

    let mut provider = ProviderConfig::new(api_key, &cfg.model.model)
        .max_tokens(cfg.model.max_tokens)
        .temperature(cfg.model.temperature)
        .timeout(Duration::from_secs(cfg.timeouts.request_secs));

    if let Some(url) = &cfg.model.api_url {
        provider = provider.base_url(url);
    }

    provider
}

/// Build the language-model provider named by `model.provider`.
///
/// # Errors
///
/// Returns an error for an unknown provider name or an unusable base URL.
pub fn to_llm_provider(cfg: &Config) -> LlmResult<Arc<dyn LlmProvider>> {
    let provider = OpenAiCompatProvider::from_name(&cfg.model.provider, to_provider_config(cfg))?;
    Ok(Arc::new(provider))
}

/// Build the system driver from the `[automation]` section.
///
/// Helper processes get the action budget from `[timeouts]` as their
/// deadline. File paths are confined by the executor, not here.
#[must_use]
pub fn to_system_driver(cfg: &Config) -> SystemDriver {
    let a = &cfg.automation;
    let driver = SystemDriver::new()
        .with_read_limits(a.max_read_bytes, a.read_display_chars)
        .with_command_timeout(Duration::from_secs(cfg.timeouts.action_secs));
    match &a.xdotool_path {
        Some(path) => driver.with_xdotool(Some(PathBuf::from(path))),
        None => driver,
    }
}

/// Where the persistent audit trail lives, or `None` when `audit.persist`
/// is off.
///
/// # Errors
///
/// Returns an error if no path is configured and the home directory is
/// unknown.
pub fn audit_path(cfg: &Config) -> ConfigResult<Option<PathBuf>> {
    if !cfg.audit.persist {
        return Ok(None);
    }
    match &cfg.audit.path {
        Some(path) => Ok(Some(PathBuf::from(path))),
        None => Ok(Some(deskhand_home_dir()?.join(AUDIT_FILE_NAME))),
    }
}

/// Open the audit trail: the JSON-lines file when persistence is on,
/// otherwise an in-memory trail for this session.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or holds corrupt entries.
pub fn to_audit_trail(path: Option<&Path>) -> AuditResult<AuditTrail> {
    match path {
        Some(path) => AuditTrail::open_jsonl(path),
        None => Ok(AuditTrail::in_memory()),
    }
}

/// Convert the `[logging]` section to a [`LogConfig`].
///
/// An unknown format falls back to the default with a warning.
#[must_use]
pub fn to_log_config(section: &LoggingSection) -> LogConfig {
    let format = LogFormat::from_str(&section.format).unwrap_or_else(|e| {
        warn!(error = %e, "Falling back to the default log format");
        LogFormat::default()
    });

    let mut log = LogConfig::new(&section.level).with_format(format);
    for directive in &section.directives {
        log = log.with_directive(directive);
    }
    if let Some(dir) = &section.directory {
        log = log.with_file_logging(dir);
    }
    log
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskhand_core::{Action, ActionPlan};

    #[test]
    fn test_default_config_builds_policy() {
        let cfg = Config::default();
        let policy = to_safety_policy(&cfg, Path::new("/home/ana")).unwrap();

        assert_eq!(policy.base_dir(), Path::new("/home/ana"));
        assert!(policy.is_whitelisted("chrome.exe"));
        assert!(policy.is_safe_extension("txt"));
        assert!(policy.is_blocked_key("F4+ALT"));
        assert!(
            policy
                .confirmation()
                .critical_actions
                .contains(&ActionKind::CloseApp)
        );
    }

    #[test]
    fn test_configured_base_dir_wins() {
        let mut cfg = Config::default();
        cfg.policy.base_dir = Some("/srv/work".to_string());
        let policy = to_safety_policy(&cfg, Path::new("/home/ana")).unwrap();
        assert_eq!(policy.base_dir(), Path::new("/srv/work"));
    }

    #[test]
    fn test_confirmation_disabled() {
        let mut cfg = Config::default();
        cfg.confirmation.enabled = false;
        let policy = to_safety_policy(&cfg, Path::new("/tmp")).unwrap();

        let plan = ActionPlan::from(vec![Action::CloseApp {
            app_name: "gedit".to_string(),
        }]);
        assert!(policy.validate(&plan).is_allowed());
    }

    #[test]
    fn test_unknown_critical_action() {
        let mut section = ConfirmationSection::default();
        section.critical_actions = vec!["launch_rocket".to_string()];
        let err = to_confirmation_policy(&section).unwrap_err();
        assert!(matches!(
            err,
            ApprovalError::InvalidSetting {
                field: "confirmation.critical_actions",
                ..
            }
        ));
    }

    #[test]
    fn test_bad_pattern_is_an_error() {
        let mut cfg = Config::default();
        cfg.policy.dangerous_patterns = vec!["([unclosed".to_string()];
        assert!(matches!(
            to_safety_policy(&cfg, Path::new("/tmp")),
            Err(ApprovalError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_retry_policy() {
        let mut section = RetrySection::default();
        let policy = to_retry_policy(&section);
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Backoff::Exponential { base: 2.0 });
        assert_eq!(policy.initial_delay, Duration::from_millis(500));

        section.backoff = "fixed".to_string();
        assert_eq!(to_retry_policy(&section).backoff, Backoff::Fixed);
    }

    #[test]
    fn test_provider_config() {
        let mut cfg = Config::default();
        cfg.model.api_key = Some("sk-test".to_string());
        cfg.model.api_url = Some("http://localhost:8080/v1".to_string());
        let provider = to_provider_config(&cfg);
        assert_eq!(provider.api_key, "sk-test");
        assert_eq!(provider.base_url.as_deref(), Some("http://localhost:8080/v1"));
        assert_eq!(provider.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_audit_path() {
        let mut cfg = Config::default();
        cfg.audit.path = Some("/var/log/deskhand.jsonl".to_string());
        assert_eq!(
            audit_path(&cfg).unwrap(),
            Some(PathBuf::from("/var/log/deskhand.jsonl"))
        );

        cfg.audit.persist = false;
        assert_eq!(audit_path(&cfg).unwrap(), None);
    }

    #[test]
    fn test_log_config() {
        let mut section = LoggingSection::default();
        section.format = "json".to_string();
        section.directives = vec!["deskhand_llm=debug".to_string()];
        let log = to_log_config(&section);
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.directives, vec!["deskhand_llm=debug".to_string()]);

        section.format = "xml".to_string();
        assert_eq!(to_log_config(&section).format, LogFormat::default());
    }
}
