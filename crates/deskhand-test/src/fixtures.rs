//! Test fixtures: policies and scripted model answers.

use std::path::Path;

use serde_json::{Value, json};

use deskhand_approval::{SafetyPolicy, SafetyPolicyBuilder};

/// Applications the test policy allows.
pub const TEST_WHITELIST: &[&str] = &["chrome.exe", "notepad.exe", "gedit", "calculator"];

/// Builder for the policy most tests use, rooted at `base_dir`.
///
/// Whitelist [`TEST_WHITELIST`], text-like extensions, the usual system
/// directories restricted, and the default confirmation settings
/// (`close_app` and `file_write` are critical).
#[must_use]
pub fn test_policy_builder(base_dir: impl AsRef<Path>) -> SafetyPolicyBuilder {
    SafetyPolicy::builder()
        .whitelist(TEST_WHITELIST.iter().copied())
        .dangerous_keywords(["rm -rf", "format c:", "shutdown", "sudo "])
        .dangerous_patterns([r"\brm\s+-[a-z]*r", r"curl\s+[^|]*\|\s*(ba)?sh"])
        .safe_extensions(["txt", "md", "json", "csv", "log"])
        .restricted_dirs(["/etc", "/bin", "/usr/bin", "/root", r"C:\Windows"])
        .base_dir(base_dir.as_ref())
        .blocked_keys(["alt+f4", "ctrl+alt+del", "cmd+q", "win+r"])
}

/// The test policy rooted at `base_dir`.
///
/// # Panics
///
/// Panics if the fixed patterns fail to compile, which would be a bug here.
#[must_use]
pub fn test_policy(base_dir: impl AsRef<Path>) -> SafetyPolicy {
    #[allow(clippy::expect_used)]
    test_policy_builder(base_dir)
        .build()
        .expect("fixture policy is valid")
}

/// A model answer with the given actions, none fatal.
#[must_use]
pub fn plan_response(actions: &[Value]) -> String {
    json!({ "actions": actions }).to_string()
}

/// A model answer refusing the command.
#[must_use]
pub fn refusal_response(reason: &str) -> String {
    json!({ "refusal": reason }).to_string()
}

/// Install a test-writer `tracing` subscriber. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// A scratch directory for file-backed tests.
///
/// # Panics
///
/// Panics if the OS cannot create a temporary directory.
#[must_use]
pub fn scratch_dir() -> tempfile::TempDir {
    #[allow(clippy::expect_used)]
    tempfile::tempdir().expect("failed to create tempdir")
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskhand_core::{Action, ActionPlan};

    #[test]
    fn fixture_policy_allows_whitelisted_apps() {
        let dir = scratch_dir();
        let policy = test_policy(dir.path());
        let plan = ActionPlan::from(vec![Action::OpenApp {
            app_name: "chrome.exe".to_string(),
        }]);
        assert!(policy.validate(&plan).is_allowed());
    }

    #[test]
    fn responses_are_json() {
        let text = plan_response(&[json!({"action": "wait", "seconds": 1})]);
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["actions"][0]["action"], "wait");

        let value: Value = serde_json::from_str(&refusal_response("no")).unwrap();
        assert_eq!(value["refusal"], "no");
    }
}
