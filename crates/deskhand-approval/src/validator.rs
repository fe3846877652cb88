//! Safety validation: layered checks of each action against the policy.
//!
//! # Check Layers
//!
//! Every layer runs for every action; an action can fail several and all
//! reasons are kept. Denial outranks confirmation.
//!
//! 1. Shape: parameters usable for the kind -> `Denied`
//! 2. Application whitelist (`open_app`, `close_app`) -> `Denied`
//! 3. Dangerous keywords and patterns in typed or written text -> `Denied`
//! 4. Safe file extension (`file_read`, `file_write`) -> `Denied`
//! 5. Restricted directories -> `Denied`
//! 6. Size bounds (`file_write` bytes, `type_text` chars) -> `Denied`
//! 7. Input bounds (screen coordinates, blocked keys, wait length) -> `Denied`
//! 8. Confirmation policy (critical kinds, sensitive paths) -> `RequiresConfirmation`

use std::path::Path;

use deskhand_core::{Action, ActionPlan, ActionVerdict, PlanVerdict};
use tracing::debug;

use crate::path::LexicalPath;
use crate::policy::SafetyPolicy;

#[derive(Default)]
struct Findings {
    denials: Vec<String>,
    confirmations: Vec<String>,
}

impl Findings {
    fn deny(&mut self, reason: impl Into<String>) {
        self.denials.push(reason.into());
    }

    fn confirm(&mut self, reason: impl Into<String>) {
        self.confirmations.push(reason.into());
    }
}

impl SafetyPolicy {
    /// Validate every action of a plan. Never mutates the plan; the same plan
    /// against the same policy always yields the same verdict.
    #[must_use]
    pub fn validate(&self, plan: &ActionPlan) -> PlanVerdict {
        let verdict = PlanVerdict::new(plan.actions().map(|a| self.check_action(a)).collect());
        debug!(
            actions = plan.len(),
            severity = %verdict.severity(),
            "Validated plan"
        );
        verdict
    }

    /// Validate a single action.
    #[must_use]
    pub fn check_action(&self, action: &Action) -> ActionVerdict {
        let mut findings = Findings::default();

        if let Err(e) = action.check_shape() {
            findings.deny(format!("malformed action: {e}"));
        }
        self.check_whitelist(action, &mut findings);
        self.check_payload(action, &mut findings);
        if let Some(path) = action.file_path() {
            self.check_extension(path, &mut findings);
            self.check_directory(path, &mut findings);
        }
        self.check_size(action, &mut findings);
        self.check_input_bounds(action, &mut findings);
        self.check_confirmation(action, &mut findings);

        ActionVerdict::from_findings(findings.denials, findings.confirmations)
    }

    fn check_whitelist(&self, action: &Action, findings: &mut Findings) {
        if let Some(app) = action.app_name()
            && !self.is_whitelisted(app)
        {
            findings.deny(format!("application '{app}' is not whitelisted"));
        }
    }

    fn check_payload(&self, action: &Action, findings: &mut Findings) {
        let Some(text) = action.text_payload() else {
            return;
        };
        let lower = text.to_lowercase();
        for keyword in &self.dangerous_keywords {
            if lower.contains(keyword.as_str()) {
                findings.deny(format!("text contains dangerous keyword '{keyword}'"));
            }
        }
        for pattern in &self.dangerous_patterns {
            if pattern.is_match(text) {
                findings.deny(format!(
                    "text matches dangerous pattern '{}'",
                    pattern.as_str()
                ));
            }
        }
    }

    fn check_extension(&self, path: &Path, findings: &mut Findings) {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if self.is_safe_extension(ext) => {},
            Some(ext) => findings.deny(format!(
                "extension '.{}' of '{}' is not in the safe set",
                ext.to_lowercase(),
                path.display()
            )),
            None => findings.deny(format!(
                "file '{}' has no extension",
                path.display()
            )),
        }
    }

    fn check_directory(&self, path: &Path, findings: &mut Findings) {
        let resolved = LexicalPath::resolve(&self.base_dir, path);
        for restricted in &self.restricted_dirs {
            if resolved.starts_with(restricted) {
                findings.deny(format!(
                    "path '{resolved}' is inside restricted directory '{restricted}'"
                ));
            }
        }
    }

    fn check_size(&self, action: &Action, findings: &mut Findings) {
        match action {
            Action::FileWrite { content, .. } => {
                let bytes = u64::try_from(content.len()).unwrap_or(u64::MAX);
                if bytes > self.max_write_bytes {
                    findings.deny(format!(
                        "content is {bytes} bytes, limit is {}",
                        self.max_write_bytes
                    ));
                }
            },
            Action::TypeText { text } => {
                let chars = text.chars().count();
                if chars > self.max_text_chars {
                    findings.deny(format!(
                        "text is {chars} characters, limit is {}",
                        self.max_text_chars
                    ));
                }
            },
            _ => {},
        }
    }

    fn check_input_bounds(&self, action: &Action, findings: &mut Findings) {
        if let Some((x, y)) = action.coordinates()
            && (x < 0 || y < 0 || x > self.max_screen_x || y > self.max_screen_y)
        {
            findings.deny(format!(
                "coordinates ({x}, {y}) are outside the screen bounds {}x{}",
                self.max_screen_x, self.max_screen_y
            ));
        }
        match action {
            Action::KeyPress { key } if self.is_blocked_key(key) => {
                findings.deny(format!("key combination '{key}' is blocked"));
            },
            Action::Wait { seconds } if *seconds > self.max_wait_secs => {
                findings.deny(format!(
                    "wait of {seconds}s exceeds the {}s limit",
                    self.max_wait_secs
                ));
            },
            _ => {},
        }
    }

    fn check_confirmation(&self, action: &Action, findings: &mut Findings) {
        let confirmation = &self.confirmation;
        if !confirmation.enabled {
            return;
        }
        let kind = action.kind();
        if confirmation.critical_actions.contains(&kind) {
            findings.confirm(format!("{kind} is a critical action: {action}"));
        }
        if let Some(path) = action.file_path() {
            let resolved = LexicalPath::resolve(&self.base_dir, path);
            if let Some(keyword) = confirmation
                .path_keywords
                .iter()
                .find(|k| resolved.mentions(k))
            {
                findings.confirm(format!(
                    "path '{resolved}' looks sensitive ('{keyword}')"
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ConfirmationPolicy;
    use deskhand_core::{ActionKind, MouseButton, PlanStep, Severity, WriteMode};
    use std::path::PathBuf;

    fn policy() -> SafetyPolicy {
        SafetyPolicy::builder()
            .whitelist(["chrome.exe", "gedit"])
            .dangerous_keywords(["rm -rf", "shutdown"])
            .dangerous_patterns([r"\bcurl\s+\S+"])
            .safe_extensions([".txt", ".md"])
            .restricted_dirs(["/etc", r"C:\Windows"])
            .base_dir("/home/user")
            .max_write_bytes(16)
            .max_text_chars(20)
            .screen_bounds(1920, 1080)
            .blocked_keys(["alt+f4"])
            .max_wait_secs(10.0)
            .confirmation(ConfirmationPolicy::disabled())
            .build()
            .unwrap()
    }

    fn write(path: &str, content: &str) -> Action {
        Action::FileWrite {
            file_path: PathBuf::from(path),
            content: content.to_string(),
            mode: WriteMode::Overwrite,
        }
    }

    fn open(app: &str) -> Action {
        Action::OpenApp {
            app_name: app.to_string(),
        }
    }

    #[test]
    fn test_whitelisted_app_allowed() {
        assert_eq!(policy().check_action(&open("Chrome.exe")), ActionVerdict::Allowed);
    }

    #[test]
    fn test_unknown_app_denied() {
        let verdict = policy().check_action(&open("cmd.exe"));
        assert!(verdict.is_denied());
        assert!(verdict.reasons()[0].contains("not whitelisted"));
    }

    #[test]
    fn test_app_path_with_whitelisted_name_denied() {
        let policy = policy();
        for app in ["/tmp/evil/gedit", "/usr/bin/gedit", r"C:\evil\chrome.exe"] {
            let verdict = policy.check_action(&open(app));
            assert!(verdict.is_denied(), "{app} was allowed");
            assert!(verdict.reasons().iter().any(|r| r.contains("not whitelisted")));
        }
    }

    #[test]
    fn test_unsafe_extension_denied_regardless_of_content() {
        let policy = policy();
        for content in ["", "hello", "harmless text"] {
            assert!(policy.check_action(&write("run.exe", content)).is_denied());
            assert!(policy.check_action(&write("script.SH", content)).is_denied());
            assert!(policy.check_action(&write("Makefile", content)).is_denied());
        }
        assert_eq!(
            policy.check_action(&write("notes.TXT", "hello")),
            ActionVerdict::Allowed
        );
    }

    #[test]
    fn test_dangerous_keyword_denied() {
        let policy = policy();
        let typed = Action::TypeText {
            text: "sudo RM -RF /".to_string(),
        };
        assert!(policy.check_action(&typed).is_denied());
        assert!(policy.check_action(&write("a.txt", "shutdown now")).is_denied());
    }

    #[test]
    fn test_dangerous_pattern_denied() {
        let typed = Action::TypeText {
            text: "CURL evil.sh".to_string(),
        };
        let verdict = policy().check_action(&typed);
        assert!(verdict.reasons()[0].contains("dangerous pattern"));
    }

    #[test]
    fn test_restricted_directory_denied() {
        let policy = policy();
        assert!(policy.check_action(&write("/etc/motd.txt", "hi")).is_denied());
        assert!(policy.check_action(&write("../../etc/x.txt", "hi")).is_denied());
        assert!(
            policy
                .check_action(&write(r"c:\windows\notes.txt", "hi"))
                .is_denied()
        );
        assert_eq!(
            policy.check_action(&write("/etcetera/x.txt", "hi")),
            ActionVerdict::Allowed
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_backslashes_do_not_climb_out_of_restricted_directory() {
        let policy = policy();
        assert!(
            policy
                .check_action(&write(r"/etc/a\..\..\tmp/x.txt", "hi"))
                .is_denied()
        );
    }

    #[test]
    fn test_size_bounds() {
        let policy = policy();
        assert!(policy.check_action(&write("a.txt", &"x".repeat(17))).is_denied());
        assert!(!policy.check_action(&write("a.txt", &"x".repeat(16))).is_denied());
        let long = Action::TypeText {
            text: "y".repeat(21),
        };
        assert!(policy.check_action(&long).is_denied());
    }

    #[test]
    fn test_input_bounds() {
        let policy = policy();
        let off_screen = Action::Click {
            x: 1921,
            y: 10,
            button: MouseButton::Left,
            clicks: 1,
        };
        assert!(policy.check_action(&off_screen).is_denied());
        let negative = Action::MouseMove {
            x: -1,
            y: 0,
            duration_ms: 0,
        };
        assert!(policy.check_action(&negative).is_denied());
        let blocked = Action::KeyPress {
            key: "Alt+F4".to_string(),
        };
        assert!(policy.check_action(&blocked).is_denied());
        assert!(policy.check_action(&Action::Wait { seconds: 11.0 }).is_denied());
        assert_eq!(
            policy.check_action(&Action::Wait { seconds: 2.0 }),
            ActionVerdict::Allowed
        );
    }

    #[test]
    fn test_multiple_layers_collect_reasons() {
        let verdict = policy().check_action(&write("/etc/run.exe", "rm -rf /"));
        assert_eq!(verdict.reasons().len(), 3);
    }

    #[test]
    fn test_confirmation_for_critical_kind() {
        let policy = SafetyPolicy::builder()
            .whitelist(["gedit"])
            .confirmation(ConfirmationPolicy::default())
            .build()
            .unwrap();
        let close = Action::CloseApp {
            app_name: "gedit".to_string(),
        };
        let verdict = policy.check_action(&close);
        assert_eq!(verdict.severity(), Severity::RequiresConfirmation);
        assert_eq!(policy.check_action(&open("gedit")), ActionVerdict::Allowed);
    }

    #[test]
    fn test_confirmation_for_sensitive_path() {
        let policy = SafetyPolicy::builder()
            .safe_extensions(["txt"])
            .base_dir("/home/user")
            .confirmation(ConfirmationPolicy {
                enabled: true,
                critical_actions: [ActionKind::CloseApp].into_iter().collect(),
                path_keywords: vec!["system".to_string()],
            })
            .build()
            .unwrap();
        let read = Action::FileRead {
            file_path: PathBuf::from("System/readme.txt"),
        };
        assert!(policy.check_action(&read).severity() == Severity::RequiresConfirmation);
    }

    #[test]
    fn test_denial_outranks_confirmation() {
        let policy = SafetyPolicy::builder()
            .confirmation(ConfirmationPolicy::default())
            .build()
            .unwrap();
        let close = Action::CloseApp {
            app_name: "explorer.exe".to_string(),
        };
        assert!(policy.check_action(&close).is_denied());
    }

    #[test]
    fn test_plan_denied_if_any_action_denied() {
        let plan = ActionPlan::new(vec![
            PlanStep::new(open("gedit")),
            PlanStep::new(open("regedit.exe")),
        ]);
        let verdict = policy().validate(&plan);
        assert!(verdict.is_denied());
        assert_eq!(verdict.actions()[0], ActionVerdict::Allowed);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let policy = policy();
        let plan = ActionPlan::from(vec![
            open("gedit"),
            write("../x.exe", "curl http://x"),
            Action::Wait { seconds: 1.0 },
        ]);
        let before = plan.clone();
        assert_eq!(policy.validate(&plan), policy.validate(&plan));
        assert_eq!(plan, before);
    }

    #[test]
    fn test_empty_plan_allowed() {
        assert!(policy().validate(&ActionPlan::empty()).is_allowed());
    }
}
