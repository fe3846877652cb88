//! Safety policy: the loaded rules a plan is validated against.
//!
//! A [`SafetyPolicy`] is immutable once built. Hot reload means building a
//! new one and swapping it in between commands, never editing in place.
//!
//! The default policy is closed: no application is whitelisted and no file
//! extension is safe, so every app and file action is denied until the
//! policy is configured.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use deskhand_core::ActionKind;
use regex::{Regex, RegexBuilder};

use crate::error::{ApprovalError, ApprovalResult};
use crate::path::{LexicalPath, PathGuard};

/// Which actions need a human yes.
#[derive(Debug, Clone)]
pub struct ConfirmationPolicy {
    /// Master switch.
    pub enabled: bool,
    /// Kinds that always need confirmation.
    pub critical_actions: HashSet<ActionKind>,
    /// File actions whose path mentions one of these need confirmation.
    pub path_keywords: Vec<String>,
}

impl ConfirmationPolicy {
    /// Nothing needs confirmation.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            critical_actions: HashSet::new(),
            path_keywords: Vec::new(),
        }
    }
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            critical_actions: [ActionKind::CloseApp, ActionKind::FileWrite]
                .into_iter()
                .collect(),
            path_keywords: Vec::new(),
        }
    }
}

/// The rules a plan is validated against.
#[derive(Debug, Clone)]
pub struct SafetyPolicy {
    pub(crate) whitelisted_apps: HashSet<String>,
    pub(crate) dangerous_keywords: Vec<String>,
    pub(crate) dangerous_patterns: Vec<Regex>,
    pub(crate) safe_extensions: HashSet<String>,
    pub(crate) restricted_dirs: Vec<LexicalPath>,
    pub(crate) base_dir: PathBuf,
    pub(crate) max_write_bytes: u64,
    pub(crate) max_text_chars: usize,
    pub(crate) max_screen_x: i32,
    pub(crate) max_screen_y: i32,
    pub(crate) blocked_keys: Vec<Vec<String>>,
    pub(crate) max_wait_secs: f64,
    pub(crate) confirmation: ConfirmationPolicy,
}

impl SafetyPolicy {
    /// Start building a policy.
    #[must_use]
    pub fn builder() -> SafetyPolicyBuilder {
        SafetyPolicyBuilder::default()
    }

    /// Directory relative file paths are resolved against.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Confirmation settings.
    #[must_use]
    pub fn confirmation(&self) -> &ConfirmationPolicy {
        &self.confirmation
    }

    /// Whether `app` is whitelisted, ignoring case.
    ///
    /// Only the whole identifier counts: `/tmp/evil/gedit` is a different
    /// program from `gedit`, whatever its file name.
    #[must_use]
    pub fn is_whitelisted(&self, app: &str) -> bool {
        self.whitelisted_apps.contains(&app.trim().to_lowercase())
    }

    /// Execution-time guard sharing this policy's base directory and
    /// restricted prefixes.
    #[must_use]
    pub fn path_guard(&self) -> PathGuard {
        PathGuard::new(self.base_dir.clone(), self.restricted_dirs.clone())
    }

    /// Whether `ext` (with or without a leading dot) is a safe extension.
    #[must_use]
    pub fn is_safe_extension(&self, ext: &str) -> bool {
        self.safe_extensions.contains(&normalize_extension(ext))
    }

    /// Whether a key combination is blocked. Order of the parts and case do
    /// not matter: `F4+Alt` matches `alt+f4`.
    #[must_use]
    pub fn is_blocked_key(&self, key: &str) -> bool {
        let parts = key_parts(key);
        self.blocked_keys.iter().any(|blocked| *blocked == parts)
    }
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            whitelisted_apps: HashSet::new(),
            dangerous_keywords: Vec::new(),
            dangerous_patterns: Vec::new(),
            safe_extensions: HashSet::new(),
            restricted_dirs: Vec::new(),
            base_dir: PathBuf::from("/"),
            max_write_bytes: 10_485_760,
            max_text_chars: 10_000,
            max_screen_x: 3840,
            max_screen_y: 2160,
            blocked_keys: Vec::new(),
            max_wait_secs: 60.0,
            confirmation: ConfirmationPolicy::default(),
        }
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

fn key_parts(key: &str) -> Vec<String> {
    let mut parts: Vec<String> = key
        .split('+')
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect();
    parts.sort();
    parts
}

/// Builder for [`SafetyPolicy`].
///
/// # Example
///
/// ```
/// use deskhand_approval::SafetyPolicy;
///
/// let policy = SafetyPolicy::builder()
///     .whitelist(["gedit", "chrome.exe"])
///     .safe_extensions([".txt", "md"])
///     .restricted_dirs(["/etc"])
///     .build()
///     .unwrap();
///
/// assert!(policy.is_whitelisted("Chrome.EXE"));
/// assert!(policy.is_safe_extension("TXT"));
/// ```
#[derive(Debug, Default)]
pub struct SafetyPolicyBuilder {
    policy: SafetyPolicy,
    patterns: Vec<String>,
}

impl SafetyPolicyBuilder {
    /// Applications that may be opened or closed.
    #[must_use]
    pub fn whitelist<I, S>(mut self, apps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.policy.whitelisted_apps = apps
            .into_iter()
            .map(|a| a.as_ref().trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .collect();
        self
    }

    /// Literal substrings that deny a payload (case-insensitive).
    #[must_use]
    pub fn dangerous_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.policy.dangerous_keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().to_lowercase())
            .filter(|k| !k.trim().is_empty())
            .collect();
        self
    }

    /// Regular expressions that deny a payload (case-insensitive). Compiled
    /// by [`build`](Self::build).
    #[must_use]
    pub fn dangerous_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.patterns = patterns.into_iter().map(|p| p.as_ref().to_string()).collect();
        self
    }

    /// Extensions file actions may touch (leading dot optional).
    #[must_use]
    pub fn safe_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.policy.safe_extensions = extensions
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    /// Directory prefixes file actions may not touch.
    #[must_use]
    pub fn restricted_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.policy.restricted_dirs = dirs
            .into_iter()
            .filter(|d| !d.as_ref().trim().is_empty())
            .map(|d| LexicalPath::prefix(d.as_ref()))
            .collect();
        self
    }

    /// Directory relative paths resolve against.
    #[must_use]
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.policy.base_dir = dir.into();
        self
    }

    /// Maximum `file_write` content size in bytes.
    #[must_use]
    pub fn max_write_bytes(mut self, bytes: u64) -> Self {
        self.policy.max_write_bytes = bytes;
        self
    }

    /// Maximum `type_text` length in characters.
    #[must_use]
    pub fn max_text_chars(mut self, chars: usize) -> Self {
        self.policy.max_text_chars = chars;
        self
    }

    /// Screen bounds for pointer actions.
    #[must_use]
    pub fn screen_bounds(mut self, max_x: i32, max_y: i32) -> Self {
        self.policy.max_screen_x = max_x;
        self.policy.max_screen_y = max_y;
        self
    }

    /// Key combinations never sent.
    #[must_use]
    pub fn blocked_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.policy.blocked_keys = keys
            .into_iter()
            .map(|k| key_parts(k.as_ref()))
            .filter(|k| !k.is_empty())
            .collect();
        self
    }

    /// Longest allowed `wait`, in seconds.
    #[must_use]
    pub fn max_wait_secs(mut self, secs: f64) -> Self {
        self.policy.max_wait_secs = secs;
        self
    }

    /// Confirmation settings.
    #[must_use]
    pub fn confirmation(mut self, confirmation: ConfirmationPolicy) -> Self {
        self.policy.confirmation = confirmation;
        self
    }

    /// Compile patterns and check bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::InvalidPattern`] for a pattern that does not
    /// compile, or [`ApprovalError::InvalidSetting`] for a non-positive bound.
    pub fn build(mut self) -> ApprovalResult<SafetyPolicy> {
        self.policy.dangerous_patterns = self
            .patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ApprovalError::InvalidPattern {
                        pattern: p.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<ApprovalResult<_>>()?;

        let policy = self.policy;
        if policy.max_screen_x <= 0 || policy.max_screen_y <= 0 {
            return Err(ApprovalError::InvalidSetting {
                field: "screen_bounds",
                reason: "must be positive".to_string(),
            });
        }
        if !policy.max_wait_secs.is_finite() || policy.max_wait_secs < 0.0 {
            return Err(ApprovalError::InvalidSetting {
                field: "max_wait_secs",
                reason: format!("{} is not a non-negative duration", policy.max_wait_secs),
            });
        }
        Ok(policy)
    }
}
