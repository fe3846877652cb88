//! Configuration types for Deskhand.
//!
//! All types in this module are self-contained with no dependencies on other
//! internal deskhand crates. Every struct implements [`Default`] with the same
//! values as the embedded `defaults.toml`, so a bare `[section]` header in
//! TOML produces a working configuration.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Language-model endpoint and sampling.
    pub model: ModelConfig,
    /// Safety policy applied to every action plan.
    pub policy: PolicySection,
    /// Human confirmation of risky actions.
    pub confirmation: ConfirmationSection,
    /// Retry behaviour for language-model calls.
    pub retry: RetrySection,
    /// Timeout budgets.
    pub timeouts: TimeoutsSection,
    /// Audit trail storage.
    pub audit: AuditSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
    /// Limits for the platform automation driver.
    pub automation: AutomationSection,
}

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// Language-model provider, endpoint, and sampling parameters.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Provider identifier: `"openrouter"`, `"openai"`, or `"openai-compat"`.
    pub provider: String,
    /// Model name sent to the provider API.
    pub model: String,
    /// API key. Prefer environment variables over storing this in a file.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL for the provider API (overrides the provider default).
    #[serde(skip_serializing)]
    pub api_url: Option<String>,
    /// Maximum tokens to request per completion.
    pub max_tokens: usize,
    /// Sampling temperature. Kept low so plans are reproducible.
    pub temperature: f64,
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .field("has_api_url", &self.api_url.is_some())
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Serialize for ModelConfig {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ModelConfig", 4)?;
        state.serialize_field("provider", &self.provider)?;
        state.serialize_field("model", &self.model)?;
        // api_key and api_url are intentionally omitted.
        state.serialize_field("max_tokens", &self.max_tokens)?;
        state.serialize_field("temperature", &self.temperature)?;
        state.end()
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_owned(),
            model: "openai/gpt-4-turbo-preview".to_owned(),
            api_key: None,
            api_url: None,
            max_tokens: 1000,
            temperature: 0.1,
        }
    }
}

// ---------------------------------------------------------------------------
// PolicySection
// ---------------------------------------------------------------------------

/// Safety policy: whitelists, blocklists, and bounds checked before anything
/// runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    /// Applications that may be opened or closed. Compared case-insensitively
    /// as whole identifiers; paths never match.
    pub whitelisted_apps: Vec<String>,
    /// Literal substrings that deny any text payload containing them.
    pub dangerous_keywords: Vec<String>,
    /// Regular expressions that deny any text payload matching them.
    pub dangerous_patterns: Vec<String>,
    /// File extensions that file actions may touch (leading dot optional).
    pub safe_extensions: Vec<String>,
    /// Directory prefixes file actions may not touch.
    pub restricted_dirs: Vec<String>,
    /// Directory relative paths are resolved against. `None` means the
    /// process working directory at startup.
    pub base_dir: Option<String>,
    /// Maximum `file_write` content size in bytes.
    pub max_write_bytes: u64,
    /// Maximum `type_text` length in characters.
    pub max_text_chars: usize,
    /// Largest allowed x coordinate for pointer actions.
    pub max_screen_x: i32,
    /// Largest allowed y coordinate for pointer actions.
    pub max_screen_y: i32,
    /// Key combinations that are never sent (e.g. `alt+f4`).
    pub blocked_keys: Vec<String>,
    /// Longest allowed `wait`, in seconds.
    pub max_wait_secs: f64,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            whitelisted_apps: to_strings(&[
                "notepad.exe",
                "notepad++.exe",
                "code.exe",
                "chrome.exe",
                "firefox.exe",
                "calculator.exe",
                "mspaint.exe",
                "explorer.exe",
                "wordpad.exe",
                "write.exe",
                "gedit",
                "kate",
                "nano",
                "vim",
                "emacs",
                "firefox",
                "chromium",
                "nautilus",
                "dolphin",
                "thunar",
                "pcmanfm",
                "calc",
                "gnome-calculator",
            ]),
            dangerous_keywords: to_strings(&[
                "rm -rf",
                "del /f",
                "shutdown",
                "reboot",
                "taskkill",
                "sudo rm",
                "rmdir",
                "fdisk",
                "mkfs",
                "dd if=",
                "format c:",
                "powershell -c",
                "cmd /c",
                "bash -c",
            ]),
            dangerous_patterns: to_strings(&[
                r"\bwget\s+\S+",
                r"\bcurl\s+\S+",
                r"\beval\s*\(",
                r"\bexec\s*\(",
            ]),
            safe_extensions: to_strings(&[
                ".txt", ".md", ".json", ".csv", ".xml", ".html", ".css", ".js", ".py", ".java",
                ".cpp", ".c", ".h", ".go", ".rs", ".php", ".rb",
            ]),
            restricted_dirs: to_strings(&[
                "/etc",
                "/bin",
                "/sbin",
                "/usr/bin",
                "/usr/sbin",
                "/usr/lib",
                "/lib",
                "/root",
                "/System",
                "/Library",
                r"C:\Windows",
                r"C:\Program Files",
                r"C:\Program Files (x86)",
            ]),
            base_dir: None,
            max_write_bytes: 10_485_760,
            max_text_chars: 10_000,
            max_screen_x: 3840,
            max_screen_y: 2160,
            blocked_keys: to_strings(&["alt+f4", "ctrl+alt+del", "cmd+q", "win+r"]),
            max_wait_secs: 60.0,
        }
    }
}

// ---------------------------------------------------------------------------
// ConfirmationSection
// ---------------------------------------------------------------------------

/// Which actions need a human yes before they run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationSection {
    /// Master switch. When `false` nothing requires confirmation.
    pub enabled: bool,
    /// Action kinds that always need confirmation (snake_case names).
    pub critical_actions: Vec<String>,
    /// File actions whose path contains one of these (case-insensitive)
    /// need confirmation.
    pub confirm_path_keywords: Vec<String>,
    /// How long to wait for an answer before treating it as a rejection.
    pub timeout_secs: u64,
}

impl Default for ConfirmationSection {
    fn default() -> Self {
        Self {
            enabled: true,
            critical_actions: to_strings(&["close_app", "file_write"]),
            confirm_path_keywords: to_strings(&["system", "program", "windows"]),
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// RetrySection
// ---------------------------------------------------------------------------

/// Retry pacing for transient language-model failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// `"exponential"` or `"fixed"`.
    pub backoff: String,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Cap on any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth factor for exponential backoff.
    pub exponential_base: f64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: "exponential".to_owned(),
            initial_delay_ms: 500,
            max_delay_ms: 8_000,
            exponential_base: 2.0,
        }
    }
}

// ---------------------------------------------------------------------------
// TimeoutsSection
// ---------------------------------------------------------------------------

/// Timeout budgets. All values are in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsSection {
    /// Maximum time for a single language-model request.
    pub request_secs: u64,
    /// Maximum time for a single desktop action (a `wait` gets its own
    /// duration on top).
    pub action_secs: u64,
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            request_secs: 30,
            action_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// AuditSection
// ---------------------------------------------------------------------------

/// Audit trail storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    /// Write the trail to a JSON-lines file. When `false` the trail lives in
    /// memory for the session only.
    pub persist: bool,
    /// Path of the JSON-lines file. `None` means `~/.deskhand/audit.jsonl`.
    pub path: Option<String>,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            persist: true,
            path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["deskhand_llm=debug"]`).
    pub directives: Vec<String>,
    /// Directory for rolling log files. `None` logs to stderr.
    pub directory: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            directory: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AutomationSection
// ---------------------------------------------------------------------------

/// Limits for the system automation driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationSection {
    /// Largest file `file_read` will load, in bytes.
    pub max_read_bytes: u64,
    /// How much of a read file is echoed back in the outcome, in characters.
    pub read_display_chars: usize,
    /// Explicit path to `xdotool`. `None` searches `PATH`.
    pub xdotool_path: Option<String>,
}

impl Default for AutomationSection {
    fn default() -> Self {
        Self {
            max_read_bytes: 52_428_800,
            read_display_chars: 1000,
            xdotool_path: None,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}
