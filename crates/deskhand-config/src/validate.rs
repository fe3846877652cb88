//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that every pattern compiles.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Action kind names accepted in `confirmation.critical_actions`.
const ACTION_KINDS: &[&str] = &[
    "click",
    "type_text",
    "key_press",
    "open_app",
    "close_app",
    "file_read",
    "file_write",
    "mouse_move",
    "scroll",
    "wait",
];

/// Upper bound for `retry.max_attempts`.
const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Upper bound for `model.max_tokens`.
const MAX_TOKENS_UPPER_BOUND: usize = 128_000;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_model(config)?;
    validate_policy(config)?;
    validate_confirmation(config)?;
    validate_retry(config)?;
    validate_timeouts(config)?;
    validate_logging(config)?;
    validate_automation(config)?;
    Ok(())
}

fn validate_model(config: &Config) -> ConfigResult<()> {
    let m = &config.model;

    if !matches!(m.provider.as_str(), "openrouter" | "openai" | "openai-compat") {
        return Err(ConfigError::invalid(
            "model.provider",
            format!(
                "unsupported provider '{}'; expected one of: openrouter, openai, openai-compat",
                m.provider
            ),
        ));
    }

    if m.provider == "openai-compat" && m.api_url.is_none() {
        return Err(ConfigError::invalid(
            "model.api_url",
            "openai-compat provider requires an api_url",
        ));
    }

    if m.model.trim().is_empty() {
        return Err(ConfigError::invalid("model.model", "model name must not be empty"));
    }

    if !(0.0..=2.0).contains(&m.temperature) {
        return Err(ConfigError::invalid(
            "model.temperature",
            format!(
                "temperature {} is out of range; must be between 0.0 and 2.0",
                m.temperature
            ),
        ));
    }

    if m.max_tokens == 0 || m.max_tokens > MAX_TOKENS_UPPER_BOUND {
        return Err(ConfigError::invalid(
            "model.max_tokens",
            format!("max_tokens must be between 1 and {MAX_TOKENS_UPPER_BOUND}"),
        ));
    }

    Ok(())
}

fn validate_policy(config: &Config) -> ConfigResult<()> {
    let p = &config.policy;

    for (i, pattern) in p.dangerous_patterns.iter().enumerate() {
        if let Err(e) = regex::Regex::new(pattern) {
            return Err(ConfigError::invalid(
                &format!("policy.dangerous_patterns[{i}]"),
                format!("invalid regex '{pattern}': {e}"),
            ));
        }
    }

    let lists = [
        ("policy.whitelisted_apps", &p.whitelisted_apps),
        ("policy.dangerous_keywords", &p.dangerous_keywords),
        ("policy.safe_extensions", &p.safe_extensions),
        ("policy.restricted_dirs", &p.restricted_dirs),
        ("policy.blocked_keys", &p.blocked_keys),
    ];
    for (field, entries) in lists {
        if let Some(i) = entries.iter().position(|e| e.trim().is_empty()) {
            return Err(ConfigError::invalid(
                &format!("{field}[{i}]"),
                "entries must not be empty",
            ));
        }
    }

    if p.max_write_bytes == 0 {
        return Err(ConfigError::invalid(
            "policy.max_write_bytes",
            "max_write_bytes must be greater than 0",
        ));
    }

    if p.max_text_chars == 0 {
        return Err(ConfigError::invalid(
            "policy.max_text_chars",
            "max_text_chars must be greater than 0",
        ));
    }

    if p.max_screen_x <= 0 || p.max_screen_y <= 0 {
        return Err(ConfigError::invalid(
            "policy.max_screen_x",
            "screen bounds must be positive",
        ));
    }

    if !p.max_wait_secs.is_finite() || p.max_wait_secs <= 0.0 {
        return Err(ConfigError::invalid(
            "policy.max_wait_secs",
            "max_wait_secs must be a finite positive number",
        ));
    }

    Ok(())
}

fn validate_confirmation(config: &Config) -> ConfigResult<()> {
    let c = &config.confirmation;

    for kind in &c.critical_actions {
        if !ACTION_KINDS.contains(&kind.as_str()) {
            return Err(ConfigError::invalid(
                "confirmation.critical_actions",
                format!(
                    "unknown action kind '{kind}'; expected one of: {}",
                    ACTION_KINDS.join(", ")
                ),
            ));
        }
    }

    if c.timeout_secs == 0 {
        return Err(ConfigError::invalid(
            "confirmation.timeout_secs",
            "timeout_secs must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_retry(config: &Config) -> ConfigResult<()> {
    let r = &config.retry;

    if r.max_attempts == 0 || r.max_attempts > MAX_RETRY_ATTEMPTS {
        return Err(ConfigError::invalid(
            "retry.max_attempts",
            format!("max_attempts must be between 1 and {MAX_RETRY_ATTEMPTS}"),
        ));
    }

    if !matches!(r.backoff.as_str(), "exponential" | "fixed") {
        return Err(ConfigError::invalid(
            "retry.backoff",
            format!("invalid backoff '{}'; expected exponential or fixed", r.backoff),
        ));
    }

    if !r.exponential_base.is_finite() || r.exponential_base < 1.0 {
        return Err(ConfigError::invalid(
            "retry.exponential_base",
            "exponential_base must be a finite number >= 1.0",
        ));
    }

    if r.initial_delay_ms > r.max_delay_ms {
        return Err(ConfigError::invalid(
            "retry.initial_delay_ms",
            format!(
                "initial_delay_ms ({}) must not exceed max_delay_ms ({})",
                r.initial_delay_ms, r.max_delay_ms
            ),
        ));
    }

    Ok(())
}

fn validate_timeouts(config: &Config) -> ConfigResult<()> {
    let t = &config.timeouts;

    if t.request_secs == 0 {
        return Err(ConfigError::invalid(
            "timeouts.request_secs",
            "request_secs must be greater than 0",
        ));
    }

    if t.action_secs == 0 {
        return Err(ConfigError::invalid(
            "timeouts.action_secs",
            "action_secs must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(
        l.level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(ConfigError::invalid(
            "logging.level",
            format!(
                "invalid log level '{}'; expected one of: trace, debug, info, warn, error",
                l.level
            ),
        ));
    }

    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(ConfigError::invalid(
            "logging.format",
            format!(
                "invalid log format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        ));
    }

    Ok(())
}

fn validate_automation(config: &Config) -> ConfigResult<()> {
    if config.automation.max_read_bytes == 0 {
        return Err(ConfigError::invalid(
            "automation.max_read_bytes",
            "max_read_bytes must be greater than 0",
        ));
    }
    Ok(())
}
