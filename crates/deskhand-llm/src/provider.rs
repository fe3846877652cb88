//! The provider seam between the interpreter and a chat-completion API.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::LlmResult;
use crate::types::{LlmResponse, Message};

/// Model used when the configuration names none.
pub const DEFAULT_MODEL: &str = "openai/gpt-4-turbo-preview";

/// A chat-completion backend.
///
/// One call is one HTTP round trip; retrying is the caller's business.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name for logs, e.g. `openrouter`.
    fn name(&self) -> &str;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Send `messages`, preceded by `system` when it is not empty.
    async fn complete(&self, messages: &[Message], system: &str) -> LlmResult<LlmResponse>;

    /// Send a single user prompt and return the reply text.
    async fn complete_simple(&self, system: &str, prompt: &str) -> LlmResult<String> {
        let response = self.complete(&[Message::user(prompt)], system).await?;
        Ok(response.message.content)
    }
}

/// Connection and sampling settings shared by providers.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Bearer token. Empty means not configured.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Completion token limit.
    pub max_tokens: usize,
    /// Sampling temperature, kept within 0.0 to 2.0.
    pub temperature: f64,
    /// Endpoint root without `/chat/completions`; `None` uses the provider's own.
    pub base_url: Option<String>,
    /// Whole-request timeout enforced by the HTTP client.
    pub timeout: Option<Duration>,
}

impl ProviderConfig {
    /// Settings for `model`, authenticated with `api_key`.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    /// Whether a key is present.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Limit completion length.
    #[must_use]
    pub fn max_tokens(self, max_tokens: usize) -> Self {
        Self { max_tokens, ..self }
    }

    /// Sampling temperature; out-of-range values are clamped.
    #[must_use]
    pub fn temperature(self, temperature: f64) -> Self {
        Self {
            temperature: temperature.clamp(0.0, 2.0),
            ..self
        }
    }

    /// Point at a different endpoint root.
    #[must_use]
    pub fn base_url(self, url: impl Into<String>) -> Self {
        Self {
            base_url: Some(url.into()),
            ..self
        }
    }

    /// Bound each request.
    #[must_use]
    pub fn timeout(self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1000,
            temperature: 0.1,
            base_url: None,
            timeout: None,
        }
    }
}

// Keys never reach logs.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("has_api_key", &self.has_api_key())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_key() {
        let config = ProviderConfig::new("sk-or-secret", "openai/gpt-4o");
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-or-secret"));
        assert!(debug.contains("has_api_key: true"));
    }

    #[test]
    fn test_blank_key_is_not_configured() {
        assert!(!ProviderConfig::new("  ", DEFAULT_MODEL).has_api_key());
    }

    #[test]
    fn test_builder_chain() {
        let config = ProviderConfig::default()
            .temperature(5.0)
            .max_tokens(300)
            .timeout(Duration::from_secs(20));
        assert!((config.temperature - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.max_tokens, 300);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.timeout, Some(Duration::from_secs(20)));
    }
}
