//! OpenAI-compatible chat-completions provider.
//!
//! Works with:
//! - `OpenRouter` (default)
//! - `OpenAI` API
//! - Any `OpenAI`-compatible endpoint (vLLM, Ollama, LM Studio)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{LlmError, LlmResult};
use crate::provider::{LlmProvider, ProviderConfig};
use crate::types::{LlmResponse, Message, MessageRole, StopReason, Usage};

/// Default `OpenRouter` API base.
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
/// Default `OpenAI` API base.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Longest error body kept in an error value.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    client: Client,
    provider: &'static str,
    model: String,
    max_tokens: usize,
    temperature: f64,
    endpoint: String,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl OpenAiCompatProvider {
    /// `OpenRouter`, which takes vendor-prefixed model names such as
    /// `openai/gpt-4-turbo-preview`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if the HTTP client cannot be built.
    pub fn openrouter(config: ProviderConfig) -> LlmResult<Self> {
        let base = config
            .base_url
            .clone()
            .unwrap_or_else(|| OPENROUTER_BASE_URL.to_string());
        Self::build("openrouter", &base, config)
    }

    /// `OpenAI` directly. A leading `openai/` vendor prefix on the model name
    /// is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if the HTTP client cannot be built.
    pub fn openai(mut config: ProviderConfig) -> LlmResult<Self> {
        if let Some(stripped) = config.model.strip_prefix("openai/") {
            config.model = stripped.to_string();
        }
        let base = config
            .base_url
            .clone()
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string());
        Self::build("openai", &base, config)
    }

    /// Any OpenAI-compatible endpoint. `config.base_url` is required.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if no base URL is set or the HTTP
    /// client cannot be built.
    pub fn custom(config: ProviderConfig) -> LlmResult<Self> {
        let base = config
            .base_url
            .clone()
            .ok_or_else(|| LlmError::ConfigError("openai-compat requires a base URL".into()))?;
        Self::build("openai-compat", &base, config)
    }

    /// Pick a constructor by provider name (`openrouter`, `openai`,
    /// `openai-compat`).
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] for an unknown provider name.
    pub fn from_name(provider: &str, config: ProviderConfig) -> LlmResult<Self> {
        match provider {
            "openrouter" => Self::openrouter(config),
            "openai" => Self::openai(config),
            "openai-compat" => Self::custom(config),
            other => Err(LlmError::ConfigError(format!("unknown provider '{other}'"))),
        }
    }

    fn build(provider: &'static str, base: &str, config: ProviderConfig) -> LlmResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| LlmError::ConfigError(format!("failed to build HTTP client: {e}")))?;

        let api_key = config.has_api_key().then(|| config.api_key.trim().to_string());
        Ok(Self {
            client,
            provider,
            model: config.model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            api_key,
            timeout: config.timeout,
        })
    }

    /// The full chat-completions URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the request body.
    fn build_request(&self, messages: &[Message], system: &str) -> Value {
        let mut wire = Vec::with_capacity(messages.len().saturating_add(1));
        if !system.is_empty() {
            wire.push(serde_json::json!({
                "role": MessageRole::System.as_str(),
                "content": system
            }));
        }
        for msg in messages {
            wire.push(serde_json::json!({
                "role": msg.role.as_str(),
                "content": msg.content
            }));
        }

        serde_json::json!({
            "model": self.model,
            "messages": wire,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "stream": false
        })
    }

    fn map_transport_error(&self, e: &reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.timeout.unwrap_or_default())
        } else {
            LlmError::ApiRequestFailed(e.to_string())
        }
    }
}

/// Map a non-success HTTP status to an error.
fn error_for_status(status: StatusCode, body: &str, retry_after_secs: Option<u64>) -> LlmError {
    let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    match status.as_u16() {
        401 | 403 => LlmError::AuthenticationFailed(body),
        429 => LlmError::RateLimitExceeded { retry_after_secs },
        code if status.is_server_error() => LlmError::ServiceError { status: code, body },
        code => LlmError::BadRequest { status: code, body },
    }
}

/// Whether a URL points to a local endpoint where an API key is typically
/// not required.
fn is_local_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.contains("localhost") || lower.contains("127.0.0.1") || lower.contains("[::1]")
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[Message], system: &str) -> LlmResult<LlmResponse> {
        if self.api_key.is_none() && !is_local_url(&self.endpoint) {
            return Err(LlmError::ApiKeyNotConfigured {
                provider: self.provider.to_string(),
            });
        }

        let request_body = self.build_request(messages, system);

        debug!(
            provider = self.provider,
            model = %self.model,
            endpoint = %self.endpoint,
            "Making chat completion request"
        );

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json");

        if let Some(ref api_key) = self.api_key {
            let mut auth_value = reqwest::header::HeaderValue::try_from(format!(
                "Bearer {api_key}"
            ))
            .map_err(|e| LlmError::ConfigError(format!("Invalid API key characters: {e}")))?;
            auth_value.set_sensitive(true);
            request = request.header("Authorization", auth_value);
        }

        let response = request
            .json(&request_body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            warn!(provider = self.provider, status = %status, "chat completion failed");
            return Err(error_for_status(status, &body, retry_after));
        }

        let response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

        let stop_reason = match choice.finish_reason.as_deref() {
            Some("length") => StopReason::MaxTokens,
            Some("content_filter" | "stop_sequence") => StopReason::StopSequence,
            _ => StopReason::EndTurn,
        };

        Ok(LlmResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            stop_reason,
            usage: Usage {
                input_tokens: response.usage.prompt_tokens,
                output_tokens: response.usage.completion_tokens,
            },
        })
    }
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("has_api_key", &self.api_key.is_some())
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: OpenAiUsage,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProviderConfig {
        ProviderConfig::new("sk-test", "openai/gpt-4-turbo-preview")
    }

    #[test]
    fn test_openrouter_defaults() {
        let provider = OpenAiCompatProvider::openrouter(config()).unwrap();
        assert_eq!(provider.name(), "openrouter");
        assert_eq!(provider.model(), "openai/gpt-4-turbo-preview");
        assert_eq!(
            provider.endpoint(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn test_openai_strips_vendor_prefix() {
        let provider = OpenAiCompatProvider::openai(config()).unwrap();
        assert_eq!(provider.model(), "gpt-4-turbo-preview");
        assert!(provider.endpoint().starts_with("https://api.openai.com/v1"));
    }

    #[test]
    fn test_custom_requires_base_url() {
        assert!(matches!(
            OpenAiCompatProvider::custom(config()),
            Err(LlmError::ConfigError(_))
        ));

        let provider =
            OpenAiCompatProvider::custom(config().base_url("http://localhost:8080/v1/")).unwrap();
        assert_eq!(
            provider.endpoint(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_from_name_unknown() {
        assert!(OpenAiCompatProvider::from_name("claude", config()).is_err());
    }

    #[test]
    fn test_build_request() {
        let provider = OpenAiCompatProvider::openrouter(config().max_tokens(500)).unwrap();
        let request = provider.build_request(&[Message::user("open notepad")], "Plan actions");

        assert_eq!(request["model"], "openai/gpt-4-turbo-preview");
        assert_eq!(request["max_tokens"], 500);
        assert_eq!(request["stream"], false);
        let messages = request["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "open notepad");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, "nope", None),
            LlmError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::TOO_MANY_REQUESTS, "", Some(3)),
            LlmError::RateLimitExceeded {
                retry_after_secs: Some(3)
            }
        ));
        assert!(matches!(
            error_for_status(StatusCode::BAD_GATEWAY, "", None),
            LlmError::ServiceError { status: 502, .. }
        ));
        assert!(matches!(
            error_for_status(StatusCode::BAD_REQUEST, "", None),
            LlmError::BadRequest { status: 400, .. }
        ));
    }

    #[test]
    fn test_error_body_truncated() {
        let body = "x".repeat(2_000);
        let LlmError::ServiceError { body, .. } =
            error_for_status(StatusCode::INTERNAL_SERVER_ERROR, &body, None)
        else {
            panic!("expected ServiceError");
        };
        assert_eq!(body.len(), MAX_ERROR_BODY_CHARS);
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let provider = OpenAiCompatProvider::openrouter(ProviderConfig::default()).unwrap();
        let err = provider.complete(&[], "").await.unwrap_err();
        assert!(matches!(err, LlmError::ApiKeyNotConfigured { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_invalid_api_key_characters() {
        let provider =
            OpenAiCompatProvider::openrouter(ProviderConfig::new("invalid\nkey", "m")).unwrap();
        let err = provider.complete(&[], "").await.unwrap_err();
        assert!(
            matches!(err, LlmError::ConfigError(ref msg) if msg.contains("Invalid API key characters"))
        );
    }
}
