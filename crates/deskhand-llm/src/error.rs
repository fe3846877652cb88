//! LLM-related error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur with LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// API key not configured.
    #[error("API key not configured for {provider}")]
    ApiKeyNotConfigured {
        /// Provider name.
        provider: String,
    },

    /// The request never got a response (connect, DNS, TLS, reset).
    #[error("API request failed: {0}")]
    ApiRequestFailed(String),

    /// The service rejected the credentials (HTTP 401/403).
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limit exceeded (HTTP 429).
    #[error("Rate limit exceeded{}", retry_hint(.retry_after_secs))]
    RateLimitExceeded {
        /// Seconds to wait before retrying, when the service said.
        retry_after_secs: Option<u64>,
    },

    /// The service failed (HTTP 5xx).
    #[error("Service error (HTTP {status}): {body}")]
    ServiceError {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The service rejected the request (other HTTP 4xx).
    #[error("Request rejected (HTTP {status}): {body}")]
    BadRequest {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The request did not complete in time.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid response from API.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LlmError {
    /// Whether a later attempt could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ApiRequestFailed(_)
                | Self::RateLimitExceeded { .. }
                | Self::ServiceError { .. }
                | Self::Timeout(_)
        )
    }
}

#[allow(clippy::ref_option)]
fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    retry_after_secs
        .map(|s| format!(", retry after {s} seconds"))
        .unwrap_or_default()
}

/// Result type for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;
