//! Provider error types

use thiserror::Error;

/// Errors that can occur during provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Missing API key
    #[error("API key is required for {provider}")]
    MissingApiKey { provider: String },

    /// API request failed
    #[error("{provider} API error ({status}): {message}")]
    ApiError {
        provider: String,
        status: u16,
        message: String,
    },

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request was cancelled
    #[error("Request cancelled")]
    Cancelled,

    /// Stream ended unexpectedly
    #[error("Stream ended unexpectedly")]
    StreamEnded,

    /// Invalid response from provider
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },

    /// Rate limited
    #[error("{provider} rate limited: {message}")]
    RateLimited { provider: String, message: String },

    /// Configuration rejected during initialization
    #[error("Invalid configuration for {provider}: {message}")]
    InvalidConfig { provider: String, message: String },

    /// A capability was invoked before `initialize` succeeded
    #[error("{provider} is not initialized")]
    NotInitialized { provider: String },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Create an API error
    pub fn api_error(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a missing API key error
    pub fn missing_api_key(provider: impl Into<String>) -> Self {
        Self::MissingApiKey {
            provider: provider.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a rate limited error
    pub fn rate_limited(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a not-initialized error
    pub fn not_initialized(provider: impl Into<String>) -> Self {
        Self::NotInitialized {
            provider: provider.into(),
        }
    }

    /// True when retrying with the same credential cannot help
    pub fn is_auth_error(&self) -> bool {
        match self {
            Self::MissingApiKey { .. } => true,
            Self::ApiError { status, .. } => matches!(status, 401 | 403),
            _ => false,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors() {
        assert!(ProviderError::missing_api_key("gemini").is_auth_error());
        assert!(ProviderError::api_error("openai", 401, "bad key").is_auth_error());
        assert!(!ProviderError::api_error("openai", 500, "oops").is_auth_error());
        assert!(!ProviderError::rate_limited("openai", "slow down").is_auth_error());
    }

    #[test]
    fn test_display() {
        let err = ProviderError::api_error("anthropic", 529, "overloaded");
        assert_eq!(err.to_string(), "anthropic API error (529): overloaded");
    }
}
