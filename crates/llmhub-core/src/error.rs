//! Orchestration error taxonomy
//!
//! Every failure surfaced by the registry and the orchestration service is an
//! [`OrchestratorError`]. The type is `Clone` so that concurrent callers waiting
//! on the same provider initialization can all receive the leader's outcome;
//! non-clonable sources are held behind `Arc`.

use std::sync::Arc;

use thiserror::Error;

use crate::config::ConfigError;
use crate::providers::ProviderError;
use crate::secrets::SecretStoreError;
use crate::types::ProviderId;

/// Coarse classification of an [`OrchestratorError`], for branching and for
/// the `kind` field of stream error markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotRegistered,
    NotConfigured,
    SecretNotFound,
    SecretUnavailable,
    InitializationFailed,
    InvalidRequest,
    BackendResponse,
    Backend,
    NoActiveProvider,
    Cancelled,
    Config,
}

impl ErrorKind {
    /// Stable snake_case token
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotRegistered => "not_registered",
            ErrorKind::NotConfigured => "not_configured",
            ErrorKind::SecretNotFound => "secret_not_found",
            ErrorKind::SecretUnavailable => "secret_unavailable",
            ErrorKind::InitializationFailed => "initialization_failed",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::BackendResponse => "backend_response",
            ErrorKind::Backend => "backend",
            ErrorKind::NoActiveProvider => "no_active_provider",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Config => "config",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the provider registry and the orchestration service
#[derive(Error, Debug, Clone)]
pub enum OrchestratorError {
    /// No strategy registered under this id
    #[error("provider '{0}' is not registered")]
    NotRegistered(ProviderId),

    /// Strategy registered but no configuration loaded for it
    #[error("provider '{0}' is not configured")]
    NotConfigured(ProviderId),

    /// The secret resolver had no credential for the configured reference
    #[error("no secret found for provider '{provider}' (secret_ref '{secret_ref}')")]
    SecretNotFound {
        provider: ProviderId,
        secret_ref: String,
    },

    /// The secret resolver itself failed
    #[error("secret store unavailable for provider '{provider}': {source}")]
    SecretUnavailable {
        provider: ProviderId,
        #[source]
        source: Arc<SecretStoreError>,
    },

    /// The strategy rejected its configuration or credential
    #[error("failed to initialize provider '{provider}': {source}")]
    InitializationFailed {
        provider: ProviderId,
        #[source]
        source: Arc<ProviderError>,
    },

    /// The caller's request cannot be served as given
    #[error("invalid request: {message}")]
    InvalidRequest {
        message: String,
        #[source]
        source: Option<Box<OrchestratorError>>,
    },

    /// The backend answered, but the answer is unusable
    #[error("unusable response from '{provider}': {message}")]
    BackendResponse {
        provider: ProviderId,
        message: String,
    },

    /// The backend call failed
    #[error("provider '{provider}' failed: {source}")]
    Backend {
        provider: ProviderId,
        #[source]
        source: Arc<ProviderError>,
    },

    /// `get_active` was called before any provider was activated
    #[error("no active provider selected")]
    NoActiveProvider,

    /// The caller cancelled the operation
    #[error("operation cancelled")]
    Cancelled,

    /// Loading provider configuration failed
    #[error("configuration error: {0}")]
    Config(Arc<ConfigError>),
}

impl OrchestratorError {
    /// Create an invalid request error with no underlying cause
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a resolution failure as an invalid request, keeping the cause
    pub fn invalid_request_from(cause: OrchestratorError) -> Self {
        Self::InvalidRequest {
            message: cause.to_string(),
            source: Some(Box::new(cause)),
        }
    }

    /// Create a backend response error
    pub fn backend_response(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::BackendResponse {
            provider,
            message: message.into(),
        }
    }

    /// Classify a strategy failure
    ///
    /// Cancellation and unparseable payloads get their own kinds; everything
    /// else is a transport/API failure.
    pub fn from_provider(provider: ProviderId, err: ProviderError) -> Self {
        match err {
            ProviderError::Cancelled => Self::Cancelled,
            ProviderError::InvalidResponse { message, .. } => Self::BackendResponse { provider, message },
            ProviderError::Json(e) => Self::BackendResponse {
                provider,
                message: e.to_string(),
            },
            other => Self::Backend {
                provider,
                source: Arc::new(other),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotRegistered(_) => ErrorKind::NotRegistered,
            Self::NotConfigured(_) => ErrorKind::NotConfigured,
            Self::SecretNotFound { .. } => ErrorKind::SecretNotFound,
            Self::SecretUnavailable { .. } => ErrorKind::SecretUnavailable,
            Self::InitializationFailed { .. } => ErrorKind::InitializationFailed,
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::BackendResponse { .. } => ErrorKind::BackendResponse,
            Self::Backend { .. } => ErrorKind::Backend,
            Self::NoActiveProvider => ErrorKind::NoActiveProvider,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// True for errors caused by missing registration or configuration
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::NotRegistered(_) | Self::NotConfigured(_))
    }

    /// Whether the same call might succeed if repeated later
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Backend { source, .. } => !source.is_auth_error(),
            Self::SecretUnavailable { .. } | Self::InitializationFailed { .. } => true,
            _ => false,
        }
    }

    /// The resolution failure behind an `InvalidRequest`, if any
    pub fn cause(&self) -> Option<&OrchestratorError> {
        match self {
            Self::InvalidRequest { source, .. } => source.as_deref(),
            _ => None,
        }
    }
}

impl From<ConfigError> for OrchestratorError {
    fn from(err: ConfigError) -> Self {
        Self::Config(Arc::new(err))
    }
}

/// Result type for orchestration operations
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
