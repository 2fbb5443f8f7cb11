//! Configuration source trait

use async_trait::async_trait;

use crate::types::ProviderId;
use super::document::ProvidersFile;

/// Somewhere provider configuration can be read from
///
/// Implementations:
/// - `MemoryConfigSource`: In-memory for testing
/// - `FileConfigSource`: Reads from YAML file (~/.config/llmhub/providers.yaml)
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Load and validate the provider configuration
    async fn load(&self) -> ConfigResult<ProvidersFile>;

    /// Short description for log lines (a path, or "memory")
    fn describe(&self) -> String;
}

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Provider not configured: {0}")]
    ProviderNotFound(ProviderId),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
