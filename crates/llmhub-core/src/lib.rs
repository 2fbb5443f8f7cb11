//! llmhub Core
//!
//! Provider orchestration for LLM backends: a registry of interchangeable
//! provider strategies, lazily and securely initialized on first use, behind
//! one service that handles single-shot, streamed and schema-constrained JSON
//! generation.
//!
//! ## Layers
//!
//! - `secrets`: credential stores and the async `SecretResolver` contract
//! - `providers`: the `ProviderStrategy` trait, `GenaiProvider` and `MockProvider`
//! - `registry`: registration, configuration and single-flight initialization
//! - `orchestration`: request validation, dispatch, stream termination, presets
//! - `config`: YAML provider configuration
//!
//! ```rust,ignore
//! use llmhub_core::{GenerateRequest, CancellationToken};
//!
//! let orchestrator = Orchestrator::from_source(&source, secrets, logger).await?;
//! let response = orchestrator
//!     .service()
//!     .generate_content(GenerateRequest::prompt("gemini", "Hello"), CancellationToken::new())
//!     .await?;
//! println!("{}", response.content);
//! ```

pub mod types;
pub mod error;
pub mod secrets;
pub mod logging;
pub mod config;
pub mod providers;
pub mod registry;
pub mod orchestration;
pub mod bootstrap;

// Re-export commonly used types
pub use types::{
    ChatMessage, MessageRole,
    ModelInfo, ProviderConfig, ProviderId,
    GenerateRequest, GenerateResponse, Usage, FinishReason,
    JsonSchema,
    StreamChunk,
    CancellationToken,
};

pub use error::{ErrorKind, OrchestratorError, OrchestratorResult};

pub use secrets::{
    SecretStore, SecretStoreError, SecretStoreResult,
    SecretResolver, StoreSecretResolver,
    EnvSecretStore, MemorySecretStore, ChainSecretStore, KeychainSecretStore,
};

pub use logging::{Logger, NoOpLogger, ConsoleLogger, TracingLogger};

pub use config::{ConfigSource, FileConfigSource, MemoryConfigSource, ProvidersFile};

pub use providers::{ProviderStrategy, ProviderError, GenaiProvider, MockProvider};

pub use registry::ProviderRegistry;

pub use orchestration::{ChunkStream, OrchestrationService, Preset};

pub use bootstrap::Orchestrator;
