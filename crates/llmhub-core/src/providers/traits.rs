//! Provider strategy trait definition

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;

use crate::types::{
    CancellationToken, GenerateResponse, JsonSchema, ModelInfo, ProviderConfig, ProviderId,
    ProviderRequest, StreamChunk,
};
use super::error::ProviderResult;

/// Type alias for the streaming response
pub type StreamResponse = Pin<Box<dyn Stream<Item = ProviderResult<StreamChunk>> + Send>>;

/// Uniform capability contract implemented once per backend
///
/// A strategy is registered uninitialized. The registry calls [`initialize`]
/// exactly once per successful activation, with the provider's configuration
/// and the plaintext credential resolved from `config.secret_ref`; after that
/// the same instance is shared by all concurrent callers.
///
/// [`initialize`]: ProviderStrategy::initialize
#[async_trait]
pub trait ProviderStrategy: Send + Sync {
    /// The backend this strategy talks to
    fn id(&self) -> ProviderId;

    /// Bind configuration and credential, warming whatever client the
    /// backend needs
    async fn initialize(&self, config: &ProviderConfig, credential: &str) -> ProviderResult<()>;

    /// Single-shot generation
    async fn generate(
        &self,
        request: &ProviderRequest,
        cancel_token: CancellationToken,
    ) -> ProviderResult<GenerateResponse>;

    /// Streamed generation
    ///
    /// The returned stream yields text chunks in emission order. It may end
    /// with a final chunk carrying usage; callers must not rely on it.
    async fn stream_generate(
        &self,
        request: &ProviderRequest,
        cancel_token: CancellationToken,
    ) -> ProviderResult<StreamResponse>;

    /// Schema-constrained generation returning the parsed JSON document
    ///
    /// Unparseable backend output is reported as
    /// [`ProviderError::InvalidResponse`](super::ProviderError::InvalidResponse).
    async fn generate_json(
        &self,
        request: &ProviderRequest,
        schema: &JsonSchema,
        cancel_token: CancellationToken,
    ) -> ProviderResult<Value>;

    /// Models this backend knows about when the configuration lists none
    fn list_models(&self) -> Vec<ModelInfo> {
        Vec::new()
    }
}
