//! Core types shared by the registry, the strategies and the orchestration service

mod message;
mod model;
mod request;
mod response;
mod schema;
mod stream;
mod cancellation;

pub use message::{last_user_text, ChatMessage, MessageRole};
pub use model::{ModelInfo, ProviderConfig, ProviderId, UnknownProviderId};
pub use request::{estimate_tokens, GenerateRequest, ProviderRequest};
pub use response::{FinishReason, GenerateResponse, Usage};
pub use schema::{CompiledSchema, JsonSchema};
pub use stream::{ChunkMetadata, StreamChunk, StreamError};
pub use cancellation::CancellationToken;
