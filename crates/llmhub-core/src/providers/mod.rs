//! Provider strategies
//!
//! ## Architecture
//!
//! Every backend implements [`ProviderStrategy`]. Real backends go through the
//! `genai` crate, which handles:
//! - Streaming SSE parsing
//! - Provider-specific protocols (OpenAI, Anthropic, Gemini, Ollama)
//! - Structured output via JSON schema response formats
//!
//! The `MockProvider` is deterministic and records its lifecycle for tests.

mod traits;
mod error;
mod genai_adapter;
mod genai_provider;
mod mock;

pub use traits::{ProviderStrategy, StreamResponse};
pub use error::{ProviderError, ProviderResult};

pub use genai_provider::GenaiProvider;
pub use mock::{MockConfig, MockMode, MockProvider};

use crate::logging::Logger;
use crate::types::ProviderId;
use std::sync::Arc;

/// Create the strategy that serves `id`
pub fn create_strategy(id: ProviderId, logger: Arc<dyn Logger>) -> Arc<dyn ProviderStrategy> {
    match id {
        ProviderId::Mock => Arc::new(MockProvider::echo(logger)),
        _ => Arc::new(GenaiProvider::new(id, logger)),
    }
}

/// One uninitialized strategy per known provider id
pub fn default_strategies(logger: Arc<dyn Logger>) -> Vec<Arc<dyn ProviderStrategy>> {
    ProviderId::ALL
        .iter()
        .map(|id| create_strategy(*id, Arc::clone(&logger)))
        .collect()
}
