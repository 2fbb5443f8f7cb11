//! GenaiProvider - provider strategy backed by the genai crate
//!
//! One instance serves one of Gemini, OpenAI, Anthropic or Ollama. The genai
//! client is built during `initialize` and reused until a different
//! credential or base URL is supplied.

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

use genai::chat::ChatStreamEvent;
use genai::Client;

use crate::logging::Logger;
use crate::types::{
    CancellationToken, GenerateResponse, JsonSchema, ModelInfo, ProviderConfig, ProviderId,
    ProviderRequest,
};

use super::error::{ProviderError, ProviderResult};
use super::genai_adapter::{
    create_client, from_genai_error, from_genai_event, from_genai_usage, requires_credential,
    to_chat_request, to_genai_options, to_json_options, ClientTarget,
};
use super::traits::{ProviderStrategy, StreamResponse};

/// A warmed client together with what it was built from
struct WarmClient {
    target: ClientTarget,
    client: Client,
}

/// Provider strategy for the genai-supported backends
pub struct GenaiProvider {
    id: ProviderId,
    logger: Arc<dyn Logger>,
    warm: RwLock<Option<WarmClient>>,
}

impl GenaiProvider {
    /// Create an uninitialized provider for `id`
    pub fn new(id: ProviderId, logger: Arc<dyn Logger>) -> Self {
        Self {
            id,
            logger,
            warm: RwLock::new(None),
        }
    }

    /// Check if this strategy can serve the given provider id
    pub fn supports(id: ProviderId) -> bool {
        super::genai_adapter::adapter_kind(id).is_some()
    }

    /// Whether a client is currently warmed
    pub fn is_warm(&self) -> bool {
        self.warm.read().is_some()
    }

    fn client(&self) -> ProviderResult<Client> {
        self.warm
            .read()
            .as_ref()
            .map(|w| w.client.clone())
            .ok_or_else(|| ProviderError::not_initialized(self.id.as_str()))
    }

    fn default_models(&self) -> Vec<ModelInfo> {
        match self.id {
            ProviderId::Gemini => vec![
                ModelInfo::new("gemini-2.0-flash", 1_048_576)
                    .with_pricing(0.10, 0.40)
                    .with_json()
                    .with_vision(),
                ModelInfo::new("gemini-1.5-pro", 2_097_152)
                    .with_pricing(1.25, 5.00)
                    .with_json()
                    .with_vision(),
            ],
            ProviderId::OpenAi => vec![
                ModelInfo::new("gpt-4o", 128_000)
                    .with_pricing(2.50, 10.00)
                    .with_json()
                    .with_vision(),
                ModelInfo::new("gpt-4o-mini", 128_000)
                    .with_pricing(0.15, 0.60)
                    .with_json()
                    .with_vision(),
            ],
            ProviderId::Anthropic => vec![
                ModelInfo::new("claude-3-5-sonnet-latest", 200_000)
                    .with_pricing(3.00, 15.00)
                    .with_json()
                    .with_vision(),
                ModelInfo::new("claude-3-5-haiku-latest", 200_000)
                    .with_pricing(0.80, 4.00)
                    .with_json(),
            ],
            ProviderId::Ollama => vec![ModelInfo::new("llama3.2", 128_000).with_json()],
            ProviderId::Mock => vec![],
        }
    }
}

#[async_trait]
impl ProviderStrategy for GenaiProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn initialize(&self, config: &ProviderConfig, credential: &str) -> ProviderResult<()> {
        if config.id != self.id {
            return Err(ProviderError::invalid_config(
                self.id.as_str(),
                format!("configuration is for '{}'", config.id),
            ));
        }
        if credential.trim().is_empty() && requires_credential(self.id) {
            return Err(ProviderError::missing_api_key(self.id.as_str()));
        }

        let target = ClientTarget {
            provider: self.id,
            credential: credential.to_string(),
            base_url: config.base_url.clone(),
        };

        if self.warm.read().as_ref().is_some_and(|w| w.target == target) {
            self.logger.debug(&format!("[GenaiProvider] {}: reusing warm client", self.id));
            return Ok(());
        }

        let client = create_client(&target)?;
        *self.warm.write() = Some(WarmClient { target, client });
        self.logger.info(&format!("[GenaiProvider] {}: client ready", self.id));
        Ok(())
    }

    async fn generate(
        &self,
        request: &ProviderRequest,
        cancel_token: CancellationToken,
    ) -> ProviderResult<GenerateResponse> {
        let client = self.client()?;
        self.logger.info(&format!(
            "[GenaiProvider] generate called: provider={}, model={}",
            self.id, request.model
        ));

        let chat_req = to_chat_request(request);
        let options = to_genai_options(request);

        let response = tokio::select! {
            _ = cancel_token.cancelled() => return Err(ProviderError::Cancelled),
            res = client.exec_chat(&request.model, chat_req, Some(&options)) => {
                res.map_err(|e| from_genai_error(self.id, e))?
            }
        };

        let content = response
            .first_text()
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ProviderError::invalid_response(self.id.as_str(), "empty response"))?
            .to_string();
        let usage = from_genai_usage(&response.usage);
        Ok(GenerateResponse::new(content, request.model.clone(), usage))
    }

    async fn stream_generate(
        &self,
        request: &ProviderRequest,
        cancel_token: CancellationToken,
    ) -> ProviderResult<StreamResponse> {
        let client = self.client()?;
        self.logger.info(&format!(
            "[GenaiProvider] stream_generate called: provider={}, model={}",
            self.id, request.model
        ));

        let chat_req = to_chat_request(request);
        let options = to_genai_options(request);

        let chat_stream = tokio::select! {
            _ = cancel_token.cancelled() => return Err(ProviderError::Cancelled),
            res = client.exec_chat_stream(&request.model, chat_req, Some(&options)) => {
                res.map_err(|e| from_genai_error(self.id, e))?
            }
        };

        self.logger.info("[GenaiProvider] Stream started successfully");

        let cancel = cancel_token.clone();
        let logger = Arc::clone(&self.logger);
        let provider_id = self.id;

        let stream = chat_stream.stream.filter_map(move |result| {
            let cancel = cancel.clone();
            let logger = Arc::clone(&logger);

            async move {
                if cancel.is_cancelled() {
                    logger.info("[GenaiProvider] Stream cancelled");
                    return Some(Err(ProviderError::Cancelled));
                }

                match result {
                    Ok(event) => {
                        match &event {
                            ChatStreamEvent::Start => {
                                logger.debug("[GenaiProvider] Stream event: Start");
                            }
                            ChatStreamEvent::Chunk(c) => {
                                logger.debug(&format!(
                                    "[GenaiProvider] Stream event: Chunk ({} chars)",
                                    c.content.len()
                                ));
                            }
                            ChatStreamEvent::End(_) => {
                                logger.info("[GenaiProvider] Stream event: End");
                            }
                            _ => {}
                        }
                        from_genai_event(event)
                    }
                    Err(e) => {
                        logger.error(&format!("[GenaiProvider] Stream error: {}", e));
                        Some(Err(from_genai_error(provider_id, e)))
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn generate_json(
        &self,
        request: &ProviderRequest,
        schema: &JsonSchema,
        cancel_token: CancellationToken,
    ) -> ProviderResult<Value> {
        let client = self.client()?;
        let chat_req = to_chat_request(request);
        let options = to_json_options(request, schema);

        let response = tokio::select! {
            _ = cancel_token.cancelled() => return Err(ProviderError::Cancelled),
            res = client.exec_chat(&request.model, chat_req, Some(&options)) => {
                res.map_err(|e| from_genai_error(self.id, e))?
            }
        };

        let text = response
            .first_text()
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ProviderError::invalid_response(self.id.as_str(), "empty response"))?;
        serde_json::from_str(strip_code_fence(text)).map_err(|e| {
            ProviderError::invalid_response(self.id.as_str(), format!("response is not valid JSON: {}", e))
        })
    }

    fn list_models(&self) -> Vec<ModelInfo> {
        self.default_models()
    }
}

/// Remove a surrounding markdown code fence some models add to JSON output
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
