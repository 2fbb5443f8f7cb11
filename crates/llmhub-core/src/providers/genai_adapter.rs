//! Adapter between llmhub types and genai types
//!
//! Conversion functions between our request/response types and genai's, plus
//! client construction. Auth never goes through genai's environment lookup:
//! the credential handed to `initialize` is the only key a client ever sees.

use std::future::Future;
use std::pin::Pin;

use genai::chat::{
    ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, ChatRequest,
    ChatResponseFormat, ChatRole as GenaiRole, ChatStreamEvent, JsonSpec, Usage as GenaiUsage,
};
use genai::resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver};
use genai::{adapter::AdapterKind, Client, ModelIden, ServiceTarget};

use crate::types::{
    ChatMessage, FinishReason, JsonSchema, MessageRole, ProviderId, ProviderRequest, StreamChunk,
    Usage,
};

use super::error::{ProviderError, ProviderResult};

// ============================================================================
// Request Conversion: llmhub -> genai
// ============================================================================

/// Convert llmhub MessageRole to genai ChatRole
pub fn to_genai_role(role: MessageRole) -> GenaiRole {
    match role {
        MessageRole::System => GenaiRole::System,
        MessageRole::User => GenaiRole::User,
        MessageRole::Assistant => GenaiRole::Assistant,
    }
}

/// Convert llmhub ChatMessage to genai ChatMessage
pub fn to_genai_message(msg: &ChatMessage) -> GenaiMessage {
    let content = msg.content.clone();
    match msg.role {
        MessageRole::System => GenaiMessage::system(content),
        MessageRole::User => GenaiMessage::user(content),
        MessageRole::Assistant => GenaiMessage::assistant(content),
    }
}

/// Build the genai chat request, carrying the system instruction separately
pub fn to_chat_request(request: &ProviderRequest) -> ChatRequest {
    let messages = request.messages.iter().map(to_genai_message).collect::<Vec<_>>();
    let chat_req = ChatRequest::new(messages);
    match &request.system_instruction {
        Some(system) => chat_req.with_system(system.clone()),
        None => chat_req,
    }
}

/// Sampling options shared by every call
pub fn to_genai_options(request: &ProviderRequest) -> GenaiOptions {
    let mut genai_opts = GenaiOptions::default().with_capture_usage(true);

    if let Some(temp) = request.temperature {
        genai_opts = genai_opts.with_temperature(temp as f64);
    }

    if let Some(max_tokens) = request.max_output_tokens {
        genai_opts = genai_opts.with_max_tokens(max_tokens);
    }

    genai_opts
}

/// Options for schema-constrained output
pub fn to_json_options(request: &ProviderRequest, schema: &JsonSchema) -> GenaiOptions {
    to_genai_options(request).with_response_format(ChatResponseFormat::JsonSpec(JsonSpec::new(
        "structured_output",
        schema.as_value().clone(),
    )))
}

// ============================================================================
// Response Conversion: genai -> llmhub
// ============================================================================

/// Convert genai token usage, treating missing counts as zero
pub fn from_genai_usage(usage: &GenaiUsage) -> Usage {
    let count = |v: Option<i32>| v.unwrap_or(0).max(0) as u32;
    Usage::new(count(usage.prompt_tokens), count(usage.completion_tokens))
}

/// Convert genai stream event to an llmhub StreamChunk
///
/// Events with no text for the caller are skipped.
pub fn from_genai_event(event: ChatStreamEvent) -> Option<ProviderResult<StreamChunk>> {
    match event {
        ChatStreamEvent::Chunk(chunk) => Some(Ok(StreamChunk::text(chunk.content))),
        ChatStreamEvent::End(end) => {
            let usage = end.captured_usage.as_ref().map(from_genai_usage);
            Some(Ok(StreamChunk::finished(FinishReason::Stop, usage)))
        }
        _ => None,
    }
}

/// Map a genai failure onto our error kinds
pub fn from_genai_error(provider: ProviderId, err: genai::Error) -> ProviderError {
    let message = err.to_string();
    let lower = message.to_lowercase();

    if lower.contains("429") || lower.contains("rate limit") {
        ProviderError::rate_limited(provider.as_str(), message)
    } else if lower.contains("401") || lower.contains("unauthorized") {
        ProviderError::api_error(provider.as_str(), 401, message)
    } else if lower.contains("403") || lower.contains("forbidden") {
        ProviderError::api_error(provider.as_str(), 403, message)
    } else {
        ProviderError::api_error(provider.as_str(), 500, message)
    }
}

// ============================================================================
// Client Creation with Custom Auth
// ============================================================================

/// genai adapter that serves a provider
pub fn adapter_kind(provider: ProviderId) -> Option<AdapterKind> {
    match provider {
        ProviderId::Gemini => Some(AdapterKind::Gemini),
        ProviderId::OpenAi => Some(AdapterKind::OpenAI),
        ProviderId::Anthropic => Some(AdapterKind::Anthropic),
        ProviderId::Ollama => Some(AdapterKind::Ollama),
        ProviderId::Mock => None,
    }
}

/// Whether the backend rejects anonymous calls
pub fn requires_credential(provider: ProviderId) -> bool {
    !matches!(provider, ProviderId::Ollama)
}

/// Normalize a custom base URL so genai can join paths onto it
pub fn normalize_base_url(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    }
}

/// Everything a genai client is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientTarget {
    pub provider: ProviderId,
    pub credential: String,
    pub base_url: Option<String>,
}

/// Create a genai Client bound to one provider and one credential
pub fn create_client(target: &ClientTarget) -> ProviderResult<Client> {
    let adapter = adapter_kind(target.provider).ok_or_else(|| {
        ProviderError::invalid_config(target.provider.as_str(), "no genai adapter for this provider")
    })?;

    let auth_key = Some(target.credential.clone()).filter(|k| !k.is_empty());
    let auth_resolver = AuthResolver::from_resolver_async_fn(
        move |_model_iden: ModelIden| -> Pin<Box<dyn Future<Output = genai::resolver::Result<Option<AuthData>>> + Send>> {
            let key = auth_key.clone();
            Box::pin(async move { Ok(key.map(AuthData::from_single)) })
        },
    );

    let base_url = target.base_url.as_deref().map(normalize_base_url);
    let target_resolver = ServiceTargetResolver::from_resolver_fn(
        move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let ServiceTarget { endpoint, auth, model } = target;
            let endpoint = match &base_url {
                Some(url) => Endpoint::from_owned(url.clone()),
                None => endpoint,
            };
            Ok(ServiceTarget {
                endpoint,
                auth,
                model: ModelIden::new(adapter, model.model_name.clone()),
            })
        },
    );

    Ok(Client::builder()
        .with_auth_resolver(auth_resolver)
        .with_service_target_resolver(target_resolver)
        .build())
}
