//! Mock provider for testing
//!
//! Provides deterministic, configurable responses without network dependencies.
//! Records every `initialize` call and capability invocation so tests can
//! assert on lifecycle behaviour.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::error::{ProviderError, ProviderResult};
use super::traits::{ProviderStrategy, StreamResponse};
use crate::logging::Logger;
use crate::types::{
    estimate_tokens, last_user_text, CancellationToken, FinishReason, GenerateResponse,
    JsonSchema, ModelInfo, ProviderConfig, ProviderId, ProviderRequest, StreamChunk, Usage,
};

/// Mock response mode
#[derive(Debug, Clone, Default)]
pub enum MockMode {
    /// Echo back the last user message as `"Echo: <text>"`
    #[default]
    Echo,
    /// Return a fixed response
    Fixed(String),
    /// Return response as specific chunks
    Chunks(Vec<String>),
    /// Fail after emitting `delay_chunks` chunks
    Error { message: String, delay_chunks: usize },
    /// Reply with no text: `generate` fails with an invalid response, a
    /// stream carries only its final chunk
    Empty,
}

/// Configuration for the mock provider
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Response mode
    pub mode: MockMode,
    /// Delay between chunks in milliseconds (0 = no delay)
    pub chunk_delay_ms: u64,
    /// Size of each chunk when splitting fixed/echo responses
    pub chunk_size: usize,
    /// Document returned by `generate_json`; when unset the response text is parsed
    pub json: Option<Value>,
    /// Number of leading `initialize` calls that fail
    pub failing_initializations: usize,
    /// Time spent inside `initialize`, in milliseconds
    pub initialize_delay_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            mode: MockMode::Echo,
            chunk_delay_ms: 0,
            chunk_size: 10,
            json: None,
            failing_initializations: 0,
            initialize_delay_ms: 0,
        }
    }
}

/// State bound by a successful `initialize`
#[derive(Debug, Clone)]
struct MockSession {
    credential: String,
    default_model: String,
}

/// Mock LLM provider for testing
pub struct MockProvider {
    id: ProviderId,
    config: MockConfig,
    logger: Arc<dyn Logger>,
    session: RwLock<Option<MockSession>>,
    initialize_calls: AtomicUsize,
    failures_left: AtomicUsize,
    capability_calls: AtomicUsize,
    credentials: Mutex<Vec<String>>,
}

impl MockProvider {
    /// Create a new mock provider with default config
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self::with_config(MockConfig::default(), logger)
    }

    /// Create with specific config
    pub fn with_config(config: MockConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            id: ProviderId::Mock,
            failures_left: AtomicUsize::new(config.failing_initializations),
            config,
            logger,
            session: RwLock::new(None),
            initialize_calls: AtomicUsize::new(0),
            capability_calls: AtomicUsize::new(0),
            credentials: Mutex::new(Vec::new()),
        }
    }

    /// Create an echo provider (echoes back user message)
    pub fn echo(logger: Arc<dyn Logger>) -> Self {
        Self::new(logger)
    }

    /// Create a fixed response provider
    pub fn fixed(response: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self::with_config(
            MockConfig {
                mode: MockMode::Fixed(response.into()),
                ..Default::default()
            },
            logger,
        )
    }

    /// Create a chunked response provider
    pub fn chunked(chunks: Vec<String>, delay_ms: u64, logger: Arc<dyn Logger>) -> Self {
        Self::with_config(
            MockConfig {
                mode: MockMode::Chunks(chunks),
                chunk_delay_ms: delay_ms,
                ..Default::default()
            },
            logger,
        )
    }

    /// Create a provider whose backend replies with no text
    pub fn empty(logger: Arc<dyn Logger>) -> Self {
        Self::with_config(
            MockConfig {
                mode: MockMode::Empty,
                ..Default::default()
            },
            logger,
        )
    }

    /// Create an error-producing provider
    pub fn error(message: impl Into<String>, delay_chunks: usize, logger: Arc<dyn Logger>) -> Self {
        Self::with_config(
            MockConfig {
                mode: MockMode::Error {
                    message: message.into(),
                    delay_chunks,
                },
                ..Default::default()
            },
            logger,
        )
    }

    /// Register under a different provider id
    pub fn with_id(mut self, id: ProviderId) -> Self {
        self.id = id;
        self
    }

    /// Set chunk delay
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.config.chunk_delay_ms = delay_ms;
        self
    }

    /// Set chunk size for splitting responses
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the document returned by `generate_json`
    pub fn with_json(mut self, value: Value) -> Self {
        self.config.json = Some(value);
        self
    }

    /// Make the first `times` calls to `initialize` fail
    pub fn failing_initialize(mut self, times: usize) -> Self {
        self.config.failing_initializations = times;
        self.failures_left = AtomicUsize::new(times);
        self
    }

    /// Spend `delay_ms` inside every `initialize` call
    pub fn with_initialize_delay(mut self, delay_ms: u64) -> Self {
        self.config.initialize_delay_ms = delay_ms;
        self
    }

    /// Number of times `initialize` has been called
    pub fn initialize_count(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
    }

    /// Credentials passed to `initialize`, in call order
    pub fn credentials(&self) -> Vec<String> {
        self.credentials.lock().clone()
    }

    /// Number of generate/stream/json invocations
    pub fn call_count(&self) -> usize {
        self.capability_calls.load(Ordering::SeqCst)
    }

    /// Credential bound by the last successful `initialize`
    pub fn active_credential(&self) -> Option<String> {
        self.session.read().as_ref().map(|s| s.credential.clone())
    }

    fn begin_call(&self) -> ProviderResult<MockSession> {
        self.capability_calls.fetch_add(1, Ordering::SeqCst);
        self.session
            .read()
            .clone()
            .ok_or_else(|| ProviderError::not_initialized(self.id.as_str()))
    }

    /// Full response text for the configured mode
    fn response_text(&self, request: &ProviderRequest) -> ProviderResult<String> {
        match &self.config.mode {
            MockMode::Echo => {
                let user_msg = last_user_text(&request.messages).unwrap_or("Hello from MockProvider!");
                Ok(format!("Echo: {}", user_msg))
            }
            MockMode::Fixed(response) => Ok(response.clone()),
            MockMode::Chunks(chunks) => Ok(chunks.concat()),
            MockMode::Empty => Err(ProviderError::invalid_response(self.id.as_str(), "empty response")),
            MockMode::Error { message, .. } => Err(ProviderError::Other(format!("Mock error: {}", message))),
        }
    }

    /// Split text into chunks
    fn split_into_chunks(&self, text: &str) -> Vec<String> {
        if self.config.chunk_size == 0 || text.is_empty() {
            return vec![text.to_string()];
        }

        text.chars()
            .collect::<Vec<_>>()
            .chunks(self.config.chunk_size)
            .map(|c| c.iter().collect())
            .collect()
    }

    fn usage_for(request: &ProviderRequest, completion: &str) -> Usage {
        Usage::new(request.estimated_prompt_tokens(), estimate_tokens(completion))
    }
}

#[async_trait]
impl ProviderStrategy for MockProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn initialize(&self, config: &ProviderConfig, credential: &str) -> ProviderResult<()> {
        let attempt = self.initialize_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.credentials.lock().push(credential.to_string());
        self.logger.debug(&format!("MockProvider({}): initialize attempt {}", self.id, attempt));

        if self.config.initialize_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.initialize_delay_ms)).await;
        }

        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(ProviderError::invalid_config(
                self.id.as_str(),
                format!("mock initialization failure on attempt {}", attempt),
            ));
        }

        if credential.is_empty() {
            return Err(ProviderError::missing_api_key(self.id.as_str()));
        }

        *self.session.write() = Some(MockSession {
            credential: credential.to_string(),
            default_model: config.default_model.clone(),
        });
        Ok(())
    }

    async fn generate(
        &self,
        request: &ProviderRequest,
        cancel_token: CancellationToken,
    ) -> ProviderResult<GenerateResponse> {
        let session = self.begin_call()?;
        if cancel_token.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        let text = self.response_text(request)?;
        self.logger.debug(&format!("MockProvider: generate -> {} chars", text.len()));

        let model = if request.model.is_empty() {
            session.default_model
        } else {
            request.model.clone()
        };
        let usage = Self::usage_for(request, &text);
        Ok(GenerateResponse::new(text, model, usage))
    }

    async fn stream_generate(
        &self,
        request: &ProviderRequest,
        cancel_token: CancellationToken,
    ) -> ProviderResult<StreamResponse> {
        self.begin_call()?;
        self.logger.debug("MockProvider: stream_generate called");

        let mut failure = None;
        let chunks: Vec<String> = match &self.config.mode {
            MockMode::Chunks(chunks) => chunks.clone(),
            MockMode::Empty => vec![],
            MockMode::Error { message, delay_chunks } => {
                failure = Some(format!("Mock error: {}", message));
                (0..*delay_chunks)
                    .map(|i| format!("Chunk {} before error. ", i))
                    .collect()
            }
            _ => {
                let text = self.response_text(request)?;
                self.split_into_chunks(&text)
            }
        };

        let usage = Self::usage_for(request, &chunks.concat());
        let delay_ms = self.config.chunk_delay_ms;
        let logger = Arc::clone(&self.logger);

        let body = stream::iter(chunks.into_iter().enumerate()).then(move |(i, chunk)| {
            let logger = Arc::clone(&logger);
            let cancel = cancel_token.clone();
            async move {
                if i > 0 && delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                if cancel.is_cancelled() {
                    return Err(ProviderError::Cancelled);
                }

                logger.debug(&format!("MockProvider: Yielding chunk {}: '{}'", i, chunk));
                Ok(StreamChunk::text(chunk))
            }
        });

        let tail = match failure {
            Some(message) => Err(ProviderError::Other(message)),
            None => Ok(StreamChunk::finished(FinishReason::Stop, Some(usage))),
        };

        Ok(Box::pin(body.chain(stream::once(async move { tail }))))
    }

    async fn generate_json(
        &self,
        request: &ProviderRequest,
        _schema: &JsonSchema,
        cancel_token: CancellationToken,
    ) -> ProviderResult<Value> {
        self.begin_call()?;
        if cancel_token.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        if let Some(value) = &self.config.json {
            return Ok(value.clone());
        }

        let text = self.response_text(request)?;
        serde_json::from_str(&text).map_err(|e| {
            ProviderError::invalid_response(self.id.as_str(), format!("response is not valid JSON: {}", e))
        })
    }

    fn list_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo::new("mock-echo", 128_000).with_json(),
            ModelInfo::new("mock-fixed", 128_000).with_json(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::types::ChatMessage;
    use futures::StreamExt;
    use serde_json::json;

    fn test_logger() -> Arc<dyn Logger> {
        Arc::new(NoOpLogger::new())
    }

    fn test_config() -> ProviderConfig {
        ProviderConfig::new(ProviderId::Mock, "k1", "mock-echo")
    }

    fn test_request(content: &str) -> ProviderRequest {
        ProviderRequest {
            model: "mock-echo".to_string(),
            messages: vec![ChatMessage::user(content)],
            system_instruction: None,
            temperature: None,
            max_output_tokens: None,
        }
    }

    async fn ready(provider: MockProvider) -> MockProvider {
        provider.initialize(&test_config(), "secret").await.unwrap();
        provider
    }

    async fn collect_text(mut stream: StreamResponse) -> (String, Vec<StreamChunk>) {
        let mut text = String::new();
        let mut finals = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.expect("chunk should succeed");
            if chunk.is_final {
                finals.push(chunk);
            } else {
                text.push_str(&chunk.content);
            }
        }
        (text, finals)
    }

    #[tokio::test]
    async fn test_capabilities_require_initialize() {
        let provider = MockProvider::echo(test_logger());
        let err = provider
            .generate(&test_request("hi"), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotInitialized { .. }));
    }

    #[tokio::test]
    async fn test_echo_generate() {
        let provider = ready(MockProvider::echo(test_logger())).await;
        let resp = provider
            .generate(&test_request("Hello, world!"), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(resp.content, "Echo: Hello, world!");
        assert_eq!(resp.model, "mock-echo");
        assert_eq!(resp.usage.total_tokens, resp.usage.prompt_tokens + resp.usage.completion_tokens);
        assert_eq!(provider.credentials(), vec!["secret".to_string()]);
        assert_eq!(provider.active_credential().as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn test_fixed_stream() {
        let provider = ready(MockProvider::fixed("This is a test response.", test_logger())).await;
        let stream = provider
            .stream_generate(&test_request("Anything"), CancellationToken::new())
            .await
            .unwrap();

        let (text, finals) = collect_text(stream).await;
        assert_eq!(text, "This is a test response.");
        assert_eq!(finals.len(), 1);
        assert!(finals[0].metadata.as_ref().unwrap().usage.is_some());
    }

    #[tokio::test]
    async fn test_chunked_mode_preserves_order() {
        let chunks = vec!["First ".to_string(), "second ".to_string(), "third.".to_string()];
        let provider = ready(MockProvider::chunked(chunks.clone(), 0, test_logger())).await;
        let mut stream = provider
            .stream_generate(&test_request("Anything"), CancellationToken::new())
            .await
            .unwrap();

        let mut received = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            if !chunk.is_final {
                received.push(chunk.content);
            }
        }
        assert_eq!(received, chunks);
    }

    #[tokio::test]
    async fn test_error_mode_fails_after_chunks() {
        let provider = ready(MockProvider::error("Test error message", 2, test_logger())).await;
        let mut stream = provider
            .stream_generate(&test_request("Anything"), CancellationToken::new())
            .await
            .unwrap();

        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_cancellation_stops_stream() {
        let provider = ready(
            MockProvider::fixed("Long response that should be cancelled", test_logger()).with_delay(20),
        )
        .await;
        let cancel = CancellationToken::new();
        let mut stream = provider
            .stream_generate(&test_request("Anything"), cancel.clone())
            .await
            .unwrap();

        assert!(stream.next().await.unwrap().is_ok());
        cancel.cancel();
        assert!(matches!(stream.next().await, Some(Err(ProviderError::Cancelled))));
    }

    #[tokio::test]
    async fn test_failing_initialize_then_success() {
        let provider = MockProvider::echo(test_logger()).failing_initialize(1);
        assert!(provider.initialize(&test_config(), "secret").await.is_err());
        assert!(provider.initialize(&test_config(), "secret").await.is_ok());
        assert_eq!(provider.initialize_count(), 2);
    }

    #[tokio::test]
    async fn test_generate_json() {
        let provider = ready(MockProvider::echo(test_logger()).with_json(json!({"ok": true}))).await;
        let schema = JsonSchema::new(json!({"type": "object"}));
        let value = provider
            .generate_json(&test_request("x"), &schema, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(value, json!({"ok": true}));

        let provider = ready(MockProvider::fixed("not json", test_logger())).await;
        let err = provider
            .generate_json(&test_request("x"), &schema, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_empty_reply_is_invalid_response() {
        let provider = ready(MockProvider::empty(test_logger())).await;
        let err = provider
            .generate(&test_request("x"), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse { .. }));

        let stream = provider
            .stream_generate(&test_request("x"), CancellationToken::new())
            .await
            .unwrap();
        let (text, finals) = collect_text(stream).await;
        assert!(text.is_empty());
        assert_eq!(finals.len(), 1);
    }

    #[test]
    fn test_chunk_splitting() {
        let provider = MockProvider::new(test_logger()).with_chunk_size(5);
        let chunks = provider.split_into_chunks("Hello, world!");

        assert_eq!(chunks, vec!["Hello", ", wor", "ld!"]);
    }

    #[test]
    fn test_with_id() {
        let provider = MockProvider::new(test_logger()).with_id(ProviderId::Gemini);
        assert_eq!(provider.id(), ProviderId::Gemini);
        assert!(!provider.list_models().is_empty());
    }
}
