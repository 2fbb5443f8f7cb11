//! OrchestrationService - the single entry point for generation
//!
//! Every call follows the same path: parse the provider id, check that the
//! provider is registered and configured, validate the request against the
//! configuration, obtain the initialized strategy from the registry, dispatch.

use std::sync::Arc;

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::logging::Logger;
use crate::providers::ProviderStrategy;
use crate::registry::ProviderRegistry;
use crate::types::{
    CancellationToken, CompiledSchema, GenerateRequest, GenerateResponse, ModelInfo, ProviderId,
    ProviderRequest,
};
use crate::{log_debug, log_info, log_warn};

use super::presets::{ChangeSummary, PaletteContrast, Preset, SecurityReport};
use super::stream::{terminated, ChunkStream, OpenedStream};

/// Which capability a dispatch needs from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Generate,
    Stream,
    Json,
}

impl Mode {
    fn as_str(&self) -> &'static str {
        match self {
            Mode::Generate => "generate",
            Mode::Stream => "stream",
            Mode::Json => "json",
        }
    }
}

/// A request that passed validation, bound to its strategy
struct Dispatch {
    provider: ProviderId,
    strategy: Arc<dyn ProviderStrategy>,
    request: ProviderRequest,
    model: Option<ModelInfo>,
}

/// Validates requests and routes them to provider strategies
///
/// Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct OrchestrationService {
    registry: Arc<ProviderRegistry>,
    logger: Arc<dyn Logger>,
}

impl OrchestrationService {
    pub fn new(registry: Arc<ProviderRegistry>, logger: Arc<dyn Logger>) -> Self {
        Self { registry, logger }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Generate a complete response
    pub async fn generate_content(
        &self,
        request: GenerateRequest,
        cancel: CancellationToken,
    ) -> OrchestratorResult<GenerateResponse> {
        let work = async {
            let dispatch = self.dispatch(&request, Mode::Generate).await?;
            let response = dispatch
                .strategy
                .generate(&dispatch.request, cancel.clone())
                .await
                .map_err(|e| OrchestratorError::from_provider(dispatch.provider, e))?;

            log_debug!(
                self.logger,
                "[Orchestration] {} generated {} tokens",
                dispatch.provider,
                response.usage.total_tokens
            );
            Ok(match &dispatch.model {
                Some(model) => GenerateResponse {
                    usage: response.usage.clone().priced_with(model),
                    ..response
                },
                None => response,
            })
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(OrchestratorError::Cancelled),
            res = work => res,
        }
    }

    /// Stream a response
    ///
    /// Nothing happens until the returned stream is polled. Every failure,
    /// including an invalid request, arrives as the stream's single final
    /// chunk with an error marker.
    pub fn stream_content(&self, request: GenerateRequest, cancel: CancellationToken) -> ChunkStream {
        let service = self.clone();
        let stream_cancel = cancel.clone();
        let open = async move {
            let dispatch = service.dispatch(&request, Mode::Stream).await?;
            let inner = dispatch
                .strategy
                .stream_generate(&dispatch.request, stream_cancel)
                .await
                .map_err(|e| OrchestratorError::from_provider(dispatch.provider, e))?;
            Ok(OpenedStream {
                provider: dispatch.provider,
                inner,
                pricing: dispatch.model,
            })
        }
        .boxed();

        terminated(open, cancel)
    }

    /// Generate output conforming to the request's JSON schema
    ///
    /// The schema is checked before any provider is contacted, and the
    /// returned value is validated against it before deserializing into `T`.
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        request: GenerateRequest,
        cancel: CancellationToken,
    ) -> OrchestratorResult<T> {
        let schema = request
            .json_schema
            .clone()
            .ok_or_else(|| OrchestratorError::invalid_request("generate_json requires a jsonSchema"))?;
        let validator = schema.compile().map_err(OrchestratorError::invalid_request)?;

        let work = async {
            let dispatch = self.dispatch(&request, Mode::Json).await?;
            let value = dispatch
                .strategy
                .generate_json(&dispatch.request, &schema, cancel.clone())
                .await
                .map_err(|e| OrchestratorError::from_provider(dispatch.provider, e))?;
            conform(dispatch.provider, &validator, value)
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(OrchestratorError::Cancelled),
            res = work => res,
        }
    }

    /// Run a preset against `input` on the named provider
    pub async fn run_preset<T: DeserializeOwned>(
        &self,
        preset: &Preset,
        provider_id: &str,
        input: impl Into<String>,
        cancel: CancellationToken,
    ) -> OrchestratorResult<T> {
        log_info!(self.logger, "[Orchestration] running preset '{}'", preset.name);
        self.generate_json(preset.request(provider_id, input), cancel).await
    }

    /// Summarize a diff or change description
    pub async fn summarize_changes(
        &self,
        provider_id: &str,
        changes: &str,
        cancel: CancellationToken,
    ) -> OrchestratorResult<ChangeSummary> {
        self.run_preset(&Preset::change_summary(), provider_id, changes, cancel)
            .await
    }

    /// Rate the contrast of a color palette
    pub async fn score_palette(
        &self,
        provider_id: &str,
        palette: &str,
        cancel: CancellationToken,
    ) -> OrchestratorResult<PaletteContrast> {
        self.run_preset(&Preset::palette_contrast(), provider_id, palette, cancel)
            .await
    }

    /// List security vulnerabilities found in a code excerpt
    pub async fn find_vulnerabilities(
        &self,
        provider_id: &str,
        code: &str,
        cancel: CancellationToken,
    ) -> OrchestratorResult<SecurityReport> {
        self.run_preset(&Preset::security_scan(), provider_id, code, cancel)
            .await
    }

    /// Resolve and validate everything a call needs before touching a backend
    async fn dispatch(&self, request: &GenerateRequest, mode: Mode) -> OrchestratorResult<Dispatch> {
        let provider = parse_provider(request)?;

        if !self.registry.is_registered(provider) {
            return Err(OrchestratorError::invalid_request_from(
                OrchestratorError::NotRegistered(provider),
            ));
        }
        let config = self.registry.config(provider).ok_or_else(|| {
            OrchestratorError::invalid_request_from(OrchestratorError::NotConfigured(provider))
        })?;

        let model_id = request
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| config.default_model.clone());
        if !config.models.is_empty() && config.model(&model_id).is_none() {
            return Err(OrchestratorError::invalid_request(format!(
                "model '{}' is not offered by provider '{}'",
                model_id, provider
            )));
        }

        let provider_request = request
            .to_provider_request(model_id.clone())
            .map_err(OrchestratorError::invalid_request)?;

        let model = self.registry.model_info(provider, &model_id);
        if let Some(info) = &model {
            check_capabilities(info, &provider_request, mode)?;
        } else {
            log_debug!(
                self.logger,
                "[Orchestration] no metadata for {}/{}, skipping capability checks",
                provider,
                model_id
            );
        }

        let strategy = self.registry.get(provider).await.map_err(|e| {
            log_warn!(self.logger, "[Orchestration] {} unavailable: {}", provider, e);
            e
        })?;

        log_debug!(
            self.logger,
            "[Orchestration] dispatching {} to {}/{}",
            mode.as_str(),
            provider,
            model_id
        );
        Ok(Dispatch {
            provider,
            strategy,
            request: provider_request,
            model,
        })
    }
}

impl std::fmt::Debug for OrchestrationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestrationService")
            .field("registry", &self.registry)
            .finish()
    }
}

fn parse_provider(request: &GenerateRequest) -> OrchestratorResult<ProviderId> {
    let raw = request
        .provider_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| OrchestratorError::invalid_request("request has no providerId"))?;
    raw.parse()
        .map_err(|e: crate::types::UnknownProviderId| OrchestratorError::invalid_request(e.to_string()))
}

fn check_capabilities(info: &ModelInfo, request: &ProviderRequest, mode: Mode) -> OrchestratorResult<()> {
    match mode {
        Mode::Stream if !info.supports_streaming => {
            return Err(OrchestratorError::invalid_request(format!(
                "model '{}' does not support streaming",
                info.id
            )))
        }
        Mode::Json if !info.supports_json => {
            return Err(OrchestratorError::invalid_request(format!(
                "model '{}' does not support JSON output",
                info.id
            )))
        }
        _ => {}
    }

    let needed = request
        .estimated_prompt_tokens()
        .saturating_add(request.max_output_tokens.unwrap_or(0));
    if needed > info.context_window {
        return Err(OrchestratorError::invalid_request(format!(
            "request needs about {} tokens but model '{}' has a context window of {}",
            needed, info.id, info.context_window
        )));
    }
    Ok(())
}

fn conform<T: DeserializeOwned>(
    provider: ProviderId,
    validator: &CompiledSchema,
    value: Value,
) -> OrchestratorResult<T> {
    validator.validate(&value).map_err(|e| {
        OrchestratorError::backend_response(provider, format!("output does not match schema: {}", e))
    })?;
    serde_json::from_value(value).map_err(|e| {
        OrchestratorError::backend_response(provider, format!("output does not fit the expected type: {}", e))
    })
}
