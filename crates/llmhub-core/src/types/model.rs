//! Provider identity, provider configuration and model metadata

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifies a generation backend
///
/// The set is closed: every backend the crate can talk to has a variant here,
/// and every registry map is keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Gemini,
    OpenAi,
    Anthropic,
    Ollama,
    Mock,
}

impl ProviderId {
    /// All known provider ids
    pub const ALL: [ProviderId; 5] = [
        ProviderId::Gemini,
        ProviderId::OpenAi,
        ProviderId::Anthropic,
        ProviderId::Ollama,
        ProviderId::Mock,
    ];

    /// Lowercase token used in configuration and requests
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Gemini => "gemini",
            ProviderId::OpenAi => "openai",
            ProviderId::Anthropic => "anthropic",
            ProviderId::Ollama => "ollama",
            ProviderId::Mock => "mock",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known provider
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider id: '{0}'")]
pub struct UnknownProviderId(pub String);

impl FromStr for ProviderId {
    type Err = UnknownProviderId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderId::Gemini),
            "openai" => Ok(ProviderId::OpenAi),
            "anthropic" => Ok(ProviderId::Anthropic),
            "ollama" => Ok(ProviderId::Ollama),
            "mock" => Ok(ProviderId::Mock),
            _ => Err(UnknownProviderId(s.to_string())),
        }
    }
}

/// Capability and pricing metadata for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier as used by the provider's API
    pub id: String,
    /// Maximum context length in tokens
    pub context_window: u32,
    /// USD per million prompt tokens
    #[serde(default)]
    pub input_cost_per_mtok: f64,
    /// USD per million completion tokens
    #[serde(default)]
    pub output_cost_per_mtok: f64,
    #[serde(default = "default_true")]
    pub supports_streaming: bool,
    #[serde(default)]
    pub supports_json: bool,
    #[serde(default)]
    pub supports_vision: bool,
}

fn default_true() -> bool {
    true
}

impl ModelInfo {
    /// Create model metadata with streaming enabled and no pricing
    pub fn new(id: impl Into<String>, context_window: u32) -> Self {
        Self {
            id: id.into(),
            context_window,
            input_cost_per_mtok: 0.0,
            output_cost_per_mtok: 0.0,
            supports_streaming: true,
            supports_json: false,
            supports_vision: false,
        }
    }

    /// Set per-million-token prices
    pub fn with_pricing(mut self, input_per_mtok: f64, output_per_mtok: f64) -> Self {
        self.input_cost_per_mtok = input_per_mtok;
        self.output_cost_per_mtok = output_per_mtok;
        self
    }

    /// Enable JSON mode
    pub fn with_json(mut self) -> Self {
        self.supports_json = true;
        self
    }

    /// Enable image input
    pub fn with_vision(mut self) -> Self {
        self.supports_vision = true;
        self
    }

    /// Disable streaming
    pub fn without_streaming(mut self) -> Self {
        self.supports_streaming = false;
        self
    }

    /// Cost in USD for the given token counts
    pub fn cost_for(&self, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        (prompt_tokens as f64 * self.input_cost_per_mtok
            + completion_tokens as f64 * self.output_cost_per_mtok)
            / 1_000_000.0
    }
}

/// Configuration binding a provider to its credential and models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Which provider this configures
    pub id: ProviderId,
    /// Identifier handed to the secret resolver
    pub secret_ref: String,
    /// Custom API base URL (optional, uses provider default if not set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model used when a request does not name one
    pub default_model: String,
    /// Models exposed by this provider. Empty means "not restricted".
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

impl ProviderConfig {
    /// Create a new provider configuration
    pub fn new(id: ProviderId, secret_ref: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            id,
            secret_ref: secret_ref.into(),
            base_url: None,
            default_model: default_model.into(),
            models: vec![],
        }
    }

    /// Set the models exposed by this provider
    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models = models;
        self
    }

    /// Set the API base URL
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = Some(base.into());
        self
    }

    /// Look up a configured model by id
    pub fn model(&self, id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Check the configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.secret_ref.trim().is_empty() {
            return Err(format!("{}: secret_ref must not be empty", self.id));
        }
        if self.default_model.trim().is_empty() {
            return Err(format!("{}: default_model must not be empty", self.id));
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if !seen.insert(model.id.as_str()) {
                return Err(format!("{}: duplicate model '{}'", self.id, model.id));
            }
        }

        if !self.models.is_empty() && self.model(&self.default_model).is_none() {
            return Err(format!(
                "{}: default_model '{}' is not listed in models",
                self.id, self.default_model
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_parse() {
        assert_eq!("gemini".parse::<ProviderId>(), Ok(ProviderId::Gemini));
        assert_eq!("OpenAI".parse::<ProviderId>(), Ok(ProviderId::OpenAi));
        assert_eq!(" mock ".parse::<ProviderId>(), Ok(ProviderId::Mock));
        assert!("unregistered-id".parse::<ProviderId>().is_err());
    }

    #[test]
    fn test_provider_id_round_trips_display() {
        for id in ProviderId::ALL {
            assert_eq!(id.to_string().parse::<ProviderId>(), Ok(id));
        }
    }

    #[test]
    fn test_cost_for() {
        let model = ModelInfo::new("m", 1000).with_pricing(3.0, 15.0);
        let cost = model.cost_for(1_000_000, 100_000);
        assert!((cost - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_validate_default_model_must_be_listed() {
        let config = ProviderConfig::new(ProviderId::Mock, "k1", "missing")
            .with_models(vec![ModelInfo::new("mock-echo", 8192)]);
        assert!(config.validate().unwrap_err().contains("default_model"));

        let config = ProviderConfig::new(ProviderId::Mock, "k1", "mock-echo")
            .with_models(vec![ModelInfo::new("mock-echo", 8192)]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_secret_ref_and_duplicates() {
        let config = ProviderConfig::new(ProviderId::Mock, " ", "m");
        assert!(config.validate().is_err());

        let config = ProviderConfig::new(ProviderId::Mock, "k", "m")
            .with_models(vec![ModelInfo::new("m", 1), ModelInfo::new("m", 2)]);
        assert!(config.validate().unwrap_err().contains("duplicate"));
    }

    #[test]
    fn test_provider_config_yaml() {
        let yaml = r#"
id: gemini
secret_ref: gemini_api_key
default_model: gemini-2.0-flash
models:
  - id: gemini-2.0-flash
    context_window: 1048576
    input_cost_per_mtok: 0.1
    output_cost_per_mtok: 0.4
    supports_json: true
"#;
        let config: ProviderConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.id, ProviderId::Gemini);
        assert!(config.models[0].supports_streaming);
        assert!(config.models[0].supports_json);
        assert!(!config.models[0].supports_vision);
    }
}
