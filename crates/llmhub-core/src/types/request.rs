//! Provider-agnostic generation requests

use serde::{Deserialize, Serialize};

use super::message::ChatMessage;
use super::schema::JsonSchema;

/// Rough characters-per-token ratio used for context window checks
const CHARS_PER_TOKEN: usize = 4;

/// Approximate token count for a piece of text
pub fn estimate_tokens(text: &str) -> u32 {
    text.chars().count().div_ceil(CHARS_PER_TOKEN) as u32
}

/// A generation request as received from a caller
///
/// `provider_id` is kept as the caller's raw token and parsed at the
/// orchestration boundary, so an unknown id can be reported as a bad request.
/// Exactly one of `prompt` or `messages` must be supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Presence selects structured-output mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<JsonSchema>,
}

impl GenerateRequest {
    /// Single-prompt request
    pub fn prompt(provider_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            provider_id: Some(provider_id.into()),
            prompt: Some(prompt.into()),
            ..Default::default()
        }
    }

    /// Multi-turn request
    pub fn chat(provider_id: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            provider_id: Some(provider_id.into()),
            messages,
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    pub fn with_json_schema(mut self, schema: impl Into<JsonSchema>) -> Self {
        self.json_schema = Some(schema.into());
        self
    }

    /// Validate the request shape and bind it to a concrete model
    ///
    /// Returns a human-readable reason on failure; the caller decides which
    /// error kind it becomes.
    pub fn to_provider_request(&self, model: impl Into<String>) -> Result<ProviderRequest, String> {
        let prompt = self.prompt.as_deref().filter(|p| !p.trim().is_empty());
        let messages = match (prompt, self.messages.is_empty()) {
            (Some(_), false) => {
                return Err("request must carry either 'prompt' or 'messages', not both".into())
            }
            (None, true) => return Err("request must carry a non-empty 'prompt' or 'messages'".into()),
            (Some(p), true) => vec![ChatMessage::user(p)],
            (None, false) => {
                if self.messages.iter().all(ChatMessage::is_blank) {
                    return Err("request messages are all empty".into());
                }
                self.messages.clone()
            }
        };

        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(format!("temperature {} is outside 0.0..=2.0", t));
            }
        }
        if self.max_output_tokens == Some(0) {
            return Err("maxOutputTokens must be positive".into());
        }

        Ok(ProviderRequest {
            model: model.into(),
            messages,
            system_instruction: self
                .system_instruction
                .clone()
                .filter(|s| !s.trim().is_empty()),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        })
    }
}

/// A validated request bound to one model, as handed to a provider strategy
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub system_instruction: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl ProviderRequest {
    /// Approximate prompt size including the system instruction
    pub fn estimated_prompt_tokens(&self) -> u32 {
        let system = self
            .system_instruction
            .as_deref()
            .map(estimate_tokens)
            .unwrap_or(0);
        self.messages
            .iter()
            .map(|m| estimate_tokens(&m.content))
            .sum::<u32>()
            + system
    }
}
