//! Single-shot generation responses

use serde::{Deserialize, Serialize};

use super::model::ModelInfo;

/// Why the backend stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Error,
    Cancelled,
    Other,
}

impl FinishReason {
    /// Map a backend's free-form stop reason onto the shared set
    pub fn from_backend(reason: &str) -> Self {
        match reason.to_lowercase().as_str() {
            "stop" | "end_turn" | "stop_sequence" | "finish_reason_stop" => FinishReason::Stop,
            "length" | "max_tokens" => FinishReason::Length,
            "content_filter" | "safety" => FinishReason::ContentFilter,
            _ => FinishReason::Other,
        }
    }
}

/// Token accounting for one call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    /// USD cost, when pricing for the model is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            cost: None,
        }
    }

    /// Fill `cost` from model pricing unless the backend already set it
    pub fn priced_with(mut self, model: &ModelInfo) -> Self {
        if self.cost.is_none() {
            self.cost = Some(model.cost_for(self.prompt_tokens, self.completion_tokens));
        }
        self
    }
}

/// Normalized result of a single-shot generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub content: String,
    pub usage: Usage,
    /// Model that actually served the request
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

impl GenerateResponse {
    pub fn new(content: impl Into<String>, model: impl Into<String>, usage: Usage) -> Self {
        Self {
            content: content.into(),
            usage,
            model: model.into(),
            finish_reason: Some(FinishReason::Stop),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_totals() {
        let usage = Usage::new(10, 5);
        assert_eq!(usage.total_tokens, 15);
        assert!(usage.cost.is_none());
    }

    #[test]
    fn test_priced_with_keeps_backend_cost() {
        let model = ModelInfo::new("m", 100).with_pricing(1.0, 1.0);
        let mut usage = Usage::new(1_000_000, 0);
        usage.cost = Some(0.5);
        assert_eq!(usage.priced_with(&model).cost, Some(0.5));

        let priced = Usage::new(1_000_000, 1_000_000).priced_with(&model);
        assert_eq!(priced.cost, Some(2.0));
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(FinishReason::from_backend("end_turn"), FinishReason::Stop);
        assert_eq!(FinishReason::from_backend("MAX_TOKENS"), FinishReason::Length);
        assert_eq!(FinishReason::from_backend("weird"), FinishReason::Other);
    }

    #[test]
    fn test_response_serialization() {
        let resp = GenerateResponse::new("hi", "mock-echo", Usage::new(1, 1));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"finishReason\":\"stop\""));
        assert!(json.contains("\"promptTokens\":1"));
    }
}
