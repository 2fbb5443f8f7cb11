//! Streaming response types

use serde::{Deserialize, Serialize};

use super::response::{FinishReason, Usage};

/// Error marker carried by a terminal chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamError {
    /// Stable error kind, e.g. `"backend"`, `"invalid_request"`, `"cancelled"`
    pub kind: String,
    pub message: String,
}

/// Extra information attached to a chunk, normally only the final one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StreamError>,
}

/// One increment of a streamed generation
///
/// A well-formed stream contains exactly one chunk with `is_final: true`, and
/// it is the last one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamChunk {
    pub content: String,
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChunkMetadata>,
}

impl StreamChunk {
    /// Create an intermediate text chunk
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_final: false,
            metadata: None,
        }
    }

    /// Create a successful terminal chunk
    pub fn finished(finish_reason: FinishReason, usage: Option<Usage>) -> Self {
        Self {
            content: String::new(),
            is_final: true,
            metadata: Some(ChunkMetadata {
                finish_reason: Some(finish_reason),
                usage,
                error: None,
            }),
        }
    }

    /// Create a terminal chunk carrying an error marker
    pub fn failed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        let kind = kind.into();
        let finish_reason = if kind == "cancelled" {
            FinishReason::Cancelled
        } else {
            FinishReason::Error
        };
        Self {
            content: String::new(),
            is_final: true,
            metadata: Some(ChunkMetadata {
                finish_reason: Some(finish_reason),
                usage: None,
                error: Some(StreamError {
                    kind,
                    message: message.into(),
                }),
            }),
        }
    }

    /// The error marker, if this chunk carries one
    pub fn error(&self) -> Option<&StreamError> {
        self.metadata.as_ref().and_then(|m| m.error.as_ref())
    }

    pub fn is_error(&self) -> bool {
        self.error().is_some()
    }
}
