//! Provider trait: the model gateway abstraction.
//!
//! A Provider knows how to send an assembled message sequence to a
//! chat-completion API and get one complete assistant message back.
//! There is exactly one upstream call per `complete()`; providers never retry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::{ChatMessage, ChatResponse};

/// A single chat-completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g. "gpt-3.5-turbo")
    pub model: String,

    /// The assembled messages, system prompt first
    pub messages: Vec<ChatMessage>,

    /// Temperature (0.0 = deterministic, 2.0 = very creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated assistant message
    pub message: ChatMessage,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

impl ProviderResponse {
    /// Normalize into the relay's outbound shape, keeping model and usage
    /// as opaque metadata.
    pub fn into_chat_response(self) -> ChatResponse {
        let mut meta = serde_json::Map::new();
        if !self.model.is_empty() {
            meta.insert("model".into(), serde_json::Value::String(self.model));
        }
        if let Some(usage) = self.usage {
            meta.insert("usage".into(), serde_json::json!(usage));
        }

        let mut response = ChatResponse::assistant(self.message.content);
        if !meta.is_empty() {
            response.raw_meta = Some(meta);
        }
        response
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The chat handler calls `complete()` without knowing which backend is
/// behind it; tests plug in stubs.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g. "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}
