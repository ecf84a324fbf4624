use async_trait::async_trait;

use crate::error::SweepError;

use super::message::ChatMessage;

/// Sampling parameters for a single chat request.
///
/// Unlike a fixed per-client configuration, these travel with every call:
/// a sweep varies model, temperature and token budget per request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Model identifier understood by the backend
    pub model: String,
    /// Sampling temperature, 0.0 to 2.0
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl GenerationParams {
    pub fn new(model: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_tokens,
        }
    }
}

/// Trait for backends that support chat-style completion.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Sends the ordered messages and returns the completion text.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, SweepError>;
}
