use std::sync::Arc;
use std::time::Instant;

use crate::chat::{ChatMessage, ChatProvider, GenerationParams};

use super::EvaluationRequest;

/// Outcome of one generation call.
///
/// A failed call degrades to empty text plus an error marker instead of
/// aborting the sweep; the marker ends up in the exported row.
#[derive(Debug, Clone)]
pub struct GeneratedResponse {
    pub text: String,
    pub latency_ms: u128,
    pub error: Option<String>,
}

impl GeneratedResponse {
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Issues one chat request per evaluation request.
pub struct Generator {
    provider: Arc<dyn ChatProvider>,
    system_prompt: String,
}

impl Generator {
    pub fn new(provider: Arc<dyn ChatProvider>, system_prompt: impl Into<String>) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.into(),
        }
    }

    /// Sends the fixed system instruction plus the prompt as the user message
    /// and returns the trimmed completion text with wall-clock latency.
    pub async fn generate(&self, request: &EvaluationRequest) -> GeneratedResponse {
        let messages = [
            ChatMessage::system().content(&self.system_prompt).build(),
            ChatMessage::user().content(&request.prompt).build(),
        ];
        let params = GenerationParams::new(
            request.model.clone(),
            request.temperature,
            request.max_tokens,
        );

        let start = Instant::now();
        match self.provider.chat(&messages, &params).await {
            Ok(text) => GeneratedResponse {
                text: text.trim().to_string(),
                latency_ms: start.elapsed().as_millis(),
                error: None,
            },
            Err(err) => {
                log::warn!("generation failed for request {}: {err}", request.index);
                GeneratedResponse {
                    text: String::new(),
                    latency_ms: start.elapsed().as_millis(),
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::SweepError;

    struct EchoProvider;

    #[async_trait]
    impl ChatProvider for EchoProvider {
        async fn chat(
            &self,
            messages: &[ChatMessage],
            params: &GenerationParams,
        ) -> Result<String, SweepError> {
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[0].role, crate::chat::ChatRole::System);
            Ok(format!("  {}@{} \n", messages[1].content, params.model))
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl ChatProvider for FailingProvider {
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _params: &GenerationParams,
        ) -> Result<String, SweepError> {
            Err(SweepError::RetryExceeded {
                attempts: 3,
                last_error: "Rate limited: 429".to_string(),
            })
        }
    }

    fn request() -> EvaluationRequest {
        EvaluationRequest {
            index: 0,
            prompt: "hello".to_string(),
            model: "m1".to_string(),
            temperature: 0.3,
            max_tokens: 64,
        }
    }

    #[tokio::test]
    async fn trims_completion_text() {
        let generator = Generator::new(Arc::new(EchoProvider), "sys");
        let response = generator.generate(&request()).await;
        assert_eq!(response.text, "hello@m1");
        assert!(!response.is_degraded());
    }

    #[tokio::test]
    async fn failure_degrades_instead_of_propagating() {
        let generator = Generator::new(Arc::new(FailingProvider), "sys");
        let response = generator.generate(&request()).await;
        assert!(response.text.is_empty());
        let marker = response.error.expect("error marker");
        assert!(marker.contains("Retry attempts exceeded"));
    }
}
