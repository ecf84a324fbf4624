//! Client for OpenAI-compatible chat completion endpoints.
//!
//! Any service exposing the `chat/completions` wire format can be targeted
//! by pointing `base_url` at it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::chat::{ChatMessage, ChatProvider, GenerationParams};
use crate::error::SweepError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";

/// Configuration for the OpenAI-compatible client.
#[derive(Debug)]
pub struct OpenAiConfig {
    /// API key for bearer authentication.
    pub api_key: SecretString,
    /// Base URL of the service, ending in a slash.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_seconds: Option<u64>,
}

/// Client for OpenAI-compatible chat completion APIs.
///
/// The client uses `Arc` internally for configuration, making cloning cheap.
#[derive(Debug, Clone)]
pub struct OpenAiCompatible {
    /// Shared configuration wrapped in Arc for cheap cloning.
    config: Arc<OpenAiConfig>,
    /// HTTP client for making requests.
    client: Client,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatMsg,
}

#[derive(Deserialize, Debug)]
struct ChatMsg {
    content: String,
}

impl OpenAiCompatible {
    pub fn new(
        api_key: SecretString,
        base_url: Option<String>,
        timeout_seconds: Option<u64>,
    ) -> Result<Self, SweepError> {
        let mut builder = Client::builder();
        if let Some(sec) = timeout_seconds {
            builder = builder.timeout(Duration::from_secs(sec));
        }
        let client = builder
            .build()
            .map_err(|e| SweepError::Http(e.to_string()))?;
        Ok(Self::with_client(client, api_key, base_url, timeout_seconds))
    }

    /// Creates a new client with a custom HTTP client.
    pub fn with_client(
        client: Client,
        api_key: SecretString,
        base_url: Option<String>,
        timeout_seconds: Option<u64>,
    ) -> Self {
        let mut base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            config: Arc::new(OpenAiConfig {
                api_key,
                base_url,
                timeout_seconds,
            }),
            client,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}chat/completions", self.config.base_url)
    }

    fn map_status(status: StatusCode, body: String) -> SweepError {
        match status {
            StatusCode::TOO_MANY_REQUESTS => SweepError::RateLimited(body),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SweepError::Auth(body),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                SweepError::InvalidRequest(body)
            }
            s if s.is_server_error() => SweepError::Provider(format!("{s}: {body}")),
            s => SweepError::Http(format!("{s}: {body}")),
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatible {
    /// Sends a chat completion request.
    ///
    /// Non-success statuses are mapped onto the error taxonomy so the retry
    /// layer can distinguish transient failures from terminal ones.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, SweepError> {
        if self.config.api_key.expose_secret().is_empty() {
            return Err(SweepError::Auth("Missing API key".to_string()));
        }

        let wire_msgs: Vec<WireMessage> = messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect();

        let body = ChatCompletionRequest {
            model: &params.model,
            messages: wire_msgs,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            stream: false,
        };

        if log::log_enabled!(log::Level::Trace) {
            if let Ok(json) = serde_json::to_string(&body) {
                log::trace!("chat request payload: {json}");
            }
        }

        let mut request = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body);

        if let Some(timeout) = self.config.timeout_seconds {
            request = request.timeout(Duration::from_secs(timeout));
        }

        let resp = request.send().await?;
        let status = resp.status();
        log::debug!("chat completion HTTP status: {status}");

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::map_status(status, body));
        }

        let raw = resp.text().await?;
        let parsed: ChatCompletionResponse =
            serde_json::from_str(&raw).map_err(|e| SweepError::ResponseFormat {
                message: e.to_string(),
                raw_response: raw.clone(),
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(SweepError::ResponseFormat {
                message: "no choices in response".to_string(),
                raw_response: raw,
            })
    }
}
