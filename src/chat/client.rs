//! OpenAI-compatible chat completion client
//!
//! One request per chat turn. There is no retry or backoff: a failed call
//! is reported to the caller as-is.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error};

use super::prompt::ChatMessage;
use crate::config::LlmConfig;
use crate::metrics::METRICS;

/// Chat completion errors
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("No valid API key provided")]
    MissingApiKey,

    #[error("Client initialization failed: {0}")]
    Initialization(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Upstream error: status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty response from model")]
    EmptyResponse,
}

impl LlmError {
    fn label(&self) -> &'static str {
        match self {
            Self::MissingApiKey => "missing_key",
            Self::Initialization(_) => "init",
            Self::Request(_) => "request",
            Self::Timeout(_) => "timeout",
            Self::Upstream { .. } => "upstream",
            Self::InvalidResponse(_) | Self::EmptyResponse => "invalid_response",
        }
    }
}

/// Anything that can turn a message list into a reply
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

/// Client for `POST {base_url}/v1/chat/completions`
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LlmError::Initialization(e.to_string()))?;

        let endpoint = format!(
            "{}/v1/chat/completions",
            config.base_url.trim_end_matches('/')
        );

        // Blank keys behave like absent ones
        let api_key = config
            .api_key
            .filter(|k| !k.expose_secret().trim().is_empty());

        Ok(Self {
            http,
            endpoint,
            model: config.model,
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn send(&self, api_key: &SecretString, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(
            "Calling chat completion: model={}, {} messages",
            self.model,
            messages.len()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(e.to_string())
                } else {
                    LlmError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body: upstream_message(&body),
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl ChatCompletion for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let api_key = match &self.api_key {
            Some(key) => key,
            None => {
                METRICS.record_llm_request("missing_key", Duration::ZERO);
                return Err(LlmError::MissingApiKey);
            }
        };

        let start = Instant::now();
        let result = self.send(api_key, messages).await;
        match &result {
            Ok(_) => METRICS.record_llm_request("success", start.elapsed()),
            Err(e) => {
                error!("Chat completion failed: {}", e);
                METRICS.record_llm_request(e.label(), start.elapsed());
            }
        }
        result
    }
}

/// Pull `error.message` out of an OpenAI error body, else keep the raw text
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<UpstreamErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string())
}

// OpenAI-compatible API types
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    error: UpstreamErrorDetail,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorDetail {
    message: String,
}
