//! Chat-completion client used by the classify and tag stages
//!
//! The pipeline only depends on [`CompletionService`]; [`OpenAiClient`] is
//! the production implementation against an OpenAI-compatible
//! `/chat/completions` endpoint. Failures come back as [`LlmError`], whose
//! [`LlmError::is_transient`] decides whether the annotation engine retries.

use async_trait::async_trait;
use hwlit_common::config::Credentials;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("hwlit-curator/", env!("CARGO_PKG_VERSION"));

/// LLM client errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Completion contained no text")]
    EmptyCompletion,
}

impl LlmError {
    /// Retryable service-side condition (network, 429, 5xx)
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::NetworkError(_) | LlmError::RateLimited => true,
            LlmError::ApiError(status, _) => *status >= 500,
            LlmError::ParseError(_) | LlmError::EmptyCompletion => false,
        }
    }
}

/// One prompt round-trip
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    /// 0.0 for deterministic decoding
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Prompt in, short text completion out
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// OpenAI chat-completions client
pub struct OpenAiClient {
    http_client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl OpenAiClient {
    pub fn new(credentials: Credentials, base_url: impl Into<String>) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &request.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
        };

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(model = %request.model, max_tokens = request.max_tokens, "Calling chat completions");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.credentials.api_key())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status.as_u16() == 429 {
            return Err(LlmError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError(status.as_u16(), error_text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(LlmError::EmptyCompletion)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
