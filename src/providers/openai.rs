use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};

/// Client for OpenAI-compatible chat-completions APIs
/// (OpenAI, DeepSeek, LM Studio)
#[derive(Debug)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Base URL, e.g. `https://api.deepseek.com`
    endpoint: String,
    /// Model used for every request
    model: String,
    /// Request timeout configured on `client`
    timeout: Duration,
}

/// OpenAI chat message format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    #[serde(default)]
    pub content: String,
}

/// OpenAI chat-completions request
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<OpenAIMessage>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,

    /// Responses are always requested in one piece
    stream: bool,
}

impl OpenAIRequest {
    /// Create a new request for `model`
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
            stream: false,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(OpenAIMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of generated tokens
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    /// Number of prompt tokens
    pub prompt_tokens: u32,
    /// Number of completion tokens
    pub completion_tokens: u32,
}

/// A single completion choice
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    /// Generated message
    pub message: OpenAIMessage,
    /// Why generation stopped, e.g. "stop" or "length"
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// OpenAI chat-completions response
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    /// Completion choices, the first one is used
    pub choices: Vec<OpenAIChoice>,
    /// Token usage information
    #[serde(default)]
    pub usage: Option<OpenAIUsage>,
}

impl OpenAI {
    /// Create a new client with a request timeout
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            timeout,
        }
    }

    /// Create a client from the translation settings
    pub fn from_config(config: &crate::app_config::TranslationConfig) -> Self {
        Self::new(
            config.get_api_key(),
            config.get_endpoint(),
            config.get_model(),
            config.request_timeout(),
        )
    }

    /// Model this client sends requests to
    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }

    /// Send a raw chat-completions request
    pub async fn send(&self, request: &OpenAIRequest) -> Result<OpenAIResponse, ProviderError> {
        let url = self.completions_url();
        debug!("POST {} (model {})", url, self.model);

        let mut builder = self.client.post(&url).json(request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout)
            } else if e.is_connect() {
                ProviderError::ConnectionError(format!("{}: {}", url, e))
            } else {
                ProviderError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("OpenAI-compatible API error ({}): {}", status, error_text);
            return Err(Self::map_status_error(status, error_text));
        }

        response
            .json::<OpenAIResponse>()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout)
                } else {
                    ProviderError::ParseError(e.to_string())
                }
            })
    }

    fn map_status_error(status: StatusCode, message: String) -> ProviderError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::AuthenticationError(message)
            }
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(message),
            _ => ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            },
        }
    }

    /// Extract text from an OpenAI response
    pub fn extract_text(response: &OpenAIResponse) -> Result<String, ProviderError> {
        response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| ProviderError::ParseError("response contained no choices".to_string()))
    }
}

#[async_trait]
impl Provider for OpenAI {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let api_request = OpenAIRequest::new(&self.model)
            .add_message("system", request.system)
            .add_message("user", request.user)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens);

        let response = self.send(&api_request).await?;
        let text = Self::extract_text(&response)?;

        let (prompt_tokens, completion_tokens) = match response.usage.as_ref() {
            Some(usage) => (
                Some(usage.prompt_tokens as u64),
                Some(usage.completion_tokens as u64),
            ),
            None => (None, None),
        };

        Ok(CompletionResponse {
            text,
            prompt_tokens,
            completion_tokens,
        })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = OpenAIRequest::new(&self.model)
            .add_message("user", "Hello")
            .max_tokens(10);

        self.send(&request).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}
