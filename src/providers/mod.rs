/*!
 * Provider implementations for the model calls of the translation step.
 *
 * This module contains client implementations for LLM providers:
 * - OpenAI: OpenAI chat-completions API, also used for DeepSeek and LM Studio
 * - Mock: deterministic provider for tests and dry runs
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// A single system + user exchange sent to a model
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Fixed instruction for the model
    pub system: String,
    /// Per-call payload
    pub user: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Create a request with the default sampling settings
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.3,
            max_tokens: 4096,
        }
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the completion token limit
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Text produced by a model together with its token accounting
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    /// Generated text, untrimmed
    pub text: String,
    /// Prompt tokens reported by the provider
    pub prompt_tokens: Option<u64>,
    /// Completion tokens reported by the provider
    pub completion_tokens: Option<u64>,
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the translation step.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<CompletionResponse, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Test the connection to the provider
    ///
    /// # Returns
    /// * `Result<(), ProviderError>` - Ok if the connection is successful, or an error
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Human-readable provider name for logs
    fn name(&self) -> &str;
}

pub mod mock;
pub mod openai;
