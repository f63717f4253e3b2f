/*!
 * One model call per chunk.
 *
 * The step sends a chunk and the current context digest to the model and
 * returns the trimmed translation. It never retries; that is the sequencer's
 * decision.
 */

use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::Config;
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::{CompletionRequest, Provider};
use crate::translation::prompts::{PromptTemplate, TranslationPromptBuilder};

/// Translation of a single chunk with the provider's token accounting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutput {
    /// Trimmed translation
    pub text: String,
    /// Prompt tokens reported by the provider
    pub prompt_tokens: Option<u64>,
    /// Completion tokens reported by the provider
    pub completion_tokens: Option<u64>,
}

/// Translates one chunk given the digest of the previous translation.
#[async_trait]
pub trait ChunkTranslator: Send + Sync {
    async fn translate_chunk(&self, chunk: &str, context: &str) -> Result<StepOutput, ProviderError>;
}

/// Chunk translator backed by a chat-completion provider.
#[derive(Debug)]
pub struct ModelTranslator<P: Provider + ?Sized> {
    provider: Arc<P>,
    system_prompt: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl<P: Provider + ?Sized> ModelTranslator<P> {
    /// Create a translator with an already rendered system prompt.
    pub fn new(provider: Arc<P>, system_prompt: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.into(),
            temperature: 0.3,
            max_tokens: 4096,
            timeout,
        }
    }

    /// Create a translator from the application configuration.
    pub fn from_config(provider: Arc<P>, config: &Config) -> Self {
        let source = language_utils::prompt_language_name(&config.source_language);
        let target = language_utils::prompt_language_name(&config.target_language)
            .unwrap_or_else(|| config.target_language.clone());
        let system_prompt = PromptTemplate::new(&config.translation.system_prompt)
            .render(source.as_deref(), &target);

        Self::new(provider, system_prompt, config.translation.request_timeout())
            .with_temperature(config.translation.temperature)
            .with_max_tokens(config.translation.max_tokens)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Rendered system instruction sent with every chunk
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

#[async_trait]
impl<P: Provider + ?Sized> ChunkTranslator for ModelTranslator<P> {
    async fn translate_chunk(&self, chunk: &str, context: &str) -> Result<StepOutput, ProviderError> {
        if chunk.trim().is_empty() {
            return Ok(StepOutput::default());
        }

        let payload = TranslationPromptBuilder::new(chunk).with_context(context).build();
        let request = CompletionRequest::new(self.system_prompt.as_str(), payload)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);

        debug!(
            "Sending {} bytes to {} (context: {} chars)",
            chunk.len(),
            self.provider.name(),
            context.chars().count()
        );

        let response = tokio::time::timeout(self.timeout, self.provider.complete(request))
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))??;

        let text = response.text.trim();
        if text.is_empty() {
            return Err(ProviderError::ParseError(
                "Model returned an empty translation".to_string(),
            ));
        }

        Ok(StepOutput {
            text: text.to_string(),
            prompt_tokens: response.prompt_tokens,
            completion_tokens: response.completion_tokens,
        })
    }
}
