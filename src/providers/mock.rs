/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock provider that simulates different behaviors:
 * - `MockProvider::working()` - Always succeeds with a tagged echo of the chunk
 * - `MockProvider::intermittent(n)` - Fails every n-th request
 * - `MockProvider::fail_on_request(n)` - Fails only the n-th request
 * - `MockProvider::failing()` - Always fails with a server error
 * - `MockProvider::unauthorized()` - Always fails with an authentication error
 *
 * Every request is recorded so tests can inspect the prompts that were sent.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};
use crate::translation::prompts::source_text_of;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Fails the Nth request (1-based) and succeeds otherwise
    FailOnRequest { request: usize },
    /// Always fails with a server error
    Failing,
    /// Always fails with an authentication error
    Unauthorized,
    /// Returns empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every request received, in order
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    /// Custom response generator (optional), receives the chunk text
    custom_response: Option<fn(&str) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a mock that fails only the given request (1-based)
    pub fn fail_on_request(request: usize) -> Self {
        Self::new(MockBehavior::FailOnRequest { request })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that rejects every request as unauthorized
    pub fn unauthorized() -> Self {
        Self::new(MockBehavior::Unauthorized)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that answers after `delay_ms`
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copy of every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    fn respond(&self, request: &CompletionRequest) -> CompletionResponse {
        let source = source_text_of(&request.user);
        let text = match self.custom_response {
            Some(generator) => generator(source),
            None => format!("[TRANSLATED] {}", source),
        };

        CompletionResponse {
            prompt_tokens: Some((request.system.len() + request.user.len()) as u64 / 4),
            completion_tokens: Some(text.len() as u64 / 4),
            text,
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            requests: Arc::clone(&self.requests),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        match self.behavior {
            MockBehavior::Working => Ok(self.respond(&request)),

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.respond(&request))
                }
            }

            MockBehavior::FailOnRequest { request: failing } => {
                if count + 1 == failing {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated failure on request #{}", failing),
                        status_code: 500,
                    })
                } else {
                    Ok(self.respond(&request))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Unauthorized => Err(ProviderError::AuthenticationError(
                "Simulated invalid API key".to_string(),
            )),

            MockBehavior::Empty => Ok(CompletionResponse {
                text: String::new(),
                prompt_tokens: Some(0),
                completion_tokens: Some(0),
            }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.respond(&request))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError(
                "Simulated connection failure".to_string(),
            )),
            MockBehavior::Unauthorized => Err(ProviderError::AuthenticationError(
                "Simulated invalid API key".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
