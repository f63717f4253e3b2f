/*!
 * Tests for provider implementations
 */

use std::time::Duration;

use doctrans::app_config::{TranslationConfig, TranslationProvider};
use doctrans::errors::ProviderError;
use doctrans::providers::mock::MockProvider;
use doctrans::providers::openai::{OpenAI, OpenAIRequest, OpenAIResponse};
use doctrans::providers::{CompletionRequest, Provider};
use doctrans::translation::TranslationPromptBuilder;

#[test]
fn test_openaiRequest_serialize_shouldUseChatFormat() {
    let request = OpenAIRequest::new("deepseek-chat")
        .add_message("system", "Translate")
        .add_message("user", "Hello")
        .temperature(0.3)
        .max_tokens(4096);

    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["model"], "deepseek-chat");
    assert_eq!(json["messages"][0]["role"], "system");
    assert_eq!(json["messages"][1]["content"], "Hello");
    assert_eq!(json["max_tokens"], 4096);
    assert_eq!(json["stream"], false);
}

#[test]
fn test_openaiResponse_deserialize_shouldReadContentAndUsage() {
    let json = r#"{
        "id": "chatcmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": "你好" }, "finish_reason": "stop" }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
    }"#;

    let response: OpenAIResponse = serde_json::from_str(json).unwrap();
    assert_eq!(OpenAI::extract_text(&response).unwrap(), "你好");
    assert_eq!(response.usage.map(|u| u.completion_tokens), Some(3));
}

#[test]
fn test_openaiFromConfig_shouldUseProviderDefaults() {
    let config = TranslationConfig {
        provider: TranslationProvider::OpenAI,
        ..TranslationConfig::default()
    };

    let client = OpenAI::from_config(&config);
    assert_eq!(client.model(), "gpt-4o-mini");
    assert_eq!(client.name(), "openai-compatible");
}

#[tokio::test]
async fn test_mockProvider_unauthorized_shouldFailConnectionTest() {
    let provider = MockProvider::unauthorized();

    let err = provider.test_connection().await.unwrap_err();
    assert!(matches!(err, ProviderError::AuthenticationError(_)));
}

#[tokio::test]
async fn test_mockProvider_shouldRecordRequestsInOrder() {
    let provider = MockProvider::working();

    for chunk in ["one", "two"] {
        let request = CompletionRequest::new("system", TranslationPromptBuilder::new(chunk).build());
        provider.complete(request).await.unwrap();
    }

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].user.contains("one"));
    assert!(requests[1].user.contains("two"));
}

#[test]
fn test_mockProvider_slow_shouldBeDrivableWithBlockOn() {
    let provider = MockProvider::slow(5);
    let request = CompletionRequest::new("system", TranslationPromptBuilder::new("late").build());

    let response = tokio_test::block_on(async {
        tokio::time::timeout(Duration::from_secs(5), provider.complete(request)).await
    });

    assert_eq!(response.unwrap().unwrap().text, "[TRANSLATED] late");
}
