/*!
 * Integration tests for provider API interactions
 *
 * The OpenAI-compatible client talks to a minimal HTTP stub on localhost, so
 * these tests exercise real requests without network access.
 */

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use doctrans::errors::ProviderError;
use doctrans::providers::openai::OpenAI;
use doctrans::providers::{CompletionRequest, Provider};
use doctrans::tool::DocumentTranslatorTool;
use crate::common;

/// Canned HTTP response: status line (e.g. "200 OK") and JSON body
type StubResponse = (&'static str, String);

fn completion_body(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 42, "completion_tokens": 7, "total_tokens": 49 }
    })
    .to_string()
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

/// Serve `responses` in order, one connection each, and hand back the raw requests
async fn stub_server(responses: Vec<StubResponse>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            requests.push(read_request(&mut socket).await);

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        }
        requests
    });

    (format!("http://{}/v1/", addr), handle)
}

/// Accept one connection, read the request and never answer
async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    format!("http://{}/v1", addr)
}

fn client(endpoint: &str) -> OpenAI {
    OpenAI::new("sk-test", endpoint, "deepseek-chat", Duration::from_secs(5))
}

#[tokio::test]
async fn test_openaiComplete_withStubServer_shouldSendChatRequestAndParseReply() {
    let (endpoint, server) = stub_server(vec![("200 OK", completion_body("  你好，世界。 "))]).await;

    let response = client(&endpoint)
        .complete(CompletionRequest::new("Translate into Chinese", "Hello, world."))
        .await
        .unwrap();

    assert_eq!(response.text, "  你好，世界。 ");
    assert_eq!(response.prompt_tokens, Some(42));
    assert_eq!(response.completion_tokens, Some(7));

    let requests = server.await.unwrap();
    let request = &requests[0];
    assert!(request.starts_with("POST /v1/chat/completions HTTP/1.1"));
    assert!(request.to_lowercase().contains("authorization: bearer sk-test"));
    assert!(request.contains("\"model\":\"deepseek-chat\""));
    assert!(request.contains("Translate into Chinese"));
    assert!(request.contains("\"stream\":false"));
}

#[tokio::test]
async fn test_openaiComplete_unauthorized_shouldBeAuthenticationError() {
    let (endpoint, _server) = stub_server(vec![(
        "401 Unauthorized",
        r#"{"error":{"message":"invalid api key"}}"#.to_string(),
    )])
    .await;

    let err = client(&endpoint)
        .complete(CompletionRequest::new("system", "text"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::AuthenticationError(ref m) if m.contains("invalid api key")));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_openaiComplete_serverError_shouldBeRetryableApiError() {
    let (endpoint, _server) =
        stub_server(vec![("503 Service Unavailable", "{}".to_string())]).await;

    let err = client(&endpoint)
        .complete(CompletionRequest::new("system", "text"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::ApiError { status_code: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_openaiComplete_noChoices_shouldBeParseError() {
    let (endpoint, _server) = stub_server(vec![("200 OK", r#"{"choices":[]}"#.to_string())]).await;

    let err = client(&endpoint)
        .complete(CompletionRequest::new("system", "text"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::ParseError(_)));
}

#[tokio::test]
async fn test_openaiComplete_nothingListening_shouldBeConnectionError() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{}/v1", addr))
        .complete(CompletionRequest::new("system", "text"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::ConnectionError(_)));
}

#[tokio::test]
async fn test_openaiComplete_serverNeverAnswers_shouldBeTimeout() {
    let endpoint = silent_server().await;
    let timeout = Duration::from_millis(150);

    let err = OpenAI::new("sk-test", endpoint, "deepseek-chat", timeout)
        .complete(CompletionRequest::new("system", "text"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Timeout(t) if t == timeout), "{:?}", err);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_tool_withStubServer_shouldWriteModelOutput() {
    let (endpoint, server) = stub_server(vec![("200 OK", completion_body("\n你好，世界。\n"))]).await;
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_file(dir.path(), "hello.txt", "Hello, world.").unwrap();

    let mut config = common::test_config();
    config.translation.endpoint = endpoint;
    let provider = Arc::new(OpenAI::from_config(&config.translation));
    let tool = DocumentTranslatorTool::new(config, provider);

    let message = tool.translate(input.to_str().unwrap()).await;

    let output = dir.path().join("translated_hello.txt");
    assert!(message.starts_with("Translation succeeded."), "{}", message);
    assert_eq!(std::fs::read_to_string(output).unwrap(), "你好，世界。");

    let requests = server.await.unwrap();
    assert!(requests[0].contains("from English into Chinese"));
    assert!(requests[0].contains("[Text to translate]:"));
}
