//! OpenAI-compatible client against a mock HTTP server

use resume_tailor::llm::{ImageAttachment, LlmClient, LlmRequest, OpenAiClient};
use resume_tailor::ResumeTailorError;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new(
        "test-key".to_string(),
        &server.uri(),
        "text-model",
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_completion_returns_first_choice_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "text-model"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"skills\": [\"Rust\"]}"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = LlmRequest::new("system", "Extract requirements".to_string());
    let reply = client(&server).complete(&request).await.unwrap();
    assert_eq!(reply, "{\"skills\": [\"Rust\"]}");
}

#[tokio::test]
async fn test_vision_request_targets_override_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "vision-model"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "{\"acceptable\": true}"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = LlmRequest::new("critic", "Review the page".to_string())
        .with_images(vec![ImageAttachment::png(vec![0x89, 0x50])])
        .with_model("vision-model");
    let reply = client(&server).complete(&request).await.unwrap();
    assert!(reply.contains("acceptable"));
}

#[tokio::test]
async fn test_server_error_is_service_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let request = LlmRequest::new("system", "hello".to_string());
    let err = client(&server).complete(&request).await.unwrap_err();
    match err {
        ResumeTailorError::ServiceUnavailable(message) => assert!(message.contains("overloaded")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_choices_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let request = LlmRequest::new("system", "hello".to_string());
    let err = client(&server).complete(&request).await.unwrap_err();
    assert!(err.is_retryable_parse());
}

#[tokio::test]
async fn test_unreachable_service_is_service_unavailable() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let client = OpenAiClient::new("k".to_string(), &uri, "m", Duration::from_secs(2)).unwrap();
    let request = LlmRequest::new("system", "hello".to_string());
    let err = client.complete(&request).await.unwrap_err();
    assert!(matches!(err, ResumeTailorError::ServiceUnavailable(_)));
}
