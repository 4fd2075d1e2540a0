use chital_llm::{
    ChatBackend, ChatRequest, Message, OllamaClient, OllamaConfig, StreamEvent, TransportErrorKind,
};
use futures::StreamExt;
use mockito::{Matcher, Server};
use std::time::Duration;

fn ndjson(lines: &[&str]) -> String {
    lines.iter().map(|l| format!("{}\n", l)).collect()
}

#[tokio::test]
async fn test_stream_conversation_yields_fragments_in_order() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "model": "llama3",
            "stream": true,
            "messages": [{"role": "user", "content": "Hello"}],
        })))
        .with_status(200)
        .with_header("content-type", "application/x-ndjson")
        .with_body(ndjson(&[
            r#"{"model":"llama3","message":{"role":"assistant","content":"Hi"},"done":false}"#,
            r#"{"model":"llama3","message":{"role":"assistant","content":" there!"},"done":false}"#,
            r#"{"model":"llama3","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop"}"#,
        ]))
        .create_async()
        .await;

    let client = OllamaClient::new(server.url()).unwrap();
    let stream = client
        .stream_conversation("llama3", vec![Message::user("Hello")])
        .await
        .unwrap();
    let events: Vec<_> = stream.collect().await;

    let text: String = events
        .iter()
        .filter_map(|e| match e {
            Ok(StreamEvent::Message { content }) => Some(content.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "Hi there!");
    assert!(matches!(
        events.last(),
        Some(Ok(StreamEvent::Done { finish_reason: Some(reason) })) if reason == "stop"
    ));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_stream_error_line_is_a_transport_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_body(ndjson(&[
            r#"{"message":{"role":"assistant","content":"Partial"},"done":false}"#,
            r#"{"error":"model crashed"}"#,
        ]))
        .create_async()
        .await;

    let client = OllamaClient::new(server.url()).unwrap();
    let stream = client
        .stream_conversation("llama3", vec![Message::user("Hello")])
        .await
        .unwrap();
    let events: Vec<_> = stream.collect().await;

    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], Ok(StreamEvent::Message { content }) if content == "Partial"));
    let err = events[1].as_ref().unwrap_err();
    assert_eq!(err.transport_kind(), Some(TransportErrorKind::Other));
    assert!(err.to_string().contains("model crashed"));
}

#[tokio::test]
async fn test_http_error_status_fails_before_streaming() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/chat")
        .with_status(404)
        .with_body(r#"{"error":"model 'missing' not found"}"#)
        .create_async()
        .await;

    let client = OllamaClient::new(server.url()).unwrap();
    let result = client
        .stream_conversation("missing", vec![Message::user("Hello")])
        .await;

    let err = result.err().unwrap();
    assert_eq!(err.transport_kind(), Some(TransportErrorKind::Other));
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn test_send_single_message_returns_reply_text() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(serde_json::json!({"stream": false})))
        .with_status(200)
        .with_body(
            r#"{"model":"llama3","message":{"role":"assistant","content":"Weekend Plans"},"done":true,"prompt_eval_count":20,"eval_count":3}"#,
        )
        .create_async()
        .await;

    let client = OllamaClient::new(server.url()).unwrap();
    let title = client
        .send_single_message("llama3", vec![Message::user("Summarize")])
        .await
        .unwrap();

    assert_eq!(title, "Weekend Plans");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_chat_reports_usage() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_body(
            r#"{"model":"llama3","message":{"role":"assistant","content":"ok"},"done":true,"done_reason":"stop","prompt_eval_count":20,"eval_count":3}"#,
        )
        .create_async()
        .await;

    let client = OllamaClient::new(server.url()).unwrap();
    let response = client
        .chat(ChatRequest::new("llama3", vec![Message::user("Hi")]))
        .await
        .unwrap();

    let usage = response.usage.unwrap();
    assert_eq!(usage.total_tokens, 23);
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn test_single_reply_without_message_is_malformed() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_body(r#"{"model":"llama3","done":true}"#)
        .create_async()
        .await;

    let client = OllamaClient::new(server.url()).unwrap();
    let err = client
        .send_single_message("llama3", vec![Message::user("Hi")])
        .await
        .unwrap_err();

    assert_eq!(err.transport_kind(), None);
    assert!(err.to_string().contains("Malformed response"));
}

#[tokio::test]
async fn test_list_models() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(r#"{"models":[{"name":"llama3:latest","size":1},{"name":"deepseek-r1:8b"}]}"#)
        .create_async()
        .await;

    let client = OllamaClient::new(server.url()).unwrap();
    let models = client.list_models().await.unwrap();

    assert_eq!(models, vec!["llama3:latest", "deepseek-r1:8b"]);
}

#[tokio::test]
async fn test_unreachable_server_is_connection_refused() {
    let config = OllamaConfig::new("http://127.0.0.1:1").with_connect_timeout(Duration::from_secs(2));
    let client = OllamaClient::from_config(config).unwrap();

    let err = client
        .stream_conversation("llama3", vec![Message::user("Hello")])
        .await
        .err()
        .unwrap();

    assert_eq!(err.transport_kind(), Some(TransportErrorKind::ConnectionRefused));
}
