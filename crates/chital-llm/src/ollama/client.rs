// Ollama-specific client implementation

use crate::config::OllamaConfig;
use crate::error::{BackendError, Result, TransportError};
use crate::streaming::parse_chat_stream;
use crate::traits::{ChatBackend, ChatRequest, ChatResponse, EventStream, TokenUsage};
use crate::types::Message;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Ollama client (HTTP direct, no SDK)
pub struct OllamaClient {
    http_client: reqwest::Client,
    base_url: String,
    config: OllamaConfig,
}

impl OllamaClient {
    /// Create client for a server at `base_url` with default timeouts
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::from_config(OllamaConfig::new(base_url))
    }

    pub fn from_config(config: OllamaConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| TransportError::other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    /// Build `/api/chat` request payload
    fn build_chat_request(&self, request: &ChatRequest, stream: bool) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(Self::convert_message)
            .collect();

        let mut payload = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "stream": stream,
        });

        if let Some(obj) = payload.as_object_mut() {
            let options = if request.options.is_empty() {
                &self.config.options
            } else {
                &request.options
            };
            if !options.is_empty() {
                obj.insert(
                    "options".to_string(),
                    serde_json::to_value(options).unwrap_or(Value::Null),
                );
            }
            if let Some(keep_alive) = &self.config.keep_alive {
                obj.insert("keep_alive".to_string(), serde_json::json!(keep_alive));
            }
        }

        payload
    }

    fn convert_message(message: &Message) -> Value {
        serde_json::json!({
            "role": message.role(),
            "content": message.content(),
        })
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        Err(TransportError::other(format!("Ollama API error ({}): {}", status, error_text)).into())
    }

    fn parse_chat_response(&self, raw: Value) -> Result<ChatResponse> {
        let parsed: OllamaChatResponse = serde_json::from_value(raw.clone())
            .map_err(|e| BackendError::MalformedResponse(format!("Failed to parse chat response: {}", e)))?;

        let message = parsed
            .message
            .ok_or_else(|| BackendError::MalformedResponse("Chat response has no message".to_string()))?;

        let usage = match (parsed.prompt_eval_count, parsed.eval_count) {
            (Some(input), Some(output)) => Some(TokenUsage::new(input, output)),
            _ => None,
        };

        Ok(ChatResponse {
            content: message.content,
            model: parsed.model,
            usage,
            finish_reason: parsed.done_reason,
            raw,
        })
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload = self.build_chat_request(&request, false);
        tracing::debug!(model = %request.model, messages = request.messages.len(), "Sending chat request");

        let response = self
            .http_client
            .post(self.endpoint("chat"))
            .timeout(self.config.request_timeout())
            .json(&payload)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let text = response.text().await?;
        let raw: Value = serde_json::from_str(&text)
            .map_err(|e| BackendError::MalformedResponse(format!("Response is not JSON: {}", e)))?;

        if let Some(error) = raw.get("error").and_then(Value::as_str) {
            return Err(TransportError::other(format!("Model server error: {}", error)).into());
        }

        self.parse_chat_response(raw)
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream> {
        let payload = self.build_chat_request(&request, true);
        tracing::debug!(model = %request.model, messages = request.messages.len(), "Opening chat stream");

        let send = self.http_client.post(self.endpoint("chat")).json(&payload).send();
        let response = match self.config.stream_idle_timeout() {
            Some(limit) => tokio::time::timeout(limit, send).await.map_err(|_| {
                TransportError::timed_out(format!(
                    "Ollama did not answer within {}s",
                    limit.as_secs()
                ))
            })??,
            None => send.await?,
        };
        let response = Self::check_status(response).await?;

        Ok(parse_chat_stream(response, self.config.stream_idle_timeout()))
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .http_client
            .get(self.endpoint("tags"))
            .timeout(self.config.request_timeout())
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let text = response.text().await?;
        let tags: TagsResponse = serde_json::from_str(&text)
            .map_err(|e| BackendError::MalformedResponse(format!("Failed to parse model list: {}", e)))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ChatOptions;

    #[test]
    fn test_payload_shape() {
        let client = OllamaClient::new("http://localhost:11434/").unwrap();
        let request = ChatRequest::new(
            "llama3",
            vec![Message::user("Hello"), Message::assistant("Hi")],
        );

        let payload = client.build_chat_request(&request, true);

        assert_eq!(payload["model"], "llama3");
        assert_eq!(payload["stream"], true);
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(payload["messages"][1]["role"], "assistant");
        assert_eq!(payload["messages"][1]["content"], "Hi");
        assert!(payload.get("options").is_none());
        assert!(payload.get("keep_alive").is_none());
    }

    #[test]
    fn test_options_and_keep_alive_are_forwarded() {
        let config = OllamaConfig::default().with_keep_alive("5m");
        let client = OllamaClient::from_config(config).unwrap();
        let request = ChatRequest::new("llama3", vec![Message::user("Hello")])
            .with_options(ChatOptions::new().temperature(0.2).num_ctx(4096));

        let payload = client.build_chat_request(&request, false);

        assert_eq!(payload["options"]["num_ctx"], 4096);
        assert_eq!(payload["keep_alive"], "5m");
    }

    #[test]
    fn test_configured_options_apply_unless_request_overrides() {
        let config = OllamaConfig::default().with_options(ChatOptions::new().num_ctx(8192));
        let client = OllamaClient::from_config(config).unwrap();

        let plain = ChatRequest::new("llama3", vec![Message::user("Hello")]);
        let payload = client.build_chat_request(&plain, true);
        assert_eq!(payload["options"]["num_ctx"], 8192);
        assert!(payload["options"].get("temperature").is_none());

        let tuned = plain.with_options(ChatOptions::new().temperature(0.1));
        let payload = client.build_chat_request(&tuned, true);
        assert!(payload["options"].get("num_ctx").is_none());
        assert!(payload["options"]["temperature"].is_number());
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = OllamaClient::new("http://example:11434/").unwrap();
        assert_eq!(client.endpoint("chat"), "http://example:11434/api/chat");
    }
}
