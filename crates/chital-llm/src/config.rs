// Connection settings for the local model server

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::traits::ChatOptions;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

/// Whole seconds, rounded up and never zero
fn whole_secs(timeout: Duration) -> u64 {
    let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
    secs.max(1)
}

fn default_stream_idle_timeout_secs() -> Option<u64> {
    // First token can take a while when the server has to load the model
    Some(300)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Whole-request limit for single-shot and listing calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Longest allowed gap between two streamed chunks; `None` waits forever
    #[serde(default = "default_stream_idle_timeout_secs")]
    pub stream_idle_timeout_secs: Option<u64>,

    /// Forwarded as `keep_alive` so the server keeps the model loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,

    /// Generation options sent with every request that carries none of its own
    #[serde(default)]
    pub options: ChatOptions,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            stream_idle_timeout_secs: default_stream_idle_timeout_secs(),
            keep_alive: None,
            options: ChatOptions::default(),
        }
    }
}

impl OllamaConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_secs = whole_secs(timeout);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = whole_secs(timeout);
        self
    }

    pub fn with_stream_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stream_idle_timeout_secs = timeout.map(whole_secs);
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn stream_idle_timeout(&self) -> Option<Duration> {
        self.stream_idle_timeout_secs
            .map(|secs| Duration::from_secs(secs.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_local_server() {
        let config = OllamaConfig::default();
        assert_eq!(config.base_url, "http://localhost:11434");
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.stream_idle_timeout(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_partial_config_deserializes() {
        let config: OllamaConfig =
            serde_json::from_str(r#"{"base_url":"http://gpu-box:11434","stream_idle_timeout_secs":null}"#)
                .unwrap();

        assert_eq!(config.base_url, "http://gpu-box:11434");
        assert_eq!(config.request_timeout_secs, 120);
        assert_eq!(config.stream_idle_timeout(), None);
    }

    #[test]
    fn test_sub_second_timeouts_round_up() {
        let config = OllamaConfig::default()
            .with_connect_timeout(Duration::from_millis(500))
            .with_request_timeout(Duration::from_millis(1500))
            .with_stream_idle_timeout(Some(Duration::ZERO));

        assert_eq!(config.connect_timeout(), Duration::from_secs(1));
        assert_eq!(config.request_timeout(), Duration::from_secs(2));
        assert_eq!(config.stream_idle_timeout(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_zero_from_file_is_not_a_zero_timeout() {
        let config: OllamaConfig = serde_json::from_str(r#"{"connect_timeout_secs":0}"#).unwrap();
        assert_eq!(config.connect_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_generation_options_deserialize() {
        let config: OllamaConfig =
            serde_json::from_str(r#"{"options":{"temperature":0.5,"num_ctx":8192}}"#).unwrap();

        assert_eq!(config.options, ChatOptions::new().temperature(0.5).num_ctx(8192));
    }
}
