pub mod config;
pub mod error;
pub mod ollama;
pub mod streaming;
pub mod traits;
pub mod types;

pub use config::{OllamaConfig, DEFAULT_BASE_URL};
pub use error::{BackendError, Result, TransportError, TransportErrorKind};
pub use ollama::OllamaClient;
pub use streaming::{ChatChunk, StreamEvent};
pub use traits::{ChatBackend, ChatOptions, ChatRequest, ChatResponse, EventStream, TokenUsage};
pub use types::Message;
