//! # Chital - local LLM chat sessions
//!
//! Chital keeps conversation threads with a locally running Ollama server:
//! - **Streaming replies** applied fragment by fragment to the thread
//! - **Persisted threads** with draft threads that only hit storage on first use
//! - **Retry** from any point in a thread's history
//! - **Automatic titles** summarized by the model after the first exchange
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chital::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let app = ChatAppBuilder::new()
//!         .base_url("http://localhost:11434")
//!         .storage_dir("/tmp/chital")
//!         .build()
//!         .await?;
//!
//!     let thread_id = app.store().create_draft()?;
//!     app.controller().submit(thread_id, "Hello!").await?;
//!
//!     for message in app.store().chronological_messages(thread_id)? {
//!         println!("{}: {}", if message.is_user { "you" } else { "model" }, message.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **chital-types**: identifiers, observer events, session settings
//! - **chital-llm**: Ollama client with NDJSON streaming
//! - **chital-persist**: thread store plus in-memory and JSON file backends
//! - **chital-session**: session controller and title summarizer

// Re-export all public APIs
pub use chital_llm as llm;
pub use chital_persist as persist;
pub use chital_session as session;
pub use chital_types as types;

// Re-export commonly used types
pub use chital_llm::{ChatBackend, Message, OllamaClient, OllamaConfig};
pub use chital_persist::{ChatMessage, ChatThread, ThreadStore};
pub use chital_session::{ExchangeOutcome, SessionController, SessionError};
pub use chital_types::{ChatEvent, MessageId, SessionSettings, ThreadId};

/// High-level builder wiring backend, storage and controller
pub mod builder;

/// Convenient prelude with commonly used types
pub mod prelude {
    pub use crate::builder::{ChatApp, ChatAppBuilder};
    pub use crate::llm::{Message, OllamaConfig};
    pub use crate::persist::{ChatMessage, ChatThread};
    pub use crate::session::{ExchangeOutcome, SessionError};
    pub use crate::types::{ChatEvent, MessageId, SessionSettings, ThreadId};
    pub use anyhow::Result;
}
