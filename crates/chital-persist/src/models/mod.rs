mod db_message;
mod db_thread;
mod message;
mod thread;

// Storage records, backend agnostic
pub use db_message::DBMessage;
pub use db_thread::DBThread;

// In-memory session view
pub use message::ChatMessage;
pub use thread::{resolve_model, ChatThread, ThreadLifecycle};
