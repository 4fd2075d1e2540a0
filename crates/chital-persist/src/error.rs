use chital_types::{MessageId, ThreadId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Thread not found: {0}")]
    ThreadNotFound(ThreadId),

    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    /// Messages can only be added once the draft has been promoted
    #[error("Thread {0} is still a draft")]
    DraftThread(ThreadId),

    #[error("An exchange is already in flight for thread {0}")]
    ExchangeInFlight(ThreadId),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PersistError>;
