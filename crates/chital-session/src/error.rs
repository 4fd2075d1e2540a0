use chital_llm::{BackendError, TransportErrorKind};
use chital_persist::PersistError;
use chital_types::ThreadId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No model selected")]
    NoModelSelected,

    #[error("An exchange is already in flight for thread {0}")]
    ExchangeInFlight(ThreadId),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Persist(PersistError),

    #[error("Invalid reasoning pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl From<PersistError> for SessionError {
    fn from(err: PersistError) -> Self {
        match err {
            PersistError::ExchangeInFlight(thread_id) => Self::ExchangeInFlight(thread_id),
            other => Self::Persist(other),
        }
    }
}

impl SessionError {
    /// Text shown to the user when an exchange fails
    pub fn user_message(&self) -> String {
        match self.transport_kind() {
            Some(TransportErrorKind::ConnectionRefused) => {
                "Unable to connect to the Ollama API. Please ensure that the Ollama server is running.".to_string()
            }
            Some(TransportErrorKind::TimedOut) => {
                "The request to Ollama API timed out. Please try again later.".to_string()
            }
            _ => format!(
                "An unexpected error occurred while communicating with the Ollama API: {}",
                self
            ),
        }
    }

    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            Self::Backend(err) => err.transport_kind(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chital_llm::TransportError;

    #[test]
    fn test_connection_refused_message() {
        let err = SessionError::from(BackendError::from(TransportError::connection_refused("refused")));
        assert_eq!(
            err.user_message(),
            "Unable to connect to the Ollama API. Please ensure that the Ollama server is running."
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = SessionError::from(BackendError::from(TransportError::timed_out("slow")));
        assert_eq!(
            err.user_message(),
            "The request to Ollama API timed out. Please try again later."
        );
    }

    #[test]
    fn test_other_errors_include_description() {
        let err = SessionError::from(BackendError::from(TransportError::other("stream closed")));
        assert_eq!(
            err.user_message(),
            "An unexpected error occurred while communicating with the Ollama API: Transport error: stream closed"
        );

        assert_eq!(
            SessionError::NoModelSelected.user_message(),
            "An unexpected error occurred while communicating with the Ollama API: No model selected"
        );
    }

    #[test]
    fn test_busy_store_maps_to_exchange_in_flight() {
        let thread_id = ThreadId::new();
        let err = SessionError::from(PersistError::ExchangeInFlight(thread_id));
        assert!(matches!(err, SessionError::ExchangeInFlight(id) if id == thread_id));
    }
}
