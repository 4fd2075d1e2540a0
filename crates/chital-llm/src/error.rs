use thiserror::Error;

/// What went wrong on the wire, as far as the caller needs to know
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Server unreachable or refused the connection
    ConnectionRefused,
    TimedOut,
    /// HTTP status failures, interrupted or malformed streams, server-reported errors
    Other,
}

#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connection_refused(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::ConnectionRefused, message)
    }

    pub fn timed_out(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::TimedOut, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, message)
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_connect() {
            TransportErrorKind::ConnectionRefused
        } else if err.is_timeout() {
            TransportErrorKind::TimedOut
        } else {
            TransportErrorKind::Other
        };

        // reqwest keeps the useful part (refused, dns, tls) in the source chain
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        Self::new(kind, message)
    }
}

#[derive(Error, Debug, Clone)]
pub enum BackendError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Single-shot reply that does not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl BackendError {
    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            Self::Transport(err) => Some(err.kind()),
            Self::MalformedResponse(_) => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.into())
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_kind_is_exposed() {
        let err: BackendError = TransportError::timed_out("slow").into();
        assert_eq!(err.transport_kind(), Some(TransportErrorKind::TimedOut));
        assert_eq!(err.to_string(), "Transport error: slow");
    }

    #[test]
    fn test_malformed_response_has_no_transport_kind() {
        let err = BackendError::MalformedResponse("missing message".to_string());
        assert_eq!(err.transport_kind(), None);
    }
}
