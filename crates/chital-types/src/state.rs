use serde::{Deserialize, Serialize};

/// Per-thread phase of the send/stream state machine.
///
/// `Idle -> Sending -> Streaming -> Finalizing -> Idle`, with `Error` reachable
/// from `Sending` or `Streaming` and always followed by `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangePhase {
    #[default]
    Idle,
    Sending,
    Streaming,
    Finalizing,
    Error,
}

impl ExchangePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Sending => "sending",
            Self::Streaming => "streaming",
            Self::Finalizing => "finalizing",
            Self::Error => "error",
        }
    }
}
