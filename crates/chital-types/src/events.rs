use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{MessageId, ThreadId};
use crate::state::ExchangePhase;

/// Change notification published by the thread store and the session controller.
///
/// Renderers subscribe to these instead of observing the entities directly.
/// Every variant is tagged with the thread it concerns so subscribers can filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    ThreadCreated {
        thread_id: ThreadId,
        draft: bool,
    },

    /// Draft became a persisted thread
    ThreadPromoted {
        thread_id: ThreadId,
        created_at: DateTime<Utc>,
    },

    ThreadDeleted {
        thread_id: ThreadId,
    },

    MessageAppended {
        thread_id: ThreadId,
        message_id: MessageId,
        is_user: bool,
    },

    /// Streamed text was appended to a message (also the scroll-to-latest signal)
    MessageUpdated {
        thread_id: ThreadId,
        message_id: MessageId,
        delta: String,
    },

    MessagesTruncated {
        thread_id: ThreadId,
        removed: Vec<MessageId>,
    },

    TitleChanged {
        thread_id: ThreadId,
        title: String,
    },

    ModelSelected {
        thread_id: ThreadId,
        #[serde(skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },

    ThinkingChanged {
        thread_id: ThreadId,
        is_thinking: bool,
    },

    PhaseChanged {
        thread_id: ThreadId,
        phase: ExchangePhase,
    },

    /// User-facing error text for a failed exchange
    ExchangeFailed {
        thread_id: ThreadId,
        message: String,
    },
}

impl ChatEvent {
    pub fn thread_id(&self) -> ThreadId {
        match self {
            Self::ThreadCreated { thread_id, .. }
            | Self::ThreadPromoted { thread_id, .. }
            | Self::ThreadDeleted { thread_id }
            | Self::MessageAppended { thread_id, .. }
            | Self::MessageUpdated { thread_id, .. }
            | Self::MessagesTruncated { thread_id, .. }
            | Self::TitleChanged { thread_id, .. }
            | Self::ModelSelected { thread_id, .. }
            | Self::ThinkingChanged { thread_id, .. }
            | Self::PhaseChanged { thread_id, .. }
            | Self::ExchangeFailed { thread_id, .. } => *thread_id,
        }
    }
}
