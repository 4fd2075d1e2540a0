use serde::{Deserialize, Serialize};

/// One entry of the conversation history sent to the model server.
///
/// Serializes to the Ollama shape `{"role": "user" | "assistant", "content": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    User { content: String },

    Assistant { content: String },
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
        }
    }

    /// Build from the `is_user` flag stored on chat messages
    pub fn from_role(is_user: bool, content: impl Into<String>) -> Self {
        if is_user {
            Self::user(content)
        } else {
            Self::assistant(content)
        }
    }

    pub fn role(&self) -> &str {
        match self {
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::User { content } | Self::Assistant { content } => content,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }
}
