use chital_types::MessageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    /// Grows in place while an assistant reply streams
    pub text: String,
    pub is_user: bool,
    pub created_at: DateTime<Utc>,
    /// Store-wide insertion counter, breaks `created_at` ties
    pub sequence: u64,
}

impl ChatMessage {
    pub fn new(text: impl Into<String>, is_user: bool, sequence: u64) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            is_user,
            created_at: Utc::now(),
            sequence,
        }
    }

    /// Sort key for chronological order
    pub fn order_key(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.sequence)
    }
}
