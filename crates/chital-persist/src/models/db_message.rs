use chital_types::{MessageId, ThreadId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ChatMessage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DBMessage {
    pub id: MessageId,
    pub thread_id: ThreadId,
    pub text: String,
    pub is_user: bool,
    pub created_at: DateTime<Utc>,
    pub sequence: u64,
}

impl DBMessage {
    pub fn from_message(thread_id: ThreadId, message: &ChatMessage) -> Self {
        Self {
            id: message.id,
            thread_id,
            text: message.text.clone(),
            is_user: message.is_user,
            created_at: message.created_at,
            sequence: message.sequence,
        }
    }
}

impl From<DBMessage> for ChatMessage {
    fn from(record: DBMessage) -> Self {
        Self {
            id: record.id,
            text: record.text,
            is_user: record.is_user,
            created_at: record.created_at,
            sequence: record.sequence,
        }
    }
}
