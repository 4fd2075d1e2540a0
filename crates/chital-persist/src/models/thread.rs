use chital_types::{MessageId, ThreadId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChatMessage, DBThread};

/// Whether a thread has a store identity yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ThreadLifecycle {
    /// In-memory placeholder, invisible to listings
    Draft,
    Persisted { created_at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatThread {
    pub id: ThreadId,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub selected_model: Option<String>,
    /// True exactly while a streaming exchange is in flight
    pub is_thinking: bool,
    pub has_received_first_message: bool,
    pub lifecycle: ThreadLifecycle,
}

impl ChatThread {
    pub fn draft() -> Self {
        Self {
            id: ThreadId::new(),
            title: String::new(),
            messages: Vec::new(),
            selected_model: None,
            is_thinking: false,
            has_received_first_message: false,
            lifecycle: ThreadLifecycle::Draft,
        }
    }

    pub fn from_record(record: DBThread, messages: Vec<ChatMessage>) -> Self {
        let mut thread = Self {
            id: record.id,
            title: record.title,
            messages,
            selected_model: record.selected_model,
            is_thinking: false,
            has_received_first_message: record.has_received_first_message,
            lifecycle: ThreadLifecycle::Persisted {
                created_at: record.created_at,
            },
        };
        thread.sort_messages();
        thread
    }

    /// Storage record, `None` while still a draft
    pub fn to_record(&self) -> Option<DBThread> {
        match self.lifecycle {
            ThreadLifecycle::Draft => None,
            ThreadLifecycle::Persisted { created_at } => Some(DBThread {
                id: self.id,
                title: self.title.clone(),
                selected_model: self.selected_model.clone(),
                has_received_first_message: self.has_received_first_message,
                created_at,
            }),
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self.lifecycle, ThreadLifecycle::Draft)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        match self.lifecycle {
            ThreadLifecycle::Draft => None,
            ThreadLifecycle::Persisted { created_at } => Some(created_at),
        }
    }

    pub fn message(&self, id: MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub(crate) fn message_mut(&mut self, id: MessageId) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Messages are kept sorted, this only restores order after a bulk load
    pub(crate) fn sort_messages(&mut self) {
        self.messages.sort_by_key(ChatMessage::order_key);
    }

    /// Ids of `id` and every message at or after it, in order
    pub fn messages_from(&self, id: MessageId) -> Option<Vec<MessageId>> {
        let cutoff = self.message(id)?.order_key();
        Some(
            self.messages
                .iter()
                .filter(|m| m.order_key() >= cutoff)
                .map(|m| m.id)
                .collect(),
        )
    }
}

/// Pick the model a thread should use.
///
/// Keeps `current` while it is still installed; otherwise prefers a non-empty,
/// installed `default_model` and falls back to the first installed model.
pub fn resolve_model(current: Option<&str>, available: &[String], default_model: &str) -> Option<String> {
    if let Some(current) = current {
        if available.iter().any(|m| m == current) {
            return Some(current.to_string());
        }
    }

    if !default_model.is_empty() && available.iter().any(|m| m == default_model) {
        return Some(default_model.to_string());
    }

    available.first().cloned()
}
