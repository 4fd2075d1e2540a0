mod json;
mod memory;

pub use json::JsonFilePersistence;
pub use memory::InMemoryPersistence;

use serde::{Deserialize, Serialize};

use crate::models::{DBMessage, DBThread};

/// Everything stored for one thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ThreadDocument {
    pub thread: DBThread,
    #[serde(default)]
    pub messages: Vec<DBMessage>,
}

impl ThreadDocument {
    fn new(thread: DBThread) -> Self {
        Self {
            thread,
            messages: Vec::new(),
        }
    }

    fn upsert_message(&mut self, message: &DBMessage) {
        match self.messages.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => *existing = message.clone(),
            None => self.messages.push(message.clone()),
        }
    }
}
