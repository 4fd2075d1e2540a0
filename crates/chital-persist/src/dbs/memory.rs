use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chital_types::{MessageId, ThreadId};

use super::ThreadDocument;
use crate::error::{PersistError, Result};
use crate::models::{DBMessage, DBThread};
use crate::trait_client::PersistenceClient;

/// In-memory backend
/// Useful for testing and for sessions that should not touch disk
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    documents: Arc<Mutex<HashMap<ThreadId, ThreadDocument>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<ThreadId, ThreadDocument>>> {
        self.documents
            .lock()
            .map_err(|e| PersistError::Internal(format!("Failed to lock documents: {}", e)))
    }
}

impl PersistenceClient for InMemoryPersistence {
    fn save_thread(&self, thread: &DBThread) -> Result<()> {
        let mut documents = self.lock()?;
        documents
            .entry(thread.id)
            .and_modify(|doc| doc.thread = thread.clone())
            .or_insert_with(|| ThreadDocument::new(thread.clone()));
        Ok(())
    }

    fn delete_thread(&self, thread_id: ThreadId) -> Result<()> {
        self.lock()?.remove(&thread_id);
        Ok(())
    }

    fn list_threads(&self) -> Result<Vec<DBThread>> {
        Ok(self.lock()?.values().map(|doc| doc.thread.clone()).collect())
    }

    fn save_message(&self, message: &DBMessage) -> Result<()> {
        let mut documents = self.lock()?;
        let doc = documents
            .get_mut(&message.thread_id)
            .ok_or(PersistError::ThreadNotFound(message.thread_id))?;
        doc.upsert_message(message);
        Ok(())
    }

    fn delete_messages(&self, thread_id: ThreadId, message_ids: &[MessageId]) -> Result<()> {
        let mut documents = self.lock()?;
        let doc = documents
            .get_mut(&thread_id)
            .ok_or(PersistError::ThreadNotFound(thread_id))?;
        doc.messages.retain(|m| !message_ids.contains(&m.id));
        Ok(())
    }

    fn get_messages(&self, thread_id: ThreadId) -> Result<Vec<DBMessage>> {
        Ok(self
            .lock()?
            .get(&thread_id)
            .map(|doc| doc.messages.clone())
            .unwrap_or_default())
    }
}
