use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chital_types::{MessageId, ThreadId};

use super::ThreadDocument;
use crate::error::{PersistError, Result};
use crate::models::{DBMessage, DBThread};
use crate::trait_client::PersistenceClient;

/// JSON file backend
/// Stores each thread with its messages as `<dir>/<thread_id>.json`
pub struct JsonFilePersistence {
    threads_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFilePersistence {
    pub fn new(threads_dir: impl Into<PathBuf>) -> Result<Self> {
        let threads_dir = threads_dir.into();
        std::fs::create_dir_all(&threads_dir)?;

        tracing::debug!(dir = %threads_dir.display(), "Using JSON thread storage");

        Ok(Self {
            threads_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn threads_dir(&self) -> &Path {
        &self.threads_dir
    }

    fn thread_path(&self, thread_id: ThreadId) -> PathBuf {
        self.threads_dir.join(format!("{}.json", thread_id))
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| PersistError::Internal(format!("Failed to lock thread files: {}", e)))
    }

    fn read_document(&self, thread_id: ThreadId) -> Result<Option<ThreadDocument>> {
        let path = self.thread_path(thread_id);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn write_document(&self, document: &ThreadDocument) -> Result<()> {
        let path = self.thread_path(document.thread.id);
        let json = serde_json::to_string_pretty(document)?;

        // Write to temp, then rename
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, json)?;
        std::fs::rename(&temp_path, &path)?;

        Ok(())
    }

    fn existing_document(&self, thread_id: ThreadId) -> Result<ThreadDocument> {
        self.read_document(thread_id)?
            .ok_or(PersistError::ThreadNotFound(thread_id))
    }
}

impl PersistenceClient for JsonFilePersistence {
    fn save_thread(&self, thread: &DBThread) -> Result<()> {
        let _guard = self.guard()?;

        let document = match self.read_document(thread.id)? {
            Some(mut existing) => {
                existing.thread = thread.clone();
                existing
            }
            None => ThreadDocument::new(thread.clone()),
        };

        self.write_document(&document)
    }

    fn delete_thread(&self, thread_id: ThreadId) -> Result<()> {
        let _guard = self.guard()?;

        let path = self.thread_path(thread_id);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn list_threads(&self) -> Result<Vec<DBThread>> {
        let mut threads = Vec::new();

        for entry in std::fs::read_dir(&self.threads_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable thread file");
                    continue;
                }
            };
            match serde_json::from_str::<ThreadDocument>(&content) {
                Ok(document) => threads.push(document.thread),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping malformed thread file");
                }
            }
        }

        Ok(threads)
    }

    fn save_message(&self, message: &DBMessage) -> Result<()> {
        let _guard = self.guard()?;

        let mut document = self.existing_document(message.thread_id)?;
        document.upsert_message(message);
        self.write_document(&document)
    }

    fn delete_messages(&self, thread_id: ThreadId, message_ids: &[MessageId]) -> Result<()> {
        let _guard = self.guard()?;

        let mut document = self.existing_document(thread_id)?;
        document.messages.retain(|m| !message_ids.contains(&m.id));
        self.write_document(&document)
    }

    fn get_messages(&self, thread_id: ThreadId) -> Result<Vec<DBMessage>> {
        Ok(self
            .read_document(thread_id)?
            .map(|doc| doc.messages)
            .unwrap_or_default())
    }
}
