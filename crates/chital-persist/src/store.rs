use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chital_types::{ChatEvent, MessageId, ThreadId};
use chrono::Utc;
use tokio::sync::broadcast;

use crate::dbs::InMemoryPersistence;
use crate::error::{PersistError, Result};
use crate::models::{resolve_model, ChatMessage, ChatThread, DBMessage, DBThread, ThreadLifecycle};
use crate::trait_client::PersistenceClient;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Default)]
struct StoreState {
    threads: HashMap<ThreadId, ChatThread>,
    /// Last sequence number handed out
    last_sequence: u64,
}

impl StoreState {
    fn thread(&self, thread_id: ThreadId) -> Result<&ChatThread> {
        self.threads
            .get(&thread_id)
            .ok_or(PersistError::ThreadNotFound(thread_id))
    }

    fn thread_mut(&mut self, thread_id: ThreadId) -> Result<&mut ChatThread> {
        self.threads
            .get_mut(&thread_id)
            .ok_or(PersistError::ThreadNotFound(thread_id))
    }
}

/// Owns every conversation thread and keeps the backing store in step with it.
///
/// Mutations write to the [`PersistenceClient`] first and touch memory only once
/// that write succeeded, all under a single lock, so observers never see a state
/// the backing store does not have. Streamed text is the exception: fragments
/// land in memory only and the final text is flushed when the exchange ends.
///
/// Every change is announced on a broadcast channel, see [`ThreadStore::subscribe`].
pub struct ThreadStore {
    persistence: Arc<dyn PersistenceClient>,
    state: Mutex<StoreState>,
    events: broadcast::Sender<ChatEvent>,
}

impl ThreadStore {
    pub fn new(persistence: Arc<dyn PersistenceClient>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            persistence,
            state: Mutex::new(StoreState::default()),
            events,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryPersistence::new()))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    /// Publish an event on behalf of a collaborator (phase changes, failures)
    pub fn notify(&self, event: ChatEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|e| PersistError::Internal(format!("Failed to lock thread store: {}", e)))
    }

    /// Rehydrate persisted threads from the backing store, keeping open drafts
    pub fn load(&self) -> Result<usize> {
        let records = self.persistence.list_threads()?;

        let mut loaded = Vec::with_capacity(records.len());
        let mut last_sequence = 0;
        for record in records {
            let messages: Vec<ChatMessage> = self
                .persistence
                .get_messages(record.id)?
                .into_iter()
                .map(ChatMessage::from)
                .collect();
            last_sequence = messages
                .iter()
                .map(|m| m.sequence)
                .fold(last_sequence, u64::max);
            loaded.push(ChatThread::from_record(record, messages));
        }

        let count = loaded.len();
        let mut state = self.lock()?;
        state.threads.retain(|_, thread| thread.is_draft());
        for thread in loaded {
            state.threads.insert(thread.id, thread);
        }
        state.last_sequence = state.last_sequence.max(last_sequence);

        tracing::info!(threads = count, "Loaded threads from storage");
        Ok(count)
    }

    /// New unpersisted thread, invisible to [`ThreadStore::list_threads`] until promoted
    pub fn create_draft(&self) -> Result<ThreadId> {
        let thread = ChatThread::draft();
        let thread_id = thread.id;

        self.lock()?.threads.insert(thread_id, thread);
        self.notify(ChatEvent::ThreadCreated {
            thread_id,
            draft: true,
        });

        Ok(thread_id)
    }

    pub fn create_thread(&self) -> Result<ThreadId> {
        let mut thread = ChatThread::draft();
        thread.lifecycle = ThreadLifecycle::Persisted {
            created_at: Utc::now(),
        };
        let thread_id = thread.id;

        let mut state = self.lock()?;
        if let Some(record) = thread.to_record() {
            self.persistence.save_thread(&record)?;
        }
        state.threads.insert(thread_id, thread);
        self.notify(ChatEvent::ThreadCreated {
            thread_id,
            draft: false,
        });

        Ok(thread_id)
    }

    /// Snapshot of a thread
    pub fn thread(&self, thread_id: ThreadId) -> Result<ChatThread> {
        Ok(self.lock()?.thread(thread_id)?.clone())
    }

    pub fn message(&self, thread_id: ThreadId, message_id: MessageId) -> Result<ChatMessage> {
        self.lock()?
            .thread(thread_id)?
            .message(message_id)
            .cloned()
            .ok_or(PersistError::MessageNotFound(message_id))
    }

    /// Persisted threads, newest first
    pub fn list_threads(&self) -> Result<Vec<ChatThread>> {
        let state = self.lock()?;
        let mut threads: Vec<ChatThread> = state
            .threads
            .values()
            .filter(|t| !t.is_draft())
            .cloned()
            .collect();
        threads.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(threads)
    }

    pub fn chronological_messages(&self, thread_id: ThreadId) -> Result<Vec<ChatMessage>> {
        Ok(self.lock()?.thread(thread_id)?.messages.clone())
    }

    /// Turn a draft into a persisted thread. Returns `false` if it already was one.
    pub fn promote_draft(&self, thread_id: ThreadId) -> Result<bool> {
        let mut state = self.lock()?;
        let thread = state.thread_mut(thread_id)?;
        if !thread.is_draft() {
            return Ok(false);
        }

        let created_at = Utc::now();
        self.persistence.save_thread(&DBThread {
            id: thread_id,
            title: thread.title.clone(),
            selected_model: thread.selected_model.clone(),
            has_received_first_message: thread.has_received_first_message,
            created_at,
        })?;

        thread.lifecycle = ThreadLifecycle::Persisted { created_at };
        tracing::debug!(thread_id = %thread_id, "Promoted draft thread");
        self.notify(ChatEvent::ThreadPromoted {
            thread_id,
            created_at,
        });

        Ok(true)
    }

    /// Append a message at the end of the thread's history
    pub fn append(&self, thread_id: ThreadId, text: impl Into<String>, is_user: bool) -> Result<ChatMessage> {
        let mut state = self.lock()?;
        let sequence = state.last_sequence + 1;
        let thread = state.thread_mut(thread_id)?;
        if thread.is_draft() {
            return Err(PersistError::DraftThread(thread_id));
        }

        let mut message = ChatMessage::new(text, is_user, sequence);
        // Clock steps backwards must not reorder history
        if let Some(last) = thread.last_message() {
            if message.created_at < last.created_at {
                message.created_at = last.created_at;
            }
        }

        self.persistence
            .save_message(&DBMessage::from_message(thread_id, &message))?;
        thread.messages.push(message.clone());
        state.last_sequence = sequence;

        self.notify(ChatEvent::MessageAppended {
            thread_id,
            message_id: message.id,
            is_user,
        });

        Ok(message)
    }

    /// Grow a message in place with a streamed fragment
    pub fn append_to_message(&self, thread_id: ThreadId, message_id: MessageId, delta: &str) -> Result<()> {
        if delta.is_empty() {
            return Ok(());
        }

        let mut state = self.lock()?;
        let message = state
            .thread_mut(thread_id)?
            .message_mut(message_id)
            .ok_or(PersistError::MessageNotFound(message_id))?;
        message.text.push_str(delta);

        self.notify(ChatEvent::MessageUpdated {
            thread_id,
            message_id,
            delta: delta.to_string(),
        });

        Ok(())
    }

    /// Remove `message_id` and everything chronologically at or after it.
    ///
    /// One backing-store call; memory is only touched if it succeeds.
    pub fn truncate_from(&self, thread_id: ThreadId, message_id: MessageId) -> Result<Vec<MessageId>> {
        let mut state = self.lock()?;
        let thread = state.thread_mut(thread_id)?;
        let removed = thread
            .messages_from(message_id)
            .ok_or(PersistError::MessageNotFound(message_id))?;

        self.persistence.delete_messages(thread_id, &removed)?;
        thread.messages.retain(|m| !removed.contains(&m.id));

        tracing::debug!(thread_id = %thread_id, removed = removed.len(), "Truncated thread history");
        self.notify(ChatEvent::MessagesTruncated {
            thread_id,
            removed: removed.clone(),
        });

        Ok(removed)
    }

    pub fn set_title(&self, thread_id: ThreadId, title: impl Into<String>) -> Result<()> {
        let title = title.into();
        let mut state = self.lock()?;
        let thread = state.thread_mut(thread_id)?;

        if let Some(mut record) = thread.to_record() {
            record.title = title.clone();
            self.persistence.save_thread(&record)?;
        }
        thread.title = title.clone();

        self.notify(ChatEvent::TitleChanged { thread_id, title });
        Ok(())
    }

    pub fn set_selected_model(&self, thread_id: ThreadId, model: Option<String>) -> Result<()> {
        let mut state = self.lock()?;
        let thread = state.thread_mut(thread_id)?;
        if thread.selected_model == model {
            return Ok(());
        }

        if let Some(mut record) = thread.to_record() {
            record.selected_model = model.clone();
            self.persistence.save_thread(&record)?;
        }
        thread.selected_model = model.clone();

        self.notify(ChatEvent::ModelSelected { thread_id, model });
        Ok(())
    }

    /// Make sure the thread points at an installed model, see [`resolve_model`].
    ///
    /// Idempotent; returns the model the thread ends up with.
    pub fn ensure_model_selected(
        &self,
        thread_id: ThreadId,
        available_models: &[String],
        default_model_name: &str,
    ) -> Result<Option<String>> {
        let current = self.lock()?.thread(thread_id)?.selected_model.clone();
        let resolved = resolve_model(current.as_deref(), available_models, default_model_name);

        // With nothing installed the stale selection is left alone
        match &resolved {
            Some(model) if current.as_deref() != Some(model.as_str()) => {
                self.set_selected_model(thread_id, resolved.clone())?;
            }
            _ => {}
        }

        Ok(resolved)
    }

    /// Delete a thread and, if persisted, its stored messages
    pub fn delete_thread(&self, thread_id: ThreadId) -> Result<()> {
        let mut state = self.lock()?;
        let thread = state.thread(thread_id)?;

        if !thread.is_draft() {
            self.persistence.delete_thread(thread_id)?;
        }
        state.threads.remove(&thread_id);

        tracing::info!(thread_id = %thread_id, "Deleted thread");
        self.notify(ChatEvent::ThreadDeleted { thread_id });
        Ok(())
    }

    /// Mark the thread as thinking, failing if an exchange is already in flight
    pub fn try_begin_exchange(&self, thread_id: ThreadId) -> Result<()> {
        let mut state = self.lock()?;
        let thread = state.thread_mut(thread_id)?;
        if thread.is_thinking {
            return Err(PersistError::ExchangeInFlight(thread_id));
        }

        thread.is_thinking = true;
        self.notify(ChatEvent::ThinkingChanged {
            thread_id,
            is_thinking: true,
        });
        Ok(())
    }

    /// Close a successful exchange.
    ///
    /// Flushes the assistant reply, clears `is_thinking` and returns `true` if this
    /// was the thread's first completed exchange. `is_thinking` is cleared even if
    /// the flush fails.
    pub fn finish_exchange(&self, thread_id: ThreadId, assistant_message_id: MessageId) -> Result<bool> {
        let mut state = self.lock()?;
        let thread = state.thread_mut(thread_id)?;
        let first_exchange = !thread.has_received_first_message;

        let flushed = self.flush_exchange(thread, Some(assistant_message_id), first_exchange);
        self.clear_thinking(thread);
        flushed?;

        if first_exchange {
            thread.has_received_first_message = true;
        }
        Ok(first_exchange)
    }

    /// Close a failed or cancelled exchange, keeping whatever text was streamed
    pub fn abort_exchange(&self, thread_id: ThreadId, assistant_message_id: Option<MessageId>) -> Result<()> {
        let mut state = self.lock()?;
        let thread = state.thread_mut(thread_id)?;

        let flushed = self.flush_exchange(thread, assistant_message_id, false);
        self.clear_thinking(thread);
        flushed
    }

    fn flush_exchange(
        &self,
        thread: &ChatThread,
        assistant_message_id: Option<MessageId>,
        mark_first_exchange: bool,
    ) -> Result<()> {
        if let Some(message) = assistant_message_id.and_then(|id| thread.message(id)) {
            self.persistence
                .save_message(&DBMessage::from_message(thread.id, message))?;
        }

        if mark_first_exchange {
            if let Some(mut record) = thread.to_record() {
                record.has_received_first_message = true;
                self.persistence.save_thread(&record)?;
            }
        }

        Ok(())
    }

    fn clear_thinking(&self, thread: &mut ChatThread) {
        if thread.is_thinking {
            thread.is_thinking = false;
            self.notify(ChatEvent::ThinkingChanged {
                thread_id: thread.id,
                is_thinking: false,
            });
        }
    }
}
