use chital_types::{MessageId, ThreadId};

use crate::error::Result;
use crate::models::{DBMessage, DBThread};

/// Trait for persistence backends
///
/// Calls are synchronous: the thread store invokes them while holding its own
/// lock so that storage and memory change together.
pub trait PersistenceClient: Send + Sync {
    /// Insert or replace thread metadata
    fn save_thread(&self, thread: &DBThread) -> Result<()>;

    /// Delete a thread together with all of its messages
    fn delete_thread(&self, thread_id: ThreadId) -> Result<()>;

    /// All persisted threads, in no particular order
    fn list_threads(&self) -> Result<Vec<DBThread>>;

    /// Insert or replace a single message
    fn save_message(&self, message: &DBMessage) -> Result<()>;

    /// Remove a set of messages from one thread in a single write
    fn delete_messages(&self, thread_id: ThreadId, message_ids: &[MessageId]) -> Result<()>;

    fn get_messages(&self, thread_id: ThreadId) -> Result<Vec<DBMessage>>;
}
