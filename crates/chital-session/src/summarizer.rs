use std::sync::Arc;

use chital_llm::{ChatBackend, Message};
use chital_persist::{PersistError, ThreadStore};
use chital_types::ThreadId;

use crate::error::Result;
use crate::reasoning::ReasoningFilter;

/// Everything a title request needs, captured when the exchange finishes.
///
/// Later truncations or submissions on the thread do not affect it.
#[derive(Debug, Clone)]
pub struct TitleRequest {
    pub thread_id: ThreadId,
    pub model: String,
    pub history: Vec<Message>,
    pub prompt: String,
}

impl TitleRequest {
    pub fn new(
        thread_id: ThreadId,
        model: impl Into<String>,
        history: Vec<Message>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            thread_id,
            model: model.into(),
            history,
            prompt: prompt.into(),
        }
    }

    /// History followed by the summarization instruction as a user message
    pub fn messages(&self) -> Vec<Message> {
        let mut messages = self.history.clone();
        messages.push(Message::user(self.prompt.clone()));
        messages
    }
}

/// Derives a thread title from one non-streaming call
#[derive(Clone)]
pub struct TitleSummarizer {
    backend: Arc<dyn ChatBackend>,
    store: Arc<ThreadStore>,
    filter: ReasoningFilter,
}

impl TitleSummarizer {
    pub fn new(backend: Arc<dyn ChatBackend>, store: Arc<ThreadStore>, filter: ReasoningFilter) -> Self {
        Self {
            backend,
            store,
            filter,
        }
    }

    /// Ask the model for a title and clean it up, without storing it
    pub async fn summarize(&self, request: &TitleRequest) -> Result<String> {
        let raw = self
            .backend
            .send_single_message(&request.model, request.messages())
            .await?;

        Ok(self.filter.clean(&request.model, &raw))
    }

    /// Summarize and write the title. Failures are logged and swallowed.
    pub async fn run(self, request: TitleRequest) {
        let thread_id = request.thread_id;

        let title = match self.summarize(&request).await {
            Ok(title) => title,
            Err(e) => {
                tracing::error!(thread_id = %thread_id, model = %request.model, error = %e, "Error summarizing thread");
                return;
            }
        };

        match self.store.set_title(thread_id, title.clone()) {
            Ok(()) => {
                tracing::info!(thread_id = %thread_id, title = %title, "Thread title set");
            }
            Err(PersistError::ThreadNotFound(_)) => {
                tracing::info!(thread_id = %thread_id, "Thread deleted before its title arrived, dropping it");
            }
            Err(e) => {
                tracing::error!(thread_id = %thread_id, error = %e, "Failed to store thread title");
            }
        }
    }
}
