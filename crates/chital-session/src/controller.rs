use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chital_llm::{ChatBackend, Message, StreamEvent};
use chital_persist::ThreadStore;
use chital_types::{ChatEvent, ExchangePhase, MessageId, SessionSettings, ThreadId};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::{Result, SessionError};
use crate::history::backend_history;
use crate::reasoning::ReasoningFilter;
use crate::summarizer::{TitleRequest, TitleSummarizer};

/// How an accepted call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// Nothing to send (empty input, unknown retry target, empty history)
    Skipped,

    Completed {
        assistant_message_id: MessageId,
        /// A background title request was launched
        title_requested: bool,
    },

    /// Stopped through [`SessionController::cancel`], partial reply kept
    Cancelled { assistant_message_id: MessageId },
}

enum StreamEnd {
    Finished,
    Cancelled,
}

struct SessionConfig {
    settings: SessionSettings,
    filter: ReasoningFilter,
}

/// Drives send/stream exchanges for every thread in a [`ThreadStore`].
///
/// Each thread runs `Idle -> Sending -> Streaming -> Finalizing -> Idle`, with
/// `Error` reachable from `Sending` and `Streaming`. At most one exchange per
/// thread is in flight; different threads stream concurrently.
pub struct SessionController {
    store: Arc<ThreadStore>,
    backend: Arc<dyn ChatBackend>,
    config: RwLock<SessionConfig>,
    in_flight: Mutex<HashMap<ThreadId, CancellationToken>>,
    shutdown: CancellationToken,
    background: TaskTracker,
}

impl SessionController {
    pub fn new(
        store: Arc<ThreadStore>,
        backend: Arc<dyn ChatBackend>,
        settings: SessionSettings,
    ) -> Result<Self> {
        let filter = ReasoningFilter::new(settings.reasoning_models.iter().cloned())?;

        Ok(Self {
            store,
            backend,
            config: RwLock::new(SessionConfig { settings, filter }),
            in_flight: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
            background: TaskTracker::new(),
        })
    }

    pub fn store(&self) -> &Arc<ThreadStore> {
        &self.store
    }

    pub fn settings(&self) -> SessionSettings {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .settings
            .clone()
    }

    pub fn update_settings(&self, settings: SessionSettings) {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        config.filter = config.filter.with_models(settings.reasoning_models.iter().cloned());
        config.settings = settings;
    }

    pub fn set_available_models(&self, models: Vec<String>) {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        config.settings.available_models = models;
    }

    /// Ask the backend which models are installed and remember the answer
    pub async fn refresh_models(&self) -> Result<Vec<String>> {
        let models = self.backend.list_models().await?;
        tracing::debug!(count = models.len(), "Refreshed available models");
        self.set_available_models(models.clone());
        Ok(models)
    }

    /// Send `text` as a new user message and stream the reply into the thread
    pub async fn submit(&self, thread_id: ThreadId, text: &str) -> Result<ExchangeOutcome> {
        if text.is_empty() {
            return Ok(ExchangeOutcome::Skipped);
        }

        self.store.try_begin_exchange(thread_id)?;

        if let Err(e) = self.append_user_message(thread_id, text) {
            return Err(self.fail(thread_id, None, e));
        }

        self.run_exchange(thread_id).await
    }

    /// Drop `message_id` and everything after it, then resend the remaining history
    pub async fn retry(&self, thread_id: ThreadId, message_id: MessageId) -> Result<ExchangeOutcome> {
        if !self.begin_truncated_exchange(thread_id, message_id)? {
            return Ok(ExchangeOutcome::Skipped);
        }

        match self.store.chronological_messages(thread_id) {
            Ok(remaining) if remaining.is_empty() => {
                tracing::debug!(thread_id = %thread_id, "Nothing left to resend after truncation");
                self.store.abort_exchange(thread_id, None)?;
                Ok(ExchangeOutcome::Skipped)
            }
            Ok(_) => self.run_exchange(thread_id).await,
            Err(e) => Err(self.fail(thread_id, None, e.into())),
        }
    }

    /// Replace `message_id` and everything after it with a new user message `text`
    pub async fn resubmit(
        &self,
        thread_id: ThreadId,
        message_id: MessageId,
        text: &str,
    ) -> Result<ExchangeOutcome> {
        if text.is_empty() {
            return Ok(ExchangeOutcome::Skipped);
        }
        if !self.begin_truncated_exchange(thread_id, message_id)? {
            return Ok(ExchangeOutcome::Skipped);
        }

        if let Err(e) = self.append_user_message(thread_id, text) {
            return Err(self.fail(thread_id, None, e));
        }

        self.run_exchange(thread_id).await
    }

    /// Stop the exchange in flight for `thread_id`. Returns whether there was one.
    pub fn cancel(&self, thread_id: ThreadId) -> bool {
        match self.in_flight().get(&thread_id) {
            Some(token) => {
                tracing::info!(thread_id = %thread_id, "Cancelling exchange");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Stop every exchange in flight
    pub fn cancel_all(&self) {
        self.shutdown.cancel();
    }

    pub fn is_streaming(&self, thread_id: ThreadId) -> bool {
        self.in_flight().contains_key(&thread_id)
    }

    /// Wait until every background title request has finished
    pub async fn wait_for_background_tasks(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<ThreadId, CancellationToken>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, thread_id: ThreadId, phase: ExchangePhase) {
        tracing::trace!(thread_id = %thread_id, phase = phase.as_str(), "Exchange phase");
        self.store.notify(ChatEvent::PhaseChanged { thread_id, phase });
    }

    fn append_user_message(&self, thread_id: ThreadId, text: &str) -> Result<()> {
        self.store.promote_draft(thread_id)?;
        self.store.append(thread_id, text, true)?;
        Ok(())
    }

    /// Truncate at `message_id` with the thread marked as thinking.
    ///
    /// `Ok(false)` if the message is not part of the thread.
    fn begin_truncated_exchange(&self, thread_id: ThreadId, message_id: MessageId) -> Result<bool> {
        if self.store.thread(thread_id)?.message(message_id).is_none() {
            tracing::debug!(thread_id = %thread_id, message_id = %message_id, "Retry target not found");
            return Ok(false);
        }

        self.store.try_begin_exchange(thread_id)?;

        if let Err(e) = self.store.truncate_from(thread_id, message_id) {
            return Err(self.fail(thread_id, None, e.into()));
        }
        Ok(true)
    }

    /// Steps shared by submit and retry, entered with the thread already thinking
    async fn run_exchange(&self, thread_id: ThreadId) -> Result<ExchangeOutcome> {
        let mut assistant_message_id = None;

        match self.stream_reply(thread_id, &mut assistant_message_id).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => Err(self.fail(thread_id, assistant_message_id, e)),
        }
    }

    async fn stream_reply(
        &self,
        thread_id: ThreadId,
        assistant_message_id: &mut Option<MessageId>,
    ) -> Result<ExchangeOutcome> {
        self.set_phase(thread_id, ExchangePhase::Sending);

        let settings = self.settings();
        let model = self
            .store
            .ensure_model_selected(thread_id, &settings.available_models, &settings.default_model_name)?
            .filter(|m| !m.is_empty())
            .ok_or(SessionError::NoModelSelected)?;

        let history = backend_history(&self.store.chronological_messages(thread_id)?);

        let assistant = self.store.append(thread_id, "", false)?;
        *assistant_message_id = Some(assistant.id);
        self.set_phase(thread_id, ExchangePhase::Streaming);

        tracing::info!(thread_id = %thread_id, model = %model, messages = history.len(), "Starting exchange");

        let token = self.shutdown.child_token();
        self.in_flight().insert(thread_id, token.clone());
        let streamed = self
            .consume_stream(thread_id, assistant.id, &model, history, &token)
            .await;
        self.in_flight().remove(&thread_id);

        if let StreamEnd::Cancelled = streamed? {
            self.store.abort_exchange(thread_id, Some(assistant.id))?;
            self.set_phase(thread_id, ExchangePhase::Idle);
            tracing::info!(thread_id = %thread_id, "Exchange cancelled");
            return Ok(ExchangeOutcome::Cancelled {
                assistant_message_id: assistant.id,
            });
        }

        self.set_phase(thread_id, ExchangePhase::Finalizing);
        let first_exchange = self.store.finish_exchange(thread_id, assistant.id)?;
        let title_requested = first_exchange && self.spawn_title_summary(thread_id, &model);
        self.set_phase(thread_id, ExchangePhase::Idle);

        tracing::info!(thread_id = %thread_id, title_requested, "Exchange finished");
        Ok(ExchangeOutcome::Completed {
            assistant_message_id: assistant.id,
            title_requested,
        })
    }

    async fn consume_stream(
        &self,
        thread_id: ThreadId,
        message_id: MessageId,
        model: &str,
        history: Vec<Message>,
        token: &CancellationToken,
    ) -> Result<StreamEnd> {
        let mut stream = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(StreamEnd::Cancelled),
            opened = self.backend.stream_conversation(model, history) => opened?,
        };

        let mut fragments = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(StreamEnd::Cancelled),
                next = stream.next() => next,
            };

            match next {
                Some(Ok(StreamEvent::Message { content })) => {
                    self.store.append_to_message(thread_id, message_id, &content)?;
                    fragments += 1;
                }
                Some(Ok(StreamEvent::Done { finish_reason })) => {
                    tracing::debug!(thread_id = %thread_id, fragments, finish_reason = ?finish_reason, "Stream completed");
                    return Ok(StreamEnd::Finished);
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(StreamEnd::Finished),
            }
        }
    }

    /// Launch the one-off title request. Returns whether it was launched.
    fn spawn_title_summary(&self, thread_id: ThreadId, model: &str) -> bool {
        let history = match self.store.chronological_messages(thread_id) {
            Ok(messages) => backend_history(&messages),
            Err(e) => {
                tracing::warn!(thread_id = %thread_id, error = %e, "Could not snapshot history for title");
                return false;
            }
        };

        let (prompt, filter) = {
            let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
            (config.settings.title_summary_prompt.clone(), config.filter.clone())
        };

        let request = TitleRequest::new(thread_id, model, history, prompt);
        let summarizer = TitleSummarizer::new(Arc::clone(&self.backend), Arc::clone(&self.store), filter);
        self.background.spawn(summarizer.run(request));
        true
    }

    /// Reset the thread after a failed attempt and publish the user-facing message
    fn fail(&self, thread_id: ThreadId, assistant_message_id: Option<MessageId>, err: SessionError) -> SessionError {
        if let Err(e) = self.store.abort_exchange(thread_id, assistant_message_id) {
            tracing::warn!(thread_id = %thread_id, error = %e, "Failed to reset thread after error");
        }

        tracing::error!(thread_id = %thread_id, error = %err, "Exchange failed");
        self.set_phase(thread_id, ExchangePhase::Error);
        self.store.notify(ChatEvent::ExchangeFailed {
            thread_id,
            message: err.user_message(),
        });
        self.set_phase(thread_id, ExchangePhase::Idle);

        err
    }
}
