#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chital_llm::{
    BackendError, ChatBackend, ChatRequest, ChatResponse, EventStream, StreamEvent, TransportError,
};
use chital_persist::ThreadStore;
use chital_session::SessionController;
use chital_types::SessionSettings;
use futures::stream::{self, StreamExt};

/// What the next streaming call does
pub enum StreamScript {
    Reply(Vec<&'static str>),
    /// Emit the fragments, then fail
    FailAfter(Vec<&'static str>, TransportError),
    /// The request itself fails
    FailToOpen(TransportError),
    /// Emit the fragments, then never finish
    Hang(Vec<&'static str>),
}

/// Backend that replays scripted replies and records every request
#[derive(Default)]
pub struct ScriptedBackend {
    streams: Mutex<VecDeque<StreamScript>>,
    titles: Mutex<VecDeque<Result<String, BackendError>>>,
    models: Vec<String>,
    pub stream_requests: Mutex<Vec<ChatRequest>>,
    pub single_requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.models = models.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn push_stream(&self, script: StreamScript) -> &Self {
        self.streams.lock().unwrap().push_back(script);
        self
    }

    pub fn push_title(&self, title: Result<&str, BackendError>) -> &Self {
        self.titles.lock().unwrap().push_back(title.map(str::to_string));
        self
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_requests.lock().unwrap().len()
    }

    pub fn single_calls(&self) -> usize {
        self.single_requests.lock().unwrap().len()
    }

    pub fn last_stream_request(&self) -> ChatRequest {
        self.stream_requests.lock().unwrap().last().cloned().unwrap()
    }
}

fn fragments(parts: Vec<&'static str>) -> Vec<chital_llm::Result<StreamEvent>> {
    parts
        .into_iter()
        .map(|p| {
            Ok(StreamEvent::Message {
                content: p.to_string(),
            })
        })
        .collect()
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn chat(&self, request: ChatRequest) -> chital_llm::Result<ChatResponse> {
        let model = request.model.clone();
        self.single_requests.lock().unwrap().push(request);

        let next = self.titles.lock().unwrap().pop_front();
        let content = next.unwrap_or_else(|| Ok("Title".to_string()))?;

        Ok(ChatResponse {
            content,
            model: Some(model),
            usage: None,
            finish_reason: Some("stop".to_string()),
            raw: serde_json::Value::Null,
        })
    }

    async fn chat_stream(&self, request: ChatRequest) -> chital_llm::Result<EventStream> {
        self.stream_requests.lock().unwrap().push(request);

        let script = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(StreamScript::Reply(vec!["ok"]));

        let stream: EventStream = match script {
            StreamScript::Reply(parts) => {
                let mut events = fragments(parts);
                events.push(Ok(StreamEvent::Done {
                    finish_reason: Some("stop".to_string()),
                }));
                Box::pin(stream::iter(events))
            }
            StreamScript::FailAfter(parts, err) => {
                let mut events = fragments(parts);
                events.push(Err(err.into()));
                Box::pin(stream::iter(events))
            }
            StreamScript::FailToOpen(err) => return Err(err.into()),
            StreamScript::Hang(parts) => Box::pin(stream::iter(fragments(parts)).chain(stream::pending())),
        };

        Ok(stream)
    }

    async fn list_models(&self) -> chital_llm::Result<Vec<String>> {
        Ok(self.models.clone())
    }
}

pub struct Harness {
    pub backend: Arc<ScriptedBackend>,
    pub store: Arc<ThreadStore>,
    pub controller: Arc<SessionController>,
}

pub fn harness(backend: ScriptedBackend, settings: SessionSettings) -> Harness {
    let backend = Arc::new(backend);
    let store = Arc::new(ThreadStore::in_memory());
    let controller = SessionController::new(store.clone(), backend.clone(), settings).unwrap();

    Harness {
        backend,
        store,
        controller: Arc::new(controller),
    }
}

pub fn settings_with_models(models: &[&str]) -> SessionSettings {
    SessionSettings::new().with_available_models(models.iter().map(|m| m.to_string()).collect())
}
