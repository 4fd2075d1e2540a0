//! High-level builder API for chat sessions

use crate::{OllamaClient, OllamaConfig, SessionController, SessionSettings, ThreadStore};
use anyhow::{Context, Result};
use chital_llm::ChatBackend;
use chital_persist::{InMemoryPersistence, JsonFilePersistence, PersistenceClient};
use std::path::PathBuf;
use std::sync::Arc;

/// Builder for a ready-to-use [`ChatApp`]
///
/// # Example
///
/// ```rust,no_run
/// use chital::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> Result<()> {
/// let app = ChatAppBuilder::new()
///     .base_url("http://localhost:11434")
///     .default_model("llama3.2")
///     .storage_dir("/tmp/chital")
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct ChatAppBuilder {
    ollama: OllamaConfig,
    settings: SessionSettings,

    /// `None` keeps threads in memory only
    storage_dir: Option<PathBuf>,
    refresh_models: bool,
}

impl Default for ChatAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatAppBuilder {
    pub fn new() -> Self {
        Self {
            ollama: OllamaConfig::default(),
            settings: SessionSettings::default(),
            storage_dir: None,
            refresh_models: true,
        }
    }

    /// Ollama server URL (default: http://localhost:11434)
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.ollama.base_url = base_url.into();
        self
    }

    pub fn ollama_config(mut self, config: OllamaConfig) -> Self {
        self.ollama = config;
        self
    }

    pub fn settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.settings.default_model_name = model.into();
        self
    }

    /// Persist threads as JSON files under `dir`
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    pub fn in_memory(mut self) -> Self {
        self.storage_dir = None;
        self
    }

    /// Ask the server for installed models while building (default: true)
    pub fn refresh_models(mut self, refresh: bool) -> Self {
        self.refresh_models = refresh;
        self
    }

    /// Build the app
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the HTTP client cannot be created
    /// - the storage directory cannot be created or read
    ///
    /// An unreachable server is not an error; the model list simply stays as configured.
    pub async fn build(self) -> Result<ChatApp> {
        let backend: Arc<dyn ChatBackend> = Arc::new(
            OllamaClient::from_config(self.ollama).context("Failed to create Ollama client")?,
        );

        let persistence: Arc<dyn PersistenceClient> = match &self.storage_dir {
            Some(dir) => Arc::new(
                JsonFilePersistence::new(dir)
                    .with_context(|| format!("Failed to open thread storage at {}", dir.display()))?,
            ),
            None => Arc::new(InMemoryPersistence::new()),
        };

        let store = Arc::new(ThreadStore::new(persistence));
        store.load().context("Failed to load threads")?;

        let controller = Arc::new(
            SessionController::new(Arc::clone(&store), backend, self.settings)
                .context("Failed to create session controller")?,
        );

        if self.refresh_models {
            if let Err(e) = controller.refresh_models().await {
                tracing::warn!(error = %e, "Could not list installed models");
            }
        }

        Ok(ChatApp { store, controller })
    }
}

/// Store and controller sharing one backend
pub struct ChatApp {
    store: Arc<ThreadStore>,
    controller: Arc<SessionController>,
}

impl ChatApp {
    pub fn store(&self) -> &Arc<ThreadStore> {
        &self.store
    }

    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    /// Cancel in-flight exchanges and wait for pending title requests
    pub async fn shutdown(&self) {
        self.controller.cancel_all();
        self.controller.wait_for_background_tasks().await;
    }
}
