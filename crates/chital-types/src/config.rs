use serde::{Deserialize, Serialize};

/// Instruction appended as a final user message when asking the model for a thread title
pub const DEFAULT_TITLE_SUMMARY_PROMPT: &str = "Summarize the conversation above as a short title of at most five words. \
Reply with the title only, without quotes or punctuation at the end.";

/// Models known to emit a `<think>...</think>` block before their answer
pub const DEFAULT_REASONING_MODELS: &[&str] = &["deepseek-r1:8b", "deepseek-r1:latest"];

fn default_title_summary_prompt() -> String {
    DEFAULT_TITLE_SUMMARY_PROMPT.to_string()
}

fn default_reasoning_models() -> Vec<String> {
    DEFAULT_REASONING_MODELS.iter().map(|m| m.to_string()).collect()
}

/// Settings the session controller reads but does not own.
///
/// `available_models` is refreshed from the model server; the rest comes from user settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_title_summary_prompt")]
    pub title_summary_prompt: String,

    /// Empty means "use the first available model"
    #[serde(default)]
    pub default_model_name: String,

    #[serde(default)]
    pub available_models: Vec<String>,

    #[serde(default = "default_reasoning_models")]
    pub reasoning_models: Vec<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            title_summary_prompt: default_title_summary_prompt(),
            default_model_name: String::new(),
            available_models: Vec::new(),
            reasoning_models: default_reasoning_models(),
        }
    }
}

impl SessionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title_summary_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.title_summary_prompt = prompt.into();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model_name = model.into();
        self
    }

    pub fn with_available_models(mut self, models: Vec<String>) -> Self {
        self.available_models = models;
        self
    }

    pub fn with_reasoning_models(mut self, models: Vec<String>) -> Self {
        self.reasoning_models = models;
        self
    }
}
