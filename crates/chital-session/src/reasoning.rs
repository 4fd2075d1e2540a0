use std::collections::HashSet;

use regex::Regex;

use crate::error::Result;

/// Open/close markers reasoning models wrap their internal monologue in
const THINK_BLOCK_PATTERN: &str = r"(?s)<think>.*?</think>";

/// Removes `<think>...</think>` blocks from replies of known reasoning models
#[derive(Debug, Clone)]
pub struct ReasoningFilter {
    models: HashSet<String>,
    pattern: Regex,
}

impl ReasoningFilter {
    pub fn new<I, S>(models: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            models: models.into_iter().map(Into::into).collect(),
            pattern: Regex::new(THINK_BLOCK_PATTERN)?,
        })
    }

    /// Same pattern, different model set
    pub fn with_models<I, S>(&self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            models: models.into_iter().map(Into::into).collect(),
            pattern: self.pattern.clone(),
        }
    }

    pub fn is_reasoning_model(&self, model: &str) -> bool {
        self.models.contains(model)
    }

    /// Strip every think block and trim. Idempotent.
    pub fn strip(&self, text: &str) -> String {
        let mut stripped = self.pattern.replace_all(text, "").into_owned();
        // A removal can splice a new block together out of the surrounding text
        while self.pattern.is_match(&stripped) {
            stripped = self.pattern.replace_all(&stripped, "").into_owned();
        }
        stripped.trim().to_string()
    }

    /// Reply as it should be used: stripped for reasoning models, untouched otherwise
    pub fn clean(&self, model: &str, raw: &str) -> String {
        if self.is_reasoning_model(model) {
            self.strip(raw)
        } else {
            raw.to_string()
        }
    }
}
