use chital_types::ThreadId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted thread metadata. Drafts never produce one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DBThread {
    pub id: ThreadId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selected_model: Option<String>,
    #[serde(default)]
    pub has_received_first_message: bool,
    pub created_at: DateTime<Utc>,
}
