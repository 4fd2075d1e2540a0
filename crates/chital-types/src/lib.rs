pub mod config;
pub mod events;
pub mod ids;
pub mod state;

pub use config::{SessionSettings, DEFAULT_REASONING_MODELS, DEFAULT_TITLE_SUMMARY_PROMPT};
pub use events::ChatEvent;
pub use ids::{MessageId, ThreadId};
pub use state::ExchangePhase;
