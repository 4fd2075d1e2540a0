pub mod controller;
pub mod error;
pub mod history;
pub mod reasoning;
pub mod summarizer;

pub use controller::{ExchangeOutcome, SessionController};
pub use error::{Result, SessionError};
pub use history::backend_history;
pub use reasoning::ReasoningFilter;
pub use summarizer::{TitleRequest, TitleSummarizer};
