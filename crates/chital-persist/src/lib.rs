pub mod dbs;
pub mod error;
pub mod models;
pub mod store;
pub mod trait_client;

pub use dbs::{InMemoryPersistence, JsonFilePersistence};
pub use error::{PersistError, Result};
pub use models::{resolve_model, ChatMessage, ChatThread, DBMessage, DBThread, ThreadLifecycle};
pub use store::ThreadStore;
pub use trait_client::PersistenceClient;
