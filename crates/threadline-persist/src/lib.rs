pub mod dbs;
pub mod error;
pub mod memory;
pub mod models;
pub mod trait_client;

pub use error::{PersistError, Result};
pub use memory::MemoryPersistenceClient;
pub use models::{
    Attachment, Message, MessagePatch, MessageRole, MessageStatus, ModelParams, NewThread,
    SharedChat, Thread, ThreadStatus,
};
pub use trait_client::PersistenceClient;

#[cfg(feature = "mongodb")]
pub use dbs::mongo::MongoPersistenceClient;
