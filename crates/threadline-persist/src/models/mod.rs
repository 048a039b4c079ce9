mod attachment;
mod message;
mod share;
mod thread;

// Database-agnostic models
pub use attachment::Attachment;
pub use message::{Message, MessagePatch, MessageRole, MessageStatus, ModelParams};
pub use share::SharedChat;
pub use thread::{NewThread, Thread, ThreadStatus, DEFAULT_THREAD_TITLE};
