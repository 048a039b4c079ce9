pub mod content;
pub mod message;
pub mod provider;

pub use content::{Content, ContentPart, ImageUrl};
pub use message::Message;
pub use provider::Provider;
