pub mod buffer;
pub mod error;
pub mod factory;
pub mod gemini;
pub mod openai;
pub mod selector;
pub mod streaming;
pub mod traits;
pub mod types;

pub use error::{ProviderError, Result};
pub use factory::{ClientFactory, HttpClientFactory};
pub use gemini::GeminiClient;
pub use openai::OpenAICompatClient;
pub use selector::{
    ProviderSelector, Route, RouteKind, SelectionError, SelectorConfig, ServerKeys, UserKeys,
};
pub use streaming::StreamEvent;
pub use traits::{
    ChatClient, ChatOptions, ChatRequest, ChatResponse, EventStream, GeneratedImage, ImageClient,
    ImageRequest, TokenUsage,
};
pub use types::{Content, ContentPart, Message, Provider};
