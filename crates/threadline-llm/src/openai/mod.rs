mod client;

pub use client::OpenAICompatClient;
